//! The process-wide container
//!
//! The global container is installed once, already sealed, so the shared
//! instance is read-only for the rest of the process.

use std::sync::OnceLock;

use crate::container::Container;
use crate::errors::ContainerError;

static GLOBAL_CONTAINER: OnceLock<Container> = OnceLock::new();

/// Seal `container` and install it as the process-wide container
pub fn install(mut container: Container) -> Result<&'static Container, ContainerError> {
    container.seal()?;

    GLOBAL_CONTAINER
        .set(container)
        .map_err(|_| ContainerError::AlreadyInstalled)?;

    tracing::info!("Global container installed");
    global()
}

/// The installed process-wide container
pub fn global() -> Result<&'static Container, ContainerError> {
    GLOBAL_CONTAINER.get().ok_or(ContainerError::NotInstalled)
}

/// Whether a global container has been installed
pub fn is_installed() -> bool {
    GLOBAL_CONTAINER.get().is_some()
}
