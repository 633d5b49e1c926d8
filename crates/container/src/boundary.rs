//! Ports for layered request handling
//!
//! A controller depends on an input [`Port`], an interactor implements it
//! and reports through an [`OutputPort`] implemented by a presenter. All
//! three are ordinary bindings to the container: it hands out instances and
//! never sequences the calls between them. Swapping an interactor for a test
//! double means registering another producer for the same port.
//!
//! ```rust
//! use elif_container::{Container, Lifetime, Port, Resolver, ServiceToken};
//! use std::sync::Arc;
//!
//! trait CreateOrder: Send + Sync {
//!     fn execute(&self, sku: &str) -> u64;
//! }
//!
//! struct CreateOrderPort;
//! impl ServiceToken for CreateOrderPort {
//!     type Service = dyn CreateOrder;
//! }
//! impl Port for CreateOrderPort {}
//!
//! struct FakeCreateOrder;
//! impl CreateOrder for FakeCreateOrder {
//!     fn execute(&self, _sku: &str) -> u64 { 42 }
//! }
//!
//! let mut container = Container::new();
//! container.bind_port::<CreateOrderPort, _>(Lifetime::Transient, |_| Ok(Arc::new(FakeCreateOrder)))?;
//! container.seal()?;
//!
//! let interactor = container.resolve_port::<CreateOrderPort>()?;
//! assert_eq!(interactor.execute("sku-1"), 42);
//! # Ok::<(), elif_container::ContainerError>(())
//! ```

use std::sync::Arc;

use crate::container::Container;
use crate::context::ResolutionContext;
use crate::errors::ContainerError;
use crate::key::ServiceToken;
use crate::lifetime::Lifetime;
use crate::resolver::Resolver;

/// A capability contract with no stored state, fulfilled by an interactor
pub trait Port: ServiceToken {}

/// A port an interactor resolves to report its results
pub trait OutputPort: Port {}

impl Container {
    /// Bind the interactor serving a port
    pub fn bind_port<P, F>(&mut self, lifetime: Lifetime, factory: F) -> Result<&mut Self, ContainerError>
    where
        P: Port,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<P::Service>, ContainerError>
            + Send
            + Sync
            + 'static,
    {
        self.bind_token::<P, F>(lifetime, factory)
    }

    /// Resolve the interactor currently bound to a port
    pub fn resolve_port<P: Port>(&self) -> Result<Arc<P::Service>, ContainerError> {
        self.resolve_token::<P>()
    }
}
