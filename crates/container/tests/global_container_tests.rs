//! The process-wide container can be installed exactly once

use std::sync::Arc;
use std::thread;

use elif_container::{global, Container, ContainerError, Lifetime, Resolver};

struct AppSettings {
    name: &'static str,
}

#[test]
fn test_global_container_is_installed_once_and_shared() {
    assert!(!global::is_installed());
    assert!(matches!(global::global(), Err(ContainerError::NotInstalled)));

    let mut container = Container::new();
    container
        .bind(Lifetime::Singleton, |_| Ok(AppSettings { name: "elif" }))
        .unwrap();

    let installed = global::install(container).unwrap();
    assert!(installed.is_sealed());
    assert!(global::is_installed());

    let settings = installed.resolve::<AppSettings>().unwrap();
    assert_eq!(settings.name, "elif");

    let from_thread = thread::spawn(|| {
        global::global()
            .and_then(|container| container.resolve::<AppSettings>())
            .unwrap()
    })
    .join()
    .unwrap();
    assert!(Arc::ptr_eq(&settings, &from_thread));

    let second = global::install(Container::new());
    assert!(matches!(second, Err(ContainerError::AlreadyInstalled)));
}
