use crate::context::ResolutionContext;
use crate::errors::ContainerError;
use crate::key::CapabilityKey;

/// A concrete type that declares its dependencies and can be built from them
///
/// Types implementing `Injectable` can be resolved through
/// [`Resolver::resolve_injectable`](crate::Resolver::resolve_injectable)
/// without a binding: the container synthesizes a transient producer that
/// calls [`Injectable::create`]. The `#[injectable]` attribute from
/// `elif-container-derive` generates this impl for structs whose fields are
/// `Arc<T>` or `Option<Arc<T>>`.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Required dependencies, in constructor order
    fn dependencies() -> Vec<CapabilityKey>;

    /// Build an instance, resolving each dependency through `ctx`
    fn create(ctx: &ResolutionContext<'_>) -> Result<Self, ContainerError>;
}

/// Implementation for services with no dependencies
impl Injectable for () {
    fn dependencies() -> Vec<CapabilityKey> {
        Vec::new()
    }

    fn create(_ctx: &ResolutionContext<'_>) -> Result<Self, ContainerError> {
        Ok(())
    }
}
