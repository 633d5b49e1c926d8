//! Capability keys and service tokens
//!
//! A [`CapabilityKey`] names an abstract capability a consumer can request.
//! Keys compare by type identity plus an optional name; the captured type
//! name is only used for diagnostics.
//!
//! ## Usage
//!
//! ```rust
//! use elif_container::{CapabilityKey, ServiceToken};
//!
//! trait Mailer: Send + Sync {}
//!
//! struct MailerToken;
//! impl ServiceToken for MailerToken {
//!     type Service = dyn Mailer;
//! }
//!
//! let by_type = CapabilityKey::of::<dyn Mailer>();
//! let by_token = CapabilityKey::token::<MailerToken>();
//! assert_ne!(by_type, by_token);
//! ```

use std::any::TypeId;
use std::hash::{Hash, Hasher};

/// Identifier for an abstract dependency a consumer can request
#[derive(Debug, Clone)]
pub struct CapabilityKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<String>,
}

impl CapabilityKey {
    /// Create a key for a type (concrete type or trait object)
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
        }
    }

    /// Create a named key for a type
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of::<T>()
        }
    }

    /// Create a key identified by a service token rather than the service type
    pub fn token<Token: ServiceToken>() -> Self {
        Self::of::<Token>()
    }

    /// Create a named key for a service token
    pub fn token_named<Token: ServiceToken>(name: impl Into<String>) -> Self {
        Self::named::<Token>(name)
    }

    /// Type id this key was created from
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Type name this key was created from
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Optional name distinguishing several bindings of the same type
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if this key was created for `T` without a name
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>() && self.name.is_none()
    }
}

impl PartialEq for CapabilityKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for CapabilityKey {}

impl Hash for CapabilityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl std::fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})", self.type_name, name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

/// Trait for service tokens that name a capability independently of its implementation
///
/// Tokens are zero-sized marker types. The key of a token binding is the
/// token's own type identity, so two tokens that share a service trait are
/// still distinct capabilities.
///
/// ```rust
/// use elif_container::ServiceToken;
///
/// trait Cache: Send + Sync {}
///
/// struct SessionCacheToken;
/// impl ServiceToken for SessionCacheToken {
///     type Service = dyn Cache;
/// }
/// ```
pub trait ServiceToken: Send + Sync + 'static {
    /// The service type this token represents, typically `dyn Trait`
    type Service: ?Sized + Send + Sync + 'static;
}
