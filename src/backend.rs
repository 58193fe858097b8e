//! Source abstraction for listing remote compute instances.
//!
//! The sync pipeline only needs one operation from a provider: "list all
//! instances". Keeping that behind a trait lets tests drive the pipeline
//! with scripted records instead of network calls.

use std::future::Future;
use std::pin::Pin;

/// Raw instance record as returned by a provider, before normalisation.
///
/// Fields mirror what provider APIs actually guarantee: the public address
/// may be absent while an instance is still provisioning, and the tag list
/// may arrive in any order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawInstance {
    /// Provider-assigned instance name.
    pub name: String,
    /// Public IPv4 address, when one has been allocated.
    pub public_ip: Option<String>,
    /// Tags attached to the instance, in provider order.
    pub tags: Vec<String>,
}

/// Future returned by source operations.
pub type SourceFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by remote instance sources.
pub trait InstanceSource {
    /// Provider specific error type returned by the source.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every instance visible to the configured credentials.
    fn list_all(&self) -> SourceFuture<'_, Vec<RawInstance>, Self::Error>;
}
