//! Network access for the router
//!
//! The router only ever talks to the network through the [`Network`] trait, so
//! tests can swap in [`MockNetwork`] and force offline failures.

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::http::{Request, Response};

#[cfg(test)]
pub mod mock;
pub mod remote;

#[cfg(test)]
pub use mock::MockNetwork;
pub use remote::HttpNetwork;

/// Something that can perform a request.
///
/// Any HTTP status counts as a completed fetch. Only transport failures
/// (offline, DNS, refused connection, timeout) are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetworkError>;
}
