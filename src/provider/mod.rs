//! Credential providers composed by wrapping.
//!
//! Every source of AWS credentials implements [`ProvideCredentials`]: the
//! 1Password-backed base source, the MFA-backed [`SessionTokenProvider`] and the
//! disk-caching [`CachedSessionProvider`] that wraps it. The latter two also
//! implement [`ProvideSession`], which returns the full temporary credential set.

use anyhow::Result;
use async_trait::async_trait;

use crate::aws::{Credentials, SessionCredentials};

pub mod cache;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use cache::{CachedSessionProvider, RequestFingerprint};
pub use session::SessionTokenProvider;

/// Anything that can hand out AWS credentials
#[async_trait]
pub trait ProvideCredentials: Send + Sync {
    async fn provide_credentials(&self) -> Result<Credentials>;
}

/// A provider of temporary session credentials with a known expiration
#[async_trait]
pub trait ProvideSession: ProvideCredentials {
    async fn provide_session(&self) -> Result<SessionCredentials>;
}
