use anyhow::Result;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

use super::{ProvideCredentials, ProvideSession};
use crate::{
    aws::{
        Credentials, SessionCredentials,
        sts::{SessionTokenClient, SessionTokenRequest},
    },
    error::Error,
    mfa::MfaCodeSource,
};

/// Obtains a fresh MFA-backed session on every call. No caching.
pub struct SessionTokenProvider {
    base: Arc<dyn ProvideCredentials>,
    mfa: Arc<dyn MfaCodeSource>,
    client: Arc<dyn SessionTokenClient>,
    mfa_serial: String,
    duration: Duration,
}

impl SessionTokenProvider {
    pub fn new(
        base: Arc<dyn ProvideCredentials>,
        mfa: Arc<dyn MfaCodeSource>,
        client: Arc<dyn SessionTokenClient>,
        mfa_serial: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            base,
            mfa,
            client,
            mfa_serial: mfa_serial.into(),
            duration,
        }
    }

    fn duration_seconds(&self) -> i32 {
        i32::try_from(self.duration.as_secs()).unwrap_or(i32::MAX)
    }
}

#[async_trait]
impl ProvideSession for SessionTokenProvider {
    async fn provide_session(&self) -> Result<SessionCredentials> {
        // Fail before prompting when the base credentials are unusable
        let base = self.base.provide_credentials().await?;
        debug!("Base credentials retrieved");

        let token_code = self.mfa.mfa_code().await?;

        let request = SessionTokenRequest {
            duration_seconds: self.duration_seconds(),
            serial_number: self.mfa_serial.clone(),
            token_code,
        };
        let creds = self
            .client
            .get_session_token(&base, &request)
            .await?
            .ok_or(Error::EmptyCredentials)?;

        info!("Obtained session credentials expiring at {}", creds.expiration);
        Ok(creds)
    }
}

#[async_trait]
impl ProvideCredentials for SessionTokenProvider {
    async fn provide_credentials(&self) -> Result<Credentials> {
        self.provide_session().await.map(Credentials::from)
    }
}
