use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::{Client as StsClient, config::Credentials as StaticCredentials};
use aws_smithy_types::DateTime as SmithyDateTime;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{Credentials, DEFAULT_AWS_REGION, SessionCredentials};

/// Parameters of a GetSessionToken call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokenRequest {
    pub duration_seconds: i32,
    pub serial_number: String,
    pub token_code: String,
}

/// Exchanges long-lived credentials plus an MFA code for a session
///
/// `Ok(None)` means the service answered without a credential payload.
#[async_trait]
pub trait SessionTokenClient: Send + Sync {
    async fn get_session_token(
        &self,
        base: &Credentials,
        request: &SessionTokenRequest,
    ) -> Result<Option<SessionCredentials>>;
}

/// GetSessionToken against AWS STS, signed with the base credentials
#[derive(Debug, Clone)]
pub struct StsSessionTokenClient {
    profile: String,
    region: Option<String>,
}

impl StsSessionTokenClient {
    pub fn new(profile: impl Into<String>, region: Option<String>) -> Self {
        Self {
            profile: profile.into(),
            region,
        }
    }

    async fn client(&self, base: &Credentials) -> StsClient {
        let static_credentials = StaticCredentials::new(
            base.access_key_id.clone(),
            base.secret_access_key.clone(),
            base.session_token.clone(),
            None,
            "1password",
        );

        let loader = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&self.profile)
            .credentials_provider(static_credentials.clone());

        // Priority: --region -> ENV vars -> Config file -> DEFAULT_AWS_REGION
        let config = match &self.region {
            Some(region) => loader.region(Region::new(region.clone())).load().await,
            None => {
                let loaded = loader.load().await;
                match loaded.region() {
                    Some(region) => {
                        debug!("Using region: {}", region);
                        loaded
                    }
                    None => {
                        info!(
                            "No region configured, using default {} for STS",
                            DEFAULT_AWS_REGION
                        );
                        aws_config::defaults(BehaviorVersion::latest())
                            .profile_name(&self.profile)
                            .credentials_provider(static_credentials)
                            .region(Region::new(DEFAULT_AWS_REGION))
                            .load()
                            .await
                    }
                }
            }
        };

        StsClient::new(&config)
    }
}

#[async_trait]
impl SessionTokenClient for StsSessionTokenClient {
    async fn get_session_token(
        &self,
        base: &Credentials,
        request: &SessionTokenRequest,
    ) -> Result<Option<SessionCredentials>> {
        info!("Calling AWS STS GetSessionToken");
        debug!("MFA serial: {}", request.serial_number);
        debug!("Duration: {} seconds", request.duration_seconds);

        let client = self.client(base).await;

        let response = client
            .get_session_token()
            .duration_seconds(request.duration_seconds)
            .serial_number(&request.serial_number)
            .token_code(&request.token_code)
            .send()
            .await
            .context("Failed to get session token")?;

        let Some(sts_creds) = response.credentials() else {
            return Ok(None);
        };

        Ok(Some(SessionCredentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: to_utc(sts_creds.expiration())?,
        }))
    }
}

fn to_utc(expiration: &SmithyDateTime) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(expiration.secs(), expiration.subsec_nanos())
        .context("AWS STS returned an out-of-range expiration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_utc() {
        let expiration = SmithyDateTime::from_secs_and_nanos(1_790_000_000, 500_000_000);
        let converted = to_utc(&expiration).unwrap();

        assert_eq!(converted.timestamp(), 1_790_000_000);
        assert_eq!(converted.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_to_utc_epoch() {
        let converted = to_utc(&SmithyDateTime::from_secs(0)).unwrap();
        assert_eq!(converted, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn test_to_utc_out_of_range() {
        assert!(to_utc(&SmithyDateTime::from_secs(i64::MAX)).is_err());
    }

    #[test]
    fn test_new_client_keeps_profile_and_region() {
        let client = StsSessionTokenClient::new("dev", Some("eu-west-1".to_string()));
        assert_eq!(client.profile, "dev");
        assert_eq!(client.region.as_deref(), Some("eu-west-1"));
    }
}
