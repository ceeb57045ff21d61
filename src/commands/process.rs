use anyhow::{Context, Result};
use clap::Args;
use std::{io, path::PathBuf, sync::Arc, time::Duration};
use tokio::time;
use tracing::info;

use crate::{
    aws::{SessionCredentials, process::CredentialProcessResponse, sts::StsSessionTokenClient},
    config,
    constants::{
        self, DEFAULT_ACCESS_KEY_ID_FIELD, DEFAULT_EXPIRY_WINDOW, DEFAULT_OP_CLI_PATH,
        DEFAULT_SECRET_ACCESS_KEY_FIELD, DEFAULT_SESSION_DURATION, MAX_SESSION_DURATION,
        MIN_SESSION_DURATION,
    },
    error::Error,
    mfa::TtyMfaCodeSource,
    op::{OpCliCredentialSource, OpItem},
    provider::{CachedSessionProvider, ProvideSession, RequestFingerprint, SessionTokenProvider},
};

/// Arguments of the credential process, the default action
#[derive(Debug, Clone, Args)]
pub struct ProcessCommand {
    #[arg(
        long,
        value_parser = parse_session_duration,
        default_value = DEFAULT_SESSION_DURATION,
        help = "STS session duration (e.g. 12h, 90m, 3600s)"
    )]
    pub duration: Duration,

    #[arg(long, help = "1Password vault name")]
    pub op_vault: String,

    #[arg(long, help = "1Password item name")]
    pub op_item: String,

    #[arg(
        long,
        default_value = DEFAULT_ACCESS_KEY_ID_FIELD,
        help = "1Password field name for access key ID"
    )]
    pub op_access_key_id_field: String,

    #[arg(
        long,
        default_value = DEFAULT_SECRET_ACCESS_KEY_FIELD,
        help = "1Password field name for secret access key"
    )]
    pub op_secret_access_key_field: String,

    #[arg(long, default_value = DEFAULT_OP_CLI_PATH, help = "Path to 1Password CLI")]
    pub op_cli_path: PathBuf,

    #[arg(long, help = "MFA device ARN (defaults to mfa_serial of the profile)")]
    pub mfa_serial: Option<String>,

    #[arg(long, help = "AWS region for STS (defaults to the profile's region)")]
    pub region: Option<String>,

    #[arg(
        long,
        value_parser = parse_duration,
        default_value = DEFAULT_EXPIRY_WINDOW,
        help = "Minimum remaining lifetime of a cached session"
    )]
    pub expiry_window: Duration,

    #[arg(long, help = "Base cache directory (defaults to the user cache directory)")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, value_parser = parse_duration, help = "Abort if credentials are not ready in time")]
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        let creds = self.retrieve(profile).await?;

        // Nothing reaches stdout unless retrieval succeeded
        CredentialProcessResponse::from(creds).write_to(io::stdout().lock())
    }

    async fn retrieve(&self, profile: &str) -> Result<SessionCredentials> {
        info!("Retrieving credentials for profile: {}", profile);

        let provider = self.build_provider(profile)?;
        let retrieval = provider.provide_session();

        match self.timeout {
            Some(limit) => time::timeout(limit, retrieval)
                .await
                .context("Timed out retrieving credentials")?,
            None => retrieval.await,
        }
    }

    fn build_provider(&self, profile: &str) -> Result<CachedSessionProvider> {
        let profile_config = config::load(profile)?;

        let mfa_serial = self
            .mfa_serial
            .clone()
            .or(profile_config.mfa_serial)
            .ok_or_else(|| Error::NoMfaSerial(profile.to_string()))?;
        let cache_dir = self
            .cache_dir
            .clone()
            .or_else(constants::default_cache_dir)
            .context("Failed to determine cache directory")?;

        let item = self.op_item();
        let fingerprint = RequestFingerprint::new(&item, mfa_serial.clone());

        let session = SessionTokenProvider::new(
            Arc::new(OpCliCredentialSource::new(&self.op_cli_path, item)),
            Arc::new(TtyMfaCodeSource::default()),
            Arc::new(StsSessionTokenClient::new(
                profile,
                self.region.clone().or(profile_config.region),
            )),
            mfa_serial,
            self.duration,
        );

        Ok(
            CachedSessionProvider::new(Arc::new(session), cache_dir, profile, fingerprint)
                .with_expiry_window(self.expiry_window),
        )
    }

    fn op_item(&self) -> OpItem {
        OpItem {
            vault: self.op_vault.clone(),
            item: self.op_item.clone(),
            access_key_id_field: self.op_access_key_id_field.clone(),
            secret_access_key_field: self.op_secret_access_key_field.clone(),
        }
    }
}

/// Parse durations such as `12h`, `90m`, `1h30m`, `3600s` or plain seconds
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid unit '{c}' in duration '{s}' (use h, m or s)")),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("missing number before '{c}' in duration '{s}'"))?;
        total = value
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| format!("duration '{s}' is too large"))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("missing unit after '{digits}' in duration '{s}'"));
    }

    Ok(Duration::from_secs(total))
}

/// Like [`parse_duration`], limited to what GetSessionToken accepts
pub fn parse_session_duration(s: &str) -> Result<Duration, String> {
    let duration = parse_duration(s)?;
    if duration < MIN_SESSION_DURATION || duration > MAX_SESSION_DURATION {
        return Err(format!(
            "session duration must be between {}s and {}s",
            MIN_SESSION_DURATION.as_secs(),
            MAX_SESSION_DURATION.as_secs()
        ));
    }
    Ok(duration)
}
