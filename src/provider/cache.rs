use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{ProvideCredentials, ProvideSession};
use crate::{
    aws::{Credentials, SessionCredentials},
    constants::{CACHE_DIR_NAME, CACHE_FILE_EXTENSION},
    op::OpItem,
};

/// Identifies which 1Password lookup and MFA device produced a session.
///
/// A cached session is only trusted when every field matches the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFingerprint {
    pub vault: String,
    pub item: String,
    pub mfa_serial: String,
    pub access_key_id_field: String,
    pub secret_access_key_field: String,
}

impl RequestFingerprint {
    pub fn new(item: &OpItem, mfa_serial: impl Into<String>) -> Self {
        Self {
            vault: item.vault.clone(),
            item: item.item.clone(),
            mfa_serial: mfa_serial.into(),
            access_key_id_field: item.access_key_id_field.clone(),
            secret_access_key_field: item.secret_access_key_field.clone(),
        }
    }

    /// Name of the first field that differs from `other`, if any
    pub fn mismatch(&self, other: &Self) -> Option<&'static str> {
        if self.vault != other.vault {
            return Some("vault");
        }
        if self.item != other.item {
            return Some("item");
        }
        if self.mfa_serial != other.mfa_serial {
            return Some("mfa_serial");
        }
        if self.access_key_id_field != other.access_key_id_field {
            return Some("access_key_id_field");
        }
        if self.secret_access_key_field != other.secret_access_key_field {
            return Some("secret_access_key_field");
        }
        None
    }
}

/// On-disk cache record, one file per profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
    #[serde(default)]
    pub credentials: Option<SessionCredentials>,
    #[serde(flatten)]
    pub fingerprint: RequestFingerprint,
}

/// Wraps a session provider with a per-profile cache on disk.
///
/// A cached session is returned without consulting the wrapped provider (and so
/// without prompting for MFA) while it stays valid for more than `expiry_window`.
/// Cache read and write failures never fail a retrieval.
pub struct CachedSessionProvider {
    inner: Arc<dyn ProvideSession>,
    cache_dir: PathBuf,
    profile: String,
    expiry_window: TimeDelta,
    fingerprint: RequestFingerprint,
    now: fn() -> DateTime<Utc>,
}

impl CachedSessionProvider {
    pub fn new(
        inner: Arc<dyn ProvideSession>,
        cache_dir: impl Into<PathBuf>,
        profile: impl Into<String>,
        fingerprint: RequestFingerprint,
    ) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
            profile: profile.into(),
            expiry_window: TimeDelta::minutes(5),
            fingerprint,
            now: Utc::now,
        }
    }

    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        self
    }

    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// `<cache_dir>/op-aws-credential-process/<profile>.json`
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir
            .join(CACHE_DIR_NAME)
            .join(format!("{}.{CACHE_FILE_EXTENSION}", self.profile))
    }

    fn valid_credentials(&self, entry: CacheEntry) -> Option<SessionCredentials> {
        let Some(creds) = entry.credentials else {
            debug!("Cached entry has no credentials");
            return None;
        };

        if let Some(field) = entry.fingerprint.mismatch(&self.fingerprint) {
            debug!("Cached session was issued for a different {}", field);
            return None;
        }

        let threshold = (self.now)().checked_add_signed(self.expiry_window)?;
        if threshold >= creds.expiration {
            debug!("Cached session expires at {}, too soon to reuse", creds.expiration);
            return None;
        }

        Some(creds)
    }

    async fn read_cache(&self, path: &Path) -> Option<CacheEntry> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cached session at {}", path.display());
                return None;
            }
            Err(e) => {
                debug!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        serde_json::from_slice(&data)
            .inspect_err(|e| debug!("Ignoring unparsable cache file {}: {}", path.display(), e))
            .ok()
    }

    pub(crate) async fn write_cache(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.cache_path();
        let dir = path
            .parent()
            .context("Cache path has no parent directory")?;

        create_private_dir(dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let data = serde_json::to_vec(entry).context("Failed to encode cache entry")?;

        // Write a sibling first so readers never observe a partial file
        let tmp = path.with_extension(format!(
            "{CACHE_FILE_EXTENSION}.{}.tmp",
            std::process::id()
        ));
        write_private_file(&tmp, &data)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;

        if let Err(e) = fs::rename(&tmp, &path).await {
            fs::remove_file(&tmp).await.ok();
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }

        Ok(())
    }
}

#[async_trait]
impl ProvideSession for CachedSessionProvider {
    async fn provide_session(&self) -> Result<SessionCredentials> {
        let path = self.cache_path();

        if let Some(creds) = self
            .read_cache(&path)
            .await
            .and_then(|entry| self.valid_credentials(entry))
        {
            info!("Using cached session for profile: {}", self.profile);
            return Ok(creds);
        }

        let creds = self.inner.provide_session().await?;

        let entry = CacheEntry {
            credentials: Some(creds.clone()),
            fingerprint: self.fingerprint.clone(),
        };
        match self.write_cache(&entry).await {
            Ok(()) => info!("Session cached at {}", path.display()),
            Err(e) => warn!("Failed to cache session: {:#}", e),
        }

        Ok(creds)
    }
}

#[async_trait]
impl ProvideCredentials for CachedSessionProvider {
    async fn provide_credentials(&self) -> Result<Credentials> {
        self.provide_session().await.map(Credentials::from)
    }
}

async fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(dir).await
}

async fn write_private_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}
