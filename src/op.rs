//! Long-lived AWS keys stored in a 1Password item, read through the `op` CLI.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{aws::Credentials, error::Error, provider::ProvideCredentials};

/// Location of the AWS key pair inside 1Password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpItem {
    pub vault: String,
    pub item: String,
    pub access_key_id_field: String,
    pub secret_access_key_field: String,
}

#[derive(Debug, Deserialize)]
struct OpField {
    #[serde(default)]
    label: String,
    #[serde(default)]
    value: String,
}

/// Base credential source backed by `op item get`
#[derive(Debug, Clone)]
pub struct OpCliCredentialSource {
    cli_path: PathBuf,
    item: OpItem,
}

impl OpCliCredentialSource {
    pub fn new(cli_path: impl Into<PathBuf>, item: OpItem) -> Self {
        Self {
            cli_path: cli_path.into(),
            item,
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "item".to_string(),
            "get".to_string(),
            self.item.item.clone(),
            "--vault".to_string(),
            self.item.vault.clone(),
            "--fields".to_string(),
            format!(
                "label={},label={}",
                self.item.access_key_id_field, self.item.secret_access_key_field
            ),
            "--format".to_string(),
            "json".to_string(),
        ]
    }
}

#[async_trait]
impl ProvideCredentials for OpCliCredentialSource {
    async fn provide_credentials(&self) -> Result<Credentials> {
        info!(
            "Reading AWS credentials from 1Password item '{}' in vault '{}'",
            self.item.item, self.item.vault
        );

        let output = Command::new(&self.cli_path)
            .args(self.args())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.cli_path.display()))?;

        if !output.status.success() {
            return Err(Error::OpCommand {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            }
            .into());
        }

        parse_credentials(&output.stdout, &self.item)
    }
}

/// Pick the access key pair out of `op item get --format json` output
fn parse_credentials(stdout: &[u8], item: &OpItem) -> Result<Credentials> {
    let fields: Vec<OpField> =
        serde_json::from_slice(stdout).context("Failed to parse op output")?;
    debug!("op returned {} fields", fields.len());

    let mut access_key_id = String::new();
    let mut secret_access_key = String::new();
    for field in fields {
        if field.label == item.access_key_id_field {
            access_key_id = field.value;
        } else if field.label == item.secret_access_key_field {
            secret_access_key = field.value;
        }
    }

    if access_key_id.is_empty() || secret_access_key.is_empty() {
        return Err(Error::MissingOpFields.into());
    }

    Ok(Credentials::new(access_key_id, secret_access_key))
}
