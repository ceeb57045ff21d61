use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use super::SessionCredentials;
use crate::constants::CREDENTIAL_PROCESS_VERSION;

/// Response document expected by the AWS SDKs from a `credential_process`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialProcessResponse {
    pub version: u8,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl From<SessionCredentials> for CredentialProcessResponse {
    fn from(creds: SessionCredentials) -> Self {
        Self {
            version: CREDENTIAL_PROCESS_VERSION,
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: creds.session_token,
            expiration: creds.expiration,
        }
    }
}

impl CredentialProcessResponse {
    /// Write the response as a single JSON line
    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to encode credentials")?;
        writeln!(writer, "{json}").context("Failed to write credentials")?;
        writer.flush().context("Failed to flush credentials")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn session_credentials() -> SessionCredentials {
        SessionCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "SECRET".to_string(),
            session_token: "TOKEN".to_string(),
            expiration: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_from_session_credentials() {
        let resp = CredentialProcessResponse::from(session_credentials());

        assert_eq!(resp.version, 1);
        assert_eq!(resp.access_key_id, "AKIA");
        assert_eq!(resp.secret_access_key, "SECRET");
        assert_eq!(resp.session_token, "TOKEN");
        assert_eq!(
            resp.expiration,
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn test_write_to_uses_credential_process_field_names() {
        let mut buffer = Vec::new();
        CredentialProcessResponse::from(session_credentials())
            .write_to(&mut buffer)
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.ends_with('\n'));
        assert_eq!(output.lines().count(), 1);

        let json: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["Version"], 1);
        assert_eq!(json["AccessKeyId"], "AKIA");
        assert_eq!(json["SecretAccessKey"], "SECRET");
        assert_eq!(json["SessionToken"], "TOKEN");
        assert_eq!(json["Expiration"], "2026-01-02T03:04:05Z");
    }
}
