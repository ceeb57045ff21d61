use std::{env, path::PathBuf, time::Duration};

use dirs;

/// Directory name under the user's cache directory holding per-profile session caches
pub const CACHE_DIR_NAME: &str = "op-aws-credential-process";

/// Extension of a per-profile cache file
pub const CACHE_FILE_EXTENSION: &str = "json";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS configuration file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// Default AWS profile name
pub const DEFAULT_PROFILE: &str = "default";

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default 1Password CLI executable
pub const DEFAULT_OP_CLI_PATH: &str = "op";

/// Default 1Password field holding the access key ID
pub const DEFAULT_ACCESS_KEY_ID_FIELD: &str = "username";

/// Default 1Password field holding the secret access key
pub const DEFAULT_SECRET_ACCESS_KEY_FIELD: &str = "credential";

/// Default STS session duration
pub const DEFAULT_SESSION_DURATION: &str = "12h";

/// Default safety margin a cached session must still be valid for
pub const DEFAULT_EXPIRY_WINDOW: &str = "5m";

/// GetSessionToken lower bound (15 minutes)
pub const MIN_SESSION_DURATION: Duration = Duration::from_secs(900);

/// GetSessionToken upper bound (36 hours)
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(129_600);

/// Controlling terminal used for the MFA prompt
pub const TTY_PATH: &str = "/dev/tty";

/// Prompt written to the terminal before reading the MFA code
pub const MFA_PROMPT: &str = "Enter MFA code: ";

/// Version of the credential_process response document
pub const CREDENTIAL_PROCESS_VERSION: u8 = 1;

/// Get the AWS config file path
/// Respects AWS_CONFIG_FILE environment variable if set
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CONFIG_FILE_NAME))
}

/// Get the base cache directory (e.g. ~/.cache on Linux, ~/Library/Caches on macOS)
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_aws_config_path_with_env() {
        let original = env::var("AWS_CONFIG_FILE").ok();

        unsafe {
            env::set_var("AWS_CONFIG_FILE", "/custom/aws/config");
        }
        let path = get_aws_config_path();
        assert_eq!(path, Some(PathBuf::from("/custom/aws/config")));

        unsafe {
            match original {
                Some(val) => env::set_var("AWS_CONFIG_FILE", val),
                None => env::remove_var("AWS_CONFIG_FILE"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_aws_config_path_default() {
        let original = env::var("AWS_CONFIG_FILE").ok();

        unsafe {
            env::remove_var("AWS_CONFIG_FILE");
        }
        let path = get_aws_config_path();

        if let Some(p) = path {
            let path_str = p.to_string_lossy();
            assert!(path_str.contains(AWS_CONFIG_DIR_NAME));
            assert!(path_str.contains(AWS_CONFIG_FILE_NAME));
        }

        unsafe {
            if let Some(val) = original {
                env::set_var("AWS_CONFIG_FILE", val);
            }
        }
    }

    #[test]
    fn test_session_duration_bounds() {
        assert!(MIN_SESSION_DURATION < MAX_SESSION_DURATION);
        assert_eq!(MAX_SESSION_DURATION.as_secs(), 36 * 3600);
    }
}
