use crate::constants::{self, DEFAULT_PROFILE};
use anyhow::{Context, Result};
use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings read from the profile's section of the AWS shared config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub mfa_serial: Option<String>,
    pub region: Option<String>,
}

impl ProfileConfig {
    fn from_ini_section(section: &Properties) -> Self {
        Self {
            mfa_serial: non_empty(section.get("mfa_serial")),
            region: non_empty(section.get("region")),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn section_name(profile: &str) -> String {
    if profile == DEFAULT_PROFILE {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

/// Load a profile's settings; a missing file or section yields empty settings
pub fn load(profile: &str) -> Result<ProfileConfig> {
    let path = get_config_path()?;
    load_from(&path, profile)
}

fn load_from(path: &Path, profile: &str) -> Result<ProfileConfig> {
    if !path.exists() {
        debug!("AWS config file not found: {}", path.display());
        return Ok(ProfileConfig::default());
    }

    let ini = Ini::load_from_file(path)
        .with_context(|| format!("Failed to load AWS config file: {}", path.display()))?;

    match ini.section(Some(section_name(profile))) {
        Some(section) => Ok(ProfileConfig::from_ini_section(section)),
        None => {
            debug!("Profile '{}' not found in {}", profile, path.display());
            Ok(ProfileConfig::default())
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    constants::get_aws_config_path().context("Failed to determine AWS config path")
}
