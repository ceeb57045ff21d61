use std::process::ExitStatus;

use thiserror::Error;

/// Failures callers may want to tell apart from plain upstream errors.
///
/// Everything else travels as an opaque `anyhow::Error` and is surfaced unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// STS reported success without a credential payload
    #[error("sts credentials were empty")]
    EmptyCredentials,

    /// The 1Password item lacks one of the requested fields
    #[error("missing credentials in op output")]
    MissingOpFields,

    /// The 1Password CLI exited unsuccessfully
    #[error("failed to get op item: {status}\n{stderr}")]
    OpCommand { status: ExitStatus, stderr: String },

    /// The terminal returned no token to use as MFA code
    #[error("no MFA code entered")]
    NoMfaCode,

    /// No MFA device configured on the command line or in the profile
    #[error("No MFA serial configured for profile '{0}'. Pass --mfa-serial or set mfa_serial in the AWS config")]
    NoMfaSerial(String),
}
