use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::{commands::ProcessCommand, constants::DEFAULT_PROFILE};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "op-aws-credential-helper",
    version,
    about = "AWS credential_process helper backed by 1Password and MFA session tokens",
    long_about = None
)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        default_value = DEFAULT_PROFILE,
        help = "AWS profile name"
    )]
    pub profile: String,

    #[command(flatten)]
    pub process: ProcessCommand,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        self.process.execute(&self.profile).await
    }
}
