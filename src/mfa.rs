use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    thread,
};
use tokio::sync::oneshot;

use crate::{
    constants::{MFA_PROMPT, TTY_PATH},
    error::Error,
};

/// Supplies one-time MFA codes
#[async_trait]
pub trait MfaCodeSource: Send + Sync {
    async fn mfa_code(&self) -> Result<String>;
}

/// Prompts on the controlling terminal.
///
/// stdin and stdout belong to the SDK invoking the credential process, so the
/// prompt bypasses both. The read happens on a detached thread: dropping the
/// future abandons the prompt instead of holding up runtime shutdown.
#[derive(Debug, Clone)]
pub struct TtyMfaCodeSource {
    tty_path: PathBuf,
}

impl Default for TtyMfaCodeSource {
    fn default() -> Self {
        Self::new(TTY_PATH)
    }
}

impl TtyMfaCodeSource {
    pub fn new(tty_path: impl Into<PathBuf>) -> Self {
        Self {
            tty_path: tty_path.into(),
        }
    }
}

#[async_trait]
impl MfaCodeSource for TtyMfaCodeSource {
    async fn mfa_code(&self) -> Result<String> {
        let tty_path = self.tty_path.clone();
        let (tx, rx) = oneshot::channel();

        thread::Builder::new()
            .name("mfa-prompt".to_string())
            .spawn(move || {
                // The receiver is gone when the caller stopped waiting
                let _ = tx.send(read_code(&tty_path));
            })
            .context("Failed to start MFA prompt")?;

        rx.await.context("MFA prompt thread exited")?
    }
}

fn read_code(tty_path: &Path) -> Result<String> {
    let tty = OpenOptions::new()
        .read(true)
        .write(true)
        .open(tty_path)
        .with_context(|| format!("Failed to open {}", tty_path.display()))?;

    let writer = tty
        .try_clone()
        .context("Failed to open terminal for writing")?;
    prompt_code(BufReader::new(tty), writer)
}

/// Write the prompt and scan the first whitespace-delimited token of the answer
fn prompt_code(mut reader: impl BufRead, mut writer: impl Write) -> Result<String> {
    write!(writer, "{MFA_PROMPT}").context("Failed to write MFA prompt")?;
    writer.flush().context("Failed to write MFA prompt")?;

    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read MFA code")?;

    line.split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| Error::NoMfaCode.into())
}
