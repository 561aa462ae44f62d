use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use log::debug;
use thiserror::Error;
use crate::artifact::Companion;

#[derive(Error, Debug)]
pub enum Error {
    #[error("gpg signing failed with exit code {0}")]
    Sign(ExitStatus),

    #[error("gpg stdin unavailable")]
    Stdin,

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Batch-mode detached signature, passphrase read from stdin.
fn command(path: &Path, local_user: Option<&str>) -> Command {
    let mut command = Command::new("gpg");
    command
        .arg("--batch")
        .arg("--yes")
        .arg("--pinentry-mode")
        .arg("loopback")
        .arg("--passphrase-fd")
        .arg("0")
        .arg("--armor");
    if let Some(key) = local_user {
        command.arg("--local-user").arg(key);
    }
    command.arg("--detach-sign").arg(path);
    command
}

/// Write an ASCII-armoured detached signature to `<path>.asc` and return its path.
pub fn sign(path: &Path, passphrase: &str, local_user: Option<&str>) -> Result<PathBuf, Error> {
    debug!("Signing {}", path.display());
    let mut child = command(path, local_user)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()?;

    {
        // Dropping stdin closes it, which ends the passphrase.
        let mut stdin = child.stdin.take().ok_or(Error::Stdin)?;
        stdin.write_all(passphrase.as_bytes())?;
    }

    let status = child.wait()?;
    if status.success() {
        Ok(Companion::Asc.path_for(path))
    } else {
        Err(Error::Sign(status))
    }
}
