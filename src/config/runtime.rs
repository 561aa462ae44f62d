use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use super::file;

pub const USERNAME_ENV: &str = "mvn_user";
pub const PASSWORD_ENV: &str = "mvn_password";
pub const PASSPHRASE_ENV: &str = "mvn_passphrase";

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),

    #[error("no artifact files given on the command line or in promote.files")]
    NoFiles,

    #[error("no project descriptor: set promote.descriptor or include a .pom file")]
    NoDescriptor,
}

/// HTTP basic credentials for the staging API.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything `promote` needs, resolved before the first network call.
pub struct Config {
    pub credentials: Credentials,
    pub passphrase: String,
    /// Artifact files, in upload order.
    pub files: Vec<PathBuf>,
    pub descriptor: PathBuf,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &self.credentials)
            .field("passphrase", &"<redacted>")
            .field("files", &self.files)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl Config {
    pub fn new(cfg: &file::Promote, source_directory: &Path, cli_files: &[String]) -> Result<Self, Error> {
        Self::with_env(cfg, source_directory, cli_files, |name| std::env::var(name).ok())
    }

    /// Like [`Config::new`], reading variables through `env`.
    pub fn with_env<F>(cfg: &file::Promote, source_directory: &Path, cli_files: &[String], env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            env(name)
                .filter(|value| !value.is_empty())
                .ok_or(Error::MissingEnv(name))
        };

        let credentials = Credentials {
            username: required(USERNAME_ENV)?,
            password: required(PASSWORD_ENV)?,
        };
        let passphrase = required(PASSPHRASE_ENV)?;

        let names = if cli_files.is_empty() { cfg.files.as_slice() } else { cli_files };
        if names.is_empty() {
            return Err(Error::NoFiles);
        }

        let directory = source_directory.join(&cfg.directory);
        let descriptor = cfg
            .descriptor
            .as_deref()
            .or_else(|| names.iter().map(String::as_str).find(|name| name.ends_with(".pom")))
            .ok_or(Error::NoDescriptor)?;

        Ok(Self {
            credentials,
            passphrase,
            files: names.iter().map(|name| directory.join(name)).collect(),
            descriptor: directory.join(descriptor),
        })
    }
}
