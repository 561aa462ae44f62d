use std::path::PathBuf;
use std::time::Duration;
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use thiserror::Error;
use crate::artifact::Companion;

const DEFAULT_CONFIG: &str = include_str!("../../default.toml");

#[derive(Error, Debug)]
pub enum Error {
    #[error("read {path}: {err}")]
    ReadFile {
        err: std::io::Error,
        path: String,
    },

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value: {0}")]
    Invalid(&'static str),
}

/// A release.toml file, merged over the built-in defaults.
#[derive(Deserialize, Debug)]
pub struct File {
    pub description: Option<String>,
    pub nexus: Nexus,
    pub promote: Promote,
}

impl Default for File {
    fn default() -> Self {
        // The default config is compiled into the program, so
        // make sure to test default() to catch panics compile-time.
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }
}

impl File {
    /// Read a user configuration file and merge it over the defaults.
    pub fn default_with_user_config_file(path: &str) -> Result<Self, Error> {
        let user_config = std::fs::read_to_string(path).map_err(|err| Error::ReadFile {
            err,
            path: path.to_string(),
        })?;
        Self::default_with_user_config(&user_config)
    }

    /// Tables are merged key by key; any other value in `user_config`
    /// replaces the default outright, arrays included.
    pub fn default_with_user_config(user_config: &str) -> Result<Self, Error> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        merge(&mut merged, toml::from_str(user_config)?);
        let file: Self = toml::Value::Table(merged).try_into()?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.promote.poll.attempts == 0 {
            return Err(Error::Invalid("promote.poll.attempts must be at least 1"));
        }
        Ok(())
    }
}

fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(overlay_table) => match base.get_mut(&key) {
                Some(toml::Value::Table(base_table)) => merge(base_table, overlay_table),
                _ => {
                    base.insert(key, toml::Value::Table(overlay_table));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Nexus {
    /// Service root, e.g. `https://oss.sonatype.org`.
    pub url: String,
    #[serde_inline_default(120)]
    pub timeout_secs: u64,
}

impl Nexus {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Promote {
    /// Directory holding the build output, relative to the source directory.
    pub directory: PathBuf,
    /// Artifact file names inside `directory`.
    #[serde(default)]
    pub files: Vec<String>,
    /// Project descriptor to read the group id from.
    /// Defaults to the first `.pom` among `files`.
    pub descriptor: Option<String>,
    /// Description attached to the staging repository.
    pub description: String,
    /// Release the repository once it is closed.
    #[serde_inline_default(false)]
    pub release: bool,
    /// Fail the run on a non-2xx upload instead of logging it.
    #[serde_inline_default(false)]
    pub strict_uploads: bool,
    /// Side-files uploaded after each artifact, in upload order.
    pub companions: Vec<Companion>,
    /// gpg `--local-user`; the default key is used when unset.
    pub signing_key: Option<String>,
    pub poll: Poll,
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Poll {
    #[serde_inline_default(10)]
    pub attempts: u32,
    #[serde_inline_default(30)]
    pub interval_secs: u64,
}

impl Poll {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
