use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use log::{debug, info};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("git {command} failed with exit code {status}")]
    Git {
        command: &'static str,
        status: ExitStatus,
    },

    #[error("read {path}: {err}")]
    ReadVersion {
        err: std::io::Error,
        path: String,
    },

    #[error("version file {0} is empty")]
    EmptyVersion(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// The git operations needed to publish a release tag.
pub trait Repository {
    fn tags(&self) -> Result<Vec<String>, Error>;

    /// Create a lightweight tag at the current commit.
    fn create_tag(&self, tag: &str) -> Result<(), Error>;

    fn push_tag(&self, remote: &str, tag: &str) -> Result<(), Error>;
}

/// [`Repository`] backed by the `git` command line.
pub struct GitCli {
    directory: PathBuf,
}

impl GitCli {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    fn git(&self, command: &'static str) -> std::process::Command {
        let mut process = std::process::Command::new("git");
        process.current_dir(&self.directory).arg(command);
        process
    }
}

impl Repository for GitCli {
    fn tags(&self) -> Result<Vec<String>, Error> {
        let output = self.git("tag").stderr(Stdio::inherit()).output()?;
        if !output.status.success() {
            return Err(Error::Git {
                command: "tag",
                status: output.status,
            });
        }
        Ok(parse_tags(&String::from_utf8_lossy(&output.stdout)))
    }

    fn create_tag(&self, tag: &str) -> Result<(), Error> {
        debug!("git tag {tag}");
        self.git("tag")
            .arg(tag)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map(|exit_status| {
                if exit_status.success() {
                    Ok(())
                } else {
                    Err(Error::Git {
                        command: "tag",
                        status: exit_status,
                    })
                }
            })?
    }

    fn push_tag(&self, remote: &str, tag: &str) -> Result<(), Error> {
        debug!("git push {remote} {tag}");
        self.git("push")
            .arg(remote)
            .arg(tag)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map(|exit_status| {
                if exit_status.success() {
                    Ok(())
                } else {
                    Err(Error::Git {
                        command: "push",
                        status: exit_status,
                    })
                }
            })?
    }
}

/// One tag per line; blank lines are dropped.
pub fn parse_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `v` followed by the trimmed contents of a version file.
pub fn version_tag(contents: &str) -> Option<String> {
    let version = contents.trim();
    if version.is_empty() {
        None
    } else {
        Some(format!("v{version}"))
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Pushed(String),
    AlreadyTagged(String),
}

/// Tag the current commit with the version from `version_file` and push it,
/// unless a tag with that name already exists.
pub fn push_version_tag(repository: &impl Repository, version_file: &Path, remote: &str) -> Result<Outcome, Error> {
    let path = version_file.display().to_string();
    let contents = std::fs::read_to_string(version_file).map_err(|err| Error::ReadVersion {
        err,
        path: path.clone(),
    })?;
    let tag = version_tag(&contents).ok_or(Error::EmptyVersion(path))?;

    if repository.tags()?.contains(&tag) {
        return Ok(Outcome::AlreadyTagged(tag));
    }

    info!("Tagging current commit as {tag}");
    repository.create_tag(&tag)?;
    repository.push_tag(remote, &tag)?;
    Ok(Outcome::Pushed(tag))
}
