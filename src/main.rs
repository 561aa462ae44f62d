/// OSSRH release tooling
use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use thiserror::Error;
use crate::artifact::{ArtifactName, Companion};
use crate::nexus::poll::{self, Outcome};
use crate::nexus::Staging;

mod artifact;
mod checksum;
mod config;
mod git;
mod gpg;
mod nexus;
mod pom;
mod xml;

/// Stage, sign and promote Maven artifacts on OSSRH, and push release tags.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root of the source code tree.
    #[arg(long, global = true, default_value = ".")]
    directory: String,

    /// Path to the release configuration file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload artifacts with signatures and checksums to a new staging repository, then close it.
    Promote {
        /// Artifact files inside the configured build directory.
        /// Omitting them uses `promote.files` from the configuration.
        files: Vec<String>,

        /// Release the staging repository once it is closed.
        #[arg(long)]
        release: bool,
    },
    /// Tag the current commit with the version file contents and push the tag, unless it exists.
    PushTag {
        /// File holding the version string.
        #[arg(long, default_value = "VERSION")]
        version_file: String,

        /// Remote to push the tag to.
        #[arg(long, default_value = "origin")]
        remote: String,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("filesystem error: {0}")]
    FilesystemError(#[from] std::io::Error),

    #[error("configuration file: {0}")]
    ConfigParse(#[from] config::file::Error),

    #[error("configuration: {0}")]
    Config(#[from] config::runtime::Error),

    #[error("artifact name: {0}")]
    Artifact(#[from] artifact::Error),

    #[error("project descriptor: {0}")]
    Pom(#[from] pom::Error),

    #[error("staging: {0}")]
    Nexus(#[from] nexus::Error),

    #[error("signing: {0}")]
    Sign(#[from] gpg::Error),

    #[error("git: {0}")]
    Git(#[from] git::Error),
}

/// Read configuration file from disk and merge it with the
/// `default.toml` [built-in config](../default.toml).
///
/// If a configuration file name is not set explicitly, this function will
/// detect whether a config file with the default file name exists on disk.
/// If it does, it is used implicitly. If not, we ignore any read errors.
fn read_config(args: &Cli) -> Result<config::file::File, Error> {
    const DEFAULT_CONFIG_FILE: &str = "release.toml";

    let config_path = Path::new(&args.directory).join(DEFAULT_CONFIG_FILE);

    let config_file = match &args.config {
        None => {
            if config_path.is_file() {
                Some(config_path.display().to_string())
            } else {
                None
            }
        }
        Some(c) => Some(c.clone()),
    };

    Ok(if let Some(config_file) = config_file {
        info!("Using configuration file {config_file}");
        config::file::File::default_with_user_config_file(&config_file)?
    } else {
        config::file::File::default()
    })
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            error!("fatal: {}", err.to_string());
            std::process::exit(1)
        }
    }
}

async fn run() -> Result<(), Error> {
    env_logger::init();

    let args = Cli::parse();
    let cfg_file = read_config(&args)?;
    let source_directory = PathBuf::from(&args.directory);
    if let Some(description) = &cfg_file.description {
        debug!("Configuration: {description}");
    }

    match args.command {
        Commands::Promote { files, release } => {
            let mut promote_cfg = cfg_file.promote;
            promote_cfg.release |= release;
            let runtime = config::runtime::Config::new(&promote_cfg, &source_directory, &files)?;
            promote(&cfg_file.nexus, &promote_cfg, runtime).await
        }
        Commands::PushTag { version_file, remote } => {
            let repository = git::GitCli::new(&source_directory);
            match git::push_version_tag(&repository, &source_directory.join(version_file), &remote)? {
                git::Outcome::Pushed(tag) => info!("Pushed {tag} to {remote}"),
                git::Outcome::AlreadyTagged(tag) => info!("Tag {tag} already exists, nothing to push"),
            }
            Ok(())
        }
    }
}

/// Read the group id, open an HTTP client and stage `runtime.files`.
async fn promote(
    nexus_cfg: &config::file::Nexus,
    cfg: &config::file::Promote,
    runtime: config::runtime::Config,
) -> Result<(), Error> {
    let group_id = pom::group_id_from_file(&runtime.descriptor)?;
    info!("Group id detected: {group_id}");

    let client = nexus::Client::new(
        nexus::Endpoints::new(&nexus_cfg.url),
        runtime.credentials.clone(),
        nexus_cfg.timeout(),
        cfg.strict_uploads,
    )?;

    let sign = |path: &Path| -> Result<PathBuf, Error> {
        Ok(gpg::sign(path, &runtime.passphrase, cfg.signing_key.as_deref())?)
    };
    stage(&client, cfg, &runtime.files, &group_id, &sign).await?;

    info!("Done");
    Ok(())
}

/// Drive one staging repository from open to closed, and released if asked.
///
/// Each file is followed by its companions in `cfg.companions` order.
async fn stage(
    staging: &impl Staging,
    cfg: &config::file::Promote,
    files: &[PathBuf],
    group_id: &str,
    sign: &dyn Fn(&Path) -> Result<PathBuf, Error>,
) -> Result<Outcome, Error> {
    // Reject unparseable names before a repository is opened.
    for path in files {
        ArtifactName::from_path(path)?;
    }

    let profile_id = staging.profile_id(group_id).await?;
    let repository_id = staging.start(&profile_id, &cfg.description).await?;

    for path in files {
        staging.upload(&repository_id, group_id, path).await?;
        for companion in &cfg.companions {
            let companion_path = generate(*companion, path, sign)?;
            staging.upload(&repository_id, group_id, &companion_path).await?;
        }
    }

    staging.finish(&profile_id, &repository_id, &cfg.description).await?;

    info!("Waiting until the repository is closed");
    let outcome = poll::wait_until_closed(&cfg.poll, || staging.repository_status(&profile_id, &repository_id)).await?;

    match &outcome {
        Outcome::Closed if cfg.release => {
            staging.release(&profile_id, &repository_id, &cfg.description).await?;
        }
        Outcome::Closed => info!("Release not requested, leaving {repository_id} closed"),
        Outcome::StillPending { last_status } if cfg.release => {
            info!("Not releasing {repository_id} while its status is {last_status}");
        }
        Outcome::StillPending { .. } => {}
    }

    Ok(outcome)
}

/// Create a companion file for `path` and return its location.
fn generate(companion: Companion, path: &Path, sign: &dyn Fn(&Path) -> Result<PathBuf, Error>) -> Result<PathBuf, Error> {
    match companion {
        Companion::Asc => sign(path),
        Companion::Md5 => {
            checksum::write_md5(path)?;
            Ok(Companion::Md5.path_for(path))
        }
        Companion::Sha1 => {
            checksum::write_sha1(path)?;
            Ok(Companion::Sha1.path_for(path))
        }
    }
}
