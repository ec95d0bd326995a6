//! CLI commands

use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use argorender_core::{Application, Config};
use argorender_engine::{check_repo_root, RenderError};
use clap::Args;

use crate::error::{CliError, Result};

pub mod detect;
pub mod template;

/// Where the Application and its repository come from
#[derive(Args, Debug, Clone)]
pub struct AppArgs {
    /// Application manifest, `-` for stdin
    #[arg(short = 'a', long = "app", value_name = "FILE")]
    pub app: Option<PathBuf>,

    /// Local checkout of the repository the sources point into
    #[arg(long, value_name = "DIR", env = "ARGORENDER_REPO", default_value = ".")]
    pub repo: PathBuf,
}

impl AppArgs {
    /// Read the Application from `--app`, or from stdin when it is piped
    pub fn load_application(&self) -> Result<Application> {
        match &self.app {
            Some(path) => Ok(Application::load(path)?),
            None if std::io::stdin().is_terminal() => Err(CliError::usage(
                "no Application given: pass --app <FILE> or pipe one on stdin",
            )),
            None => Ok(Application::load("-")?),
        }
    }

    /// Absolute repository root
    ///
    /// Tools run with the repository as working directory, so relative
    /// source paths must not be resolved against it twice.
    pub fn repo_root(&self) -> Result<PathBuf> {
        check_repo_root(&self.repo)?;
        Ok(std::fs::canonicalize(&self.repo)?)
    }
}

/// Load `--config`, or the default config file when present
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Run `task` until it finishes, Ctrl-C is pressed or `timeout` expires
///
/// Dropping the task kills any helm/kustomize child it spawned.
pub async fn run_cancellable<T>(
    task: impl Future<Output = argorender_engine::Result<T>>,
    timeout: Option<Duration>,
) -> Result<T> {
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = task => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted, cancelling render");
            Err(RenderError::Cancelled.into())
        }
        _ = deadline => Err(RenderError::Timeout {
            seconds: timeout.map(|d| d.as_secs()).unwrap_or_default(),
        }
        .into()),
    }
}
