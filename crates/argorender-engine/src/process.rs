//! Running external tools (`helm`, `kustomize`)

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{RenderError, Result};

/// A single invocation of an external tool
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: &'static str,
    binary: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(tool: &'static str, binary: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            binary: binary.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Command line as a single string, for logs
    pub fn display(&self) -> String {
        std::iter::once(self.binary.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion and return stdout
    ///
    /// The child is killed if the returned future is dropped.
    pub async fn output(&self) -> Result<String> {
        tracing::debug!(
            tool = self.tool,
            cwd = ?self.cwd,
            "running {}",
            self.display()
        );

        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RenderError::ToolNotFound {
                    tool: self.tool.to_string(),
                    binary: self.binary.display().to_string(),
                }
            } else {
                RenderError::io(&self.binary, e)
            }
        })?;

        if !output.status.success() {
            return Err(RenderError::ToolFailed {
                tool: self.tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
