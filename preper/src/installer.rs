// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ConfigError, InstallError};

/// Installs a package's dependencies and runs its `prepare` script.
pub trait Installer: Send + Sync + 'static {
    /// Prepare the package checked out at `dir`.
    ///
    /// `reason` is a human readable label naming the package and its origin.
    fn install(
        &self,
        dir: &Path,
        reason: &str,
    ) -> impl Future<Output = Result<(), InstallError>> + Send;
}

/// Runs an external package manager command inside the package directory.
///
/// The child's stdout is redirected to our stderr so it can never interleave
/// with an archive written to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl CommandInstaller {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let (program, args) =
            config
                .install_command
                .split_first()
                .ok_or_else(|| ConfigError::Invalid {
                    reason: "install_command must name a program".to_string(),
                })?;
        let mut installer = Self::new(program.clone(), args.iter().cloned());
        installer.env = config.install_env.clone();
        Ok(installer)
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl Default for CommandInstaller {
    fn default() -> Self {
        Self::new("npm", ["install"])
    }
}

impl Installer for CommandInstaller {
    async fn install(&self, dir: &Path, reason: &str) -> Result<(), InstallError> {
        info!("{reason}");
        debug!(
            "Running {} {:?} in {}",
            self.program,
            self.args,
            dir.display()
        );

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(std::io::stderr())
            .status()
            .await
            .map_err(|source| InstallError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(InstallError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}
