pub mod comment;
pub mod completions;
pub mod init;
pub mod initiative;
pub mod serve;
pub mod user;
pub mod verify;
pub mod vote;

use crate::identity;
use crate::output::{CliError, OutputMode, fail};
use anyhow::{Context as _, Result};
use gram_core::ErrorCode;
use gram_core::config::{EffectiveConfig, PROJECT_DIR};
use gram_core::model::UserId;
use gram_core::store::EngagementStore;
use gram_replica::{HttpTransport, LocalTransport};
use std::path::PathBuf;

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
    user_flag: Option<String>,
    remote_flag: Option<String>,
}

/// Where engine requests go: the local store, or a running server.
pub enum Backend {
    Local(LocalTransport),
    Remote(HttpTransport),
}

impl Context {
    pub fn new(
        project_root: PathBuf,
        config: EffectiveConfig,
        user_flag: Option<String>,
        remote_flag: Option<String>,
    ) -> Self {
        let output = OutputMode::from_resolved(&config.resolved_output);
        Self {
            project_root,
            config,
            output,
            user_flag,
            remote_flag,
        }
    }

    /// `--remote`, else the user config's `remote`.
    pub fn remote(&self) -> Option<&str> {
        self.remote_flag
            .as_deref()
            .or(self.config.user.remote.as_deref())
    }

    /// Render `error` in this command's output mode and return it as the failure.
    pub fn fail(&self, error: &CliError) -> anyhow::Error {
        fail(self.output, error)
    }

    pub fn acting_user(&self) -> Result<UserId> {
        identity::require_user(
            self.user_flag.as_deref(),
            self.config.user.user.as_deref(),
        )
        .map_err(|err| self.fail(&CliError::with_code(err.message, err.code)))
    }

    /// Open the project's store. The project must have been initialized.
    pub fn open_store(&self) -> Result<EngagementStore> {
        if !self.project_root.join(PROJECT_DIR).is_dir() {
            return Err(self.fail(&CliError::with_code(
                format!("Not a gram project: {PROJECT_DIR}/ not found"),
                ErrorCode::NotInitialized,
            )));
        }
        let path = self.config.project.store_path(&self.project_root);
        EngagementStore::open(&path)
            .with_context(|| format!("failed to open store at {}", path.display()))
    }

    pub fn backend(&self) -> Result<Backend> {
        if let Some(url) = self.remote() {
            let transport = HttpTransport::new(url).map_err(|err| {
                self.fail(&CliError::with_code(err.to_string(), err.code()))
            })?;
            return Ok(Backend::Remote(transport));
        }
        let transport = LocalTransport::new(self.open_store()?)
            .with_max_comment_chars(self.config.project.limits.max_comment_chars);
        Ok(Backend::Local(transport))
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
