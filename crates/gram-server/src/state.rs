use anyhow::{Context, Result};
use gram_core::config::ProjectConfig;
use gram_core::media::LocalMediaStore;
use gram_core::service::{CommentService, InitiativeService, VoteService};
use gram_core::store::EngagementStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Services shared by every handler. Cheap to clone: each service holds only
/// the store path and its settings.
#[derive(Debug, Clone)]
pub struct AppState {
    pub initiatives: InitiativeService,
    pub votes: VoteService,
    pub comments: CommentService,
    pub media_dir: PathBuf,
    pub public_base_url: String,
}

impl AppState {
    /// Open the store and media directory configured for `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated, or the
    /// media directory cannot be created.
    pub fn open(project_root: &Path, config: &ProjectConfig) -> Result<Self> {
        let store = EngagementStore::open(config.store_path(project_root))
            .context("failed to open engagement store")?;
        let media_dir = config.media_dir(project_root);
        std::fs::create_dir_all(&media_dir)
            .with_context(|| format!("failed to create {}", media_dir.display()))?;
        Ok(Self::new(
            store,
            media_dir,
            config.media.public_base_url.clone(),
            config.limits.max_comment_chars,
        ))
    }

    #[must_use]
    pub fn new(
        store: EngagementStore,
        media_dir: PathBuf,
        public_base_url: String,
        max_comment_chars: usize,
    ) -> Self {
        let media = Arc::new(LocalMediaStore::new(media_dir.clone(), public_base_url.clone()));
        Self {
            initiatives: InitiativeService::new(store.clone(), media),
            votes: VoteService::new(store.clone()),
            comments: CommentService::new(store).with_max_chars(max_comment_chars),
            media_dir,
            public_base_url,
        }
    }
}
