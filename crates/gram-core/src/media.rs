//! Media Store collaborator: binary image hosting behind a small trait.
//!
//! Failures here are never fatal to initiative creation; callers log and
//! carry on without an image.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Folder initiative images are uploaded into.
pub const INITIATIVE_FOLDER: &str = "initiatives";

/// A stored asset: the public URL and the id used to delete it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("invalid media name '{0}'")]
    InvalidName(String),

    #[error("media asset '{0}' not found")]
    NotFound(String),

    #[error("media I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Upload/delete contract for image hosting.
pub trait MediaStore: Send + Sync + fmt::Debug {
    /// Store `bytes` as `folder/name`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError`] if the name is unusable or the write fails.
    fn upload(&self, bytes: &[u8], folder: &str, name: &str) -> Result<MediaAsset, MediaError>;

    /// Remove a previously uploaded asset.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotFound`] for unknown ids.
    fn delete(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Filesystem-backed media store. Assets are written under `root` and
/// published under `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, public_id: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(public_id);
        let safe = !public_id.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidName(public_id.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl MediaStore for LocalMediaStore {
    fn upload(&self, bytes: &[u8], folder: &str, name: &str) -> Result<MediaAsset, MediaError> {
        if name.contains('/') || name.contains('\\') {
            return Err(MediaError::InvalidName(name.to_string()));
        }
        let public_id = format!("{folder}/{name}");
        let path = self.resolve(&public_id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;

        let url = format!(
            "{}/{public_id}",
            self.public_base_url.trim_end_matches('/')
        );
        tracing::debug!(%public_id, bytes = bytes.len(), "media uploaded");
        Ok(MediaAsset { url, public_id })
    }

    fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let path = self.resolve(public_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(MediaError::NotFound(public_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Asset name for an upload: `<millis>_<stem>.<ext>`, restricted to a
/// filesystem- and URL-safe alphabet.
#[must_use]
pub fn upload_name(original_file_name: &str, uploaded_at_ms: i64) -> String {
    let base = Path::new(original_file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            e.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|e| !e.is_empty());

    match ext {
        Some(ext) => format!("{uploaded_at_ms}_{stem}.{ext}"),
        None => format!("{uploaded_at_ms}_{stem}"),
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
