//! Initiative creation and listing.

use super::{require_initiative, require_user};
use crate::error::EngagementError;
use crate::media::{INITIATIVE_FOLDER, MediaAsset, MediaStore, upload_name};
use crate::model::initiative::MAX_TITLE_LEN;
use crate::model::{Initiative, InitiativeView, NewInitiative};
use crate::store::EngagementStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// An image attached to a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw create request, as collected from a form or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateInitiative {
    pub title: Option<String>,
    pub description: Option<String>,
    pub creator_id: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct InitiativeService {
    store: EngagementStore,
    media: Arc<dyn MediaStore>,
}

impl InitiativeService {
    #[must_use]
    pub fn new(store: EngagementStore, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    /// Create an initiative with zeroed counters.
    ///
    /// An attached image is uploaded first; if the upload fails the
    /// initiative is still created, without an image.
    ///
    /// # Errors
    ///
    /// - [`EngagementError::Validation`] when the title or creator is missing
    /// - [`EngagementError::Storage`] when the insert fails
    pub fn create(&self, request: CreateInitiative) -> Result<Initiative, EngagementError> {
        let creator = require_user(request.creator_id.as_deref())?;
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EngagementError::validation("title", "is required"))?;
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(EngagementError::validation(
                "title",
                format!("must be <= {MAX_TITLE_LEN} characters"),
            ));
        }

        let asset = request.image.as_ref().and_then(|image| self.upload(image));

        let new = NewInitiative {
            title: title.to_string(),
            description: request.description.unwrap_or_default().trim().to_string(),
            creator,
            image_url: asset.as_ref().map(|a| a.url.clone()),
        };

        match self.store.create_initiative(&new) {
            Ok(initiative) => Ok(initiative),
            Err(err) => {
                if let Some(asset) = asset {
                    if let Err(cleanup) = self.media.delete(&asset.public_id) {
                        warn!(public_id = %asset.public_id, error = %cleanup, "orphaned media asset");
                    }
                }
                Err(err)
            }
        }
    }

    fn upload(&self, image: &ImageUpload) -> Option<MediaAsset> {
        let name = upload_name(&image.file_name, Utc::now().timestamp_millis());
        match self.media.upload(&image.bytes, INITIATIVE_FOLDER, &name) {
            Ok(asset) => Some(asset),
            Err(err) => {
                warn!(file_name = %image.file_name, error = %err, "image upload failed; continuing without image");
                None
            }
        }
    }

    /// Every initiative, newest first, creators resolved.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Storage`] if the read fails.
    pub fn list(&self) -> Result<Vec<InitiativeView>, EngagementError> {
        self.store.list_initiatives()
    }

    /// The initiative's image URL.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] for an unknown initiative, or
    /// the image-flavored `NotFound` when it has no image.
    pub fn image_url(&self, initiative_id: &str) -> Result<String, EngagementError> {
        let id = require_initiative(initiative_id)?;
        self.store
            .image_url(&id)?
            .ok_or_else(|| EngagementError::image_not_found(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::media::{LocalMediaStore, MediaError};
    use crate::store::test_support::temp_store;

    #[derive(Debug)]
    struct BrokenMedia;

    impl MediaStore for BrokenMedia {
        fn upload(&self, _: &[u8], _: &str, _: &str) -> Result<MediaAsset, MediaError> {
            Err(MediaError::Io(std::io::Error::other("disk full")))
        }

        fn delete(&self, public_id: &str) -> Result<(), MediaError> {
            Err(MediaError::NotFound(public_id.to_string()))
        }
    }

    fn request(title: &str, image: Option<ImageUpload>) -> CreateInitiative {
        CreateInitiative {
            title: Some(title.to_string()),
            description: Some("  Fix the well  ".to_string()),
            creator_id: Some("creator".to_string()),
            image,
        }
    }

    fn png() -> Option<ImageUpload> {
        Some(ImageUpload {
            file_name: "well.png".to_string(),
            bytes: b"fake-png".to_vec(),
        })
    }

    #[test]
    fn create_with_image_records_media_url() {
        let (dir, store) = temp_store();
        let media = Arc::new(LocalMediaStore::new(dir.path().join("media"), "/media"));
        let service = InitiativeService::new(store, media);

        let created = service.create(request("Village well", png())).expect("create");
        let url = created.image_url.clone().expect("image url");
        assert!(url.starts_with("/media/initiatives/"));
        assert!(url.ends_with("_well.png"));
        assert_eq!(created.description, "Fix the well");
        assert_eq!(service.image_url(created.id.as_str()).expect("image"), url);
    }

    #[test]
    fn media_failure_is_not_fatal() {
        let (_dir, store) = temp_store();
        let service = InitiativeService::new(store, Arc::new(BrokenMedia));

        let created = service.create(request("Village well", png())).expect("create");
        assert!(created.image_url.is_none());

        let err = service
            .image_url(created.id.as_str())
            .expect_err("no image");
        assert_eq!(err.code(), ErrorCode::ImageNotFound);
        assert_eq!(err.to_string(), "Image not found");
    }

    #[test]
    fn title_and_creator_are_required() {
        let (dir, store) = temp_store();
        let service =
            InitiativeService::new(store, Arc::new(LocalMediaStore::new(dir.path(), "/media")));

        let err = service.create(request("   ", None)).expect_err("blank title");
        assert_eq!(err.to_string(), "invalid title: is required");

        let mut no_creator = request("Title", None);
        no_creator.creator_id = None;
        let err = service.create(no_creator).expect_err("no creator");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);

        assert!(service.list().expect("list").is_empty());
    }
}
