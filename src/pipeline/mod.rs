use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    camera::image::CapturedImage,
    form::FormValues,
    location::Location,
    records::{NewTree, NewTreeImage, RecordStore},
};

/// The user every record is attributed to.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub id: String,
    pub name: Option<String>,
}

impl Submitter {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub tree_id: String,
    pub image_id: String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The picture cannot be uploaded as it is; nothing was written.
    #[error("captured picture cannot be uploaded: {0:#}")]
    Picture(anyhow::Error),
    /// Nothing was written.
    #[error("tree creation failed: {0:#}")]
    TreeCreation(anyhow::Error),
    /// The tree record exists; `compensated` tells whether it was deleted again.
    #[error("tree {tree_id} was created but its image upload failed: {cause:#}")]
    ImageCreation {
        tree_id: String,
        compensated: bool,
        cause: anyhow::Error,
    },
}

/// Two dependent writes: the tree first, then its image under the returned id.
pub struct SubmissionPipeline {
    store: Arc<dyn RecordStore>,
    submitter: Submitter,
    delete_orphans: bool,
}

impl SubmissionPipeline {
    pub fn new(store: Arc<dyn RecordStore>, submitter: Submitter, delete_orphans: bool) -> Self {
        Self {
            store,
            submitter,
            delete_orphans,
        }
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    /// Writes the tree and its image. `Ok(None)` means there was no picture and nothing
    /// was sent.
    pub async fn submit(
        &self,
        picture: Option<&CapturedImage>,
        location: &Location,
        values: &FormValues,
    ) -> Result<Option<Submission>, SubmitError> {
        let Some(picture) = picture else {
            debug!("submit ignored: nothing captured yet");
            return Ok(None);
        };

        self.store
            .check_picture(picture)
            .map_err(SubmitError::Picture)?;

        let tree = NewTree {
            location: location.as_record_field(),
            user_id: self.submitter.id.clone(),
            tree_type: values.tree_type.clone(),
            name: values.name.clone(),
        };
        let tree_id = self
            .store
            .create_tree(&tree)
            .await
            .map_err(SubmitError::TreeCreation)?;
        info!("tree {tree_id} created for user {}", self.submitter.id);

        let image = NewTreeImage {
            picture: picture.clone(),
            tree_id: tree_id.clone(),
            user_id: self.submitter.id.clone(),
            upvotes: 0,
        };
        match self.store.create_tree_image(&image).await {
            Ok(image_id) => {
                info!(
                    "image {image_id} ({} bytes) attached to tree {tree_id}",
                    picture.byte_len()
                );
                Ok(Some(Submission { tree_id, image_id }))
            }
            Err(cause) => {
                let compensated = self.compensate(&tree_id).await;
                Err(SubmitError::ImageCreation {
                    tree_id,
                    compensated,
                    cause,
                })
            }
        }
    }

    async fn compensate(&self, tree_id: &str) -> bool {
        if !self.delete_orphans {
            warn!("tree {tree_id} left without an image");
            return false;
        }

        match self.store.delete_tree(tree_id).await {
            Ok(()) => {
                info!("deleted orphaned tree {tree_id}");
                true
            }
            Err(err) => {
                error!("failed to delete orphaned tree {tree_id}: {err:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        camera::image::CapturedImage,
        form::FormValues,
        location::Location,
        records::testing::{Call, RecordingStore},
    };

    use super::{SubmissionPipeline, SubmitError, Submitter};

    fn pipeline(store: Arc<RecordingStore>, delete_orphans: bool) -> SubmissionPipeline {
        SubmissionPipeline::new(
            store,
            Submitter {
                id: "user_42".to_string(),
                name: Some("Ayu".to_string()),
            },
            delete_orphans,
        )
    }

    fn values() -> FormValues {
        FormValues {
            name: "Grandma's Jackfruit".to_string(),
            tree_type: "Jackfruit".to_string(),
            description: "Planted after the rains".to_string(),
        }
    }

    fn location() -> Location {
        Location {
            latitude: "-7.797068".to_string(),
            longitude: "110.370529".to_string(),
        }
    }

    fn picture() -> CapturedImage {
        CapturedImage::jpeg(vec![0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9])
    }

    #[tokio::test]
    async fn no_picture_means_no_network_calls() {
        let store = Arc::new(RecordingStore::default());
        let outcome = pipeline(store.clone(), false)
            .submit(None, &location(), &values())
            .await
            .expect("submit without picture is not an error");

        assert!(outcome.is_none());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn image_is_filed_under_the_returned_tree_id() {
        let store = Arc::new(RecordingStore::default());
        let submission = pipeline(store.clone(), false)
            .submit(Some(&picture()), &location(), &values())
            .await
            .expect("submit should succeed")
            .expect("records should be written");

        assert_eq!(submission.tree_id, "tree_abc123");
        assert_eq!(submission.image_id, "img_xyz789");

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        let Call::CreateTree(tree) = &calls[0] else {
            panic!("tree must be created first, got {:?}", calls[0]);
        };
        assert_eq!(tree.location, "-7.797068, 110.370529");
        assert_eq!(tree.user_id, "user_42");
        assert_eq!(tree.tree_type, "Jackfruit");
        assert_eq!(tree.name, "Grandma's Jackfruit");

        let Call::CreateTreeImage(image) = &calls[1] else {
            panic!("image must follow the tree, got {:?}", calls[1]);
        };
        assert_eq!(image.tree_id, submission.tree_id);
        assert_eq!(image.user_id, "user_42");
        assert_eq!(image.upvotes, 0);
        assert_eq!(image.picture, picture());
    }

    #[tokio::test]
    async fn unresolved_location_is_sent_empty() {
        let store = Arc::new(RecordingStore::default());
        pipeline(store.clone(), false)
            .submit(Some(&picture()), &Location::default(), &values())
            .await
            .expect("submit should succeed");

        let calls = store.calls();
        let Call::CreateTree(tree) = &calls[0] else {
            panic!("tree must be created first");
        };
        assert_eq!(tree.location, ", ");
    }

    #[tokio::test]
    async fn refused_picture_stops_before_the_tree() {
        let store = Arc::new(RecordingStore {
            refuse_picture: true,
            ..RecordingStore::default()
        });
        let err = pipeline(store.clone(), true)
            .submit(Some(&picture()), &location(), &values())
            .await
            .expect_err("picture check must surface");

        assert!(matches!(err, SubmitError::Picture(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_tree_stops_before_the_image() {
        let store = Arc::new(RecordingStore {
            fail_tree: true,
            ..RecordingStore::default()
        });
        let err = pipeline(store.clone(), true)
            .submit(Some(&picture()), &location(), &values())
            .await
            .expect_err("tree failure must surface");

        assert!(matches!(err, SubmitError::TreeCreation(_)));
        assert!(err.to_string().starts_with("tree creation failed"));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_image_leaves_orphan_by_default() {
        let store = Arc::new(RecordingStore {
            fail_image: true,
            ..RecordingStore::default()
        });
        let err = pipeline(store.clone(), false)
            .submit(Some(&picture()), &location(), &values())
            .await
            .expect_err("image failure must surface");

        let SubmitError::ImageCreation {
            tree_id,
            compensated,
            ..
        } = &err
        else {
            panic!("expected image failure, got {err:?}");
        };
        assert_eq!(tree_id, "tree_abc123");
        assert!(!compensated);
        assert!(err.to_string().contains("status=413"));
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_image_deletes_tree_when_compensating() {
        let store = Arc::new(RecordingStore {
            fail_image: true,
            ..RecordingStore::default()
        });
        let err = pipeline(store.clone(), true)
            .submit(Some(&picture()), &location(), &values())
            .await
            .expect_err("image failure must surface");

        assert!(matches!(
            err,
            SubmitError::ImageCreation {
                compensated: true,
                ..
            }
        ));
        assert_eq!(
            store.calls().last(),
            Some(&Call::DeleteTree("tree_abc123".to_string()))
        );
    }

    #[tokio::test]
    async fn failed_compensation_is_reported() {
        let store = Arc::new(RecordingStore {
            fail_image: true,
            fail_delete: true,
            ..RecordingStore::default()
        });
        let err = pipeline(store.clone(), true)
            .submit(Some(&picture()), &location(), &values())
            .await
            .expect_err("image failure must surface");

        assert!(matches!(
            err,
            SubmitError::ImageCreation {
                compensated: false,
                ..
            }
        ));
        assert_eq!(store.calls().len(), 3);
    }
}
