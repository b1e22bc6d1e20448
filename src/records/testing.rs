use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::camera::image::CapturedImage;

use super::{NewTree, NewTreeImage, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateTree(NewTree),
    CreateTreeImage(NewTreeImage),
    DeleteTree(String),
}

/// In-memory store that logs every call and can be told to fail a step.
#[derive(Default)]
pub struct RecordingStore {
    pub refuse_picture: bool,
    pub fail_tree: bool,
    pub fail_image: bool,
    pub fail_delete: bool,
    pub(crate) calls: Mutex<Vec<Call>>,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock poisoned").push(call);
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    fn check_picture(&self, picture: &CapturedImage) -> Result<()> {
        if self.refuse_picture {
            bail!("captured image has an invalid mime type {:?}", picture.mime());
        }
        Ok(())
    }

    async fn create_tree(&self, tree: &NewTree) -> Result<String> {
        self.record(Call::CreateTree(tree.clone()));
        if self.fail_tree {
            bail!("pocketbase error status=400 body=trees rejected");
        }
        Ok("tree_abc123".to_owned())
    }

    async fn create_tree_image(&self, image: &NewTreeImage) -> Result<String> {
        self.record(Call::CreateTreeImage(image.clone()));
        if self.fail_image {
            bail!("pocketbase error status=413 body=file too large");
        }
        Ok("img_xyz789".to_owned())
    }

    async fn delete_tree(&self, tree_id: &str) -> Result<()> {
        self.record(Call::DeleteTree(tree_id.to_owned()));
        if self.fail_delete {
            bail!("pocketbase error status=403 body=forbidden");
        }
        Ok(())
    }
}
