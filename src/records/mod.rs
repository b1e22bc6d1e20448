pub mod pocketbase;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::camera::image::CapturedImage;

pub const TREES: &str = "trees";
pub const TREE_IMAGES: &str = "tree_images";

/// Body of a `trees` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTree {
    pub location: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub tree_type: String,
    pub name: String,
}

/// Body of a `tree_images` record, sent as multipart because it carries the picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTreeImage {
    pub picture: CapturedImage,
    pub tree_id: String,
    pub user_id: String,
    pub upvotes: u32,
}

/// Remote collections the station writes to. Create calls return the id the backend assigned.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails when the picture could never be uploaded, before anything is written.
    fn check_picture(&self, _picture: &CapturedImage) -> Result<()> {
        Ok(())
    }
    async fn create_tree(&self, tree: &NewTree) -> Result<String>;
    async fn create_tree_image(&self, image: &NewTreeImage) -> Result<String>;
    async fn delete_tree(&self, tree_id: &str) -> Result<()>;
}
