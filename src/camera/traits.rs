use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Child;

use crate::core::state::FacingMode;

#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Spawns a process writing an MJPEG feed to its stdout.
    async fn spawn_stream(&self, facing: FacingMode) -> Result<Child>;

    /// Reads a single encoded frame. An empty buffer means the device gave nothing.
    async fn grab_frame(&self, facing: FacingMode) -> Result<Vec<u8>>;
}

pub type SharedBackend = Arc<dyn CameraBackend>;

#[async_trait]
impl<T: CameraBackend + ?Sized> CameraBackend for Arc<T> {
    async fn spawn_stream(&self, facing: FacingMode) -> Result<Child> {
        (**self).spawn_stream(facing).await
    }

    async fn grab_frame(&self, facing: FacingMode) -> Result<Vec<u8>> {
        (**self).grab_frame(facing).await
    }
}
