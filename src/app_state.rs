use std::{sync::Arc, time::Instant};

use tokio::sync::{Mutex, Semaphore};

use crate::{
    camera::{
        image::{CapturedImage, PLACEHOLDER_URL},
        service::CameraService,
        traits::SharedBackend,
    },
    config::AppConfig,
    location::LocationResolver,
    pipeline::SubmissionPipeline,
};

pub struct AppState {
    pub config: AppConfig,
    pub camera: Mutex<CameraService<SharedBackend>>,
    pub location: LocationResolver,
    pub pipeline: SubmissionPipeline,
    pub stream_limit: Arc<Semaphore>,
    pub last_activity: Mutex<Instant>,
    latest_stream_frame: Mutex<Option<Vec<u8>>>,
    captured: Mutex<Option<CapturedImage>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        camera: CameraService<SharedBackend>,
        location: LocationResolver,
        pipeline: SubmissionPipeline,
    ) -> Self {
        Self {
            config,
            camera: Mutex::new(camera),
            location,
            pipeline,
            stream_limit: Arc::new(Semaphore::new(1)),
            last_activity: Mutex::new(Instant::now()),
            latest_stream_frame: Mutex::new(None),
            captured: Mutex::new(None),
        }
    }

    pub async fn update_activity(&self) {
        let mut last_activity = self.last_activity.lock().await;
        *last_activity = Instant::now();
    }

    pub async fn idle_seconds(&self) -> u64 {
        let last_activity = self.last_activity.lock().await;
        last_activity.elapsed().as_secs()
    }

    pub async fn set_latest_stream_frame(&self, frame: Vec<u8>) {
        let mut latest = self.latest_stream_frame.lock().await;
        *latest = Some(frame);
    }

    pub async fn latest_stream_frame(&self) -> Option<Vec<u8>> {
        let latest = self.latest_stream_frame.lock().await;
        latest.clone()
    }

    pub async fn clear_latest_stream_frame(&self) {
        let mut latest = self.latest_stream_frame.lock().await;
        *latest = None;
    }

    /// Replaces whatever was captured before.
    pub async fn set_captured(&self, image: CapturedImage) {
        let mut captured = self.captured.lock().await;
        *captured = Some(image);
    }

    pub async fn captured(&self) -> Option<CapturedImage> {
        let captured = self.captured.lock().await;
        captured.clone()
    }

    pub async fn preview_url(&self) -> String {
        let captured = self.captured.lock().await;
        captured
            .as_ref()
            .map(|image| image.preview_url().to_owned())
            .unwrap_or_else(|| PLACEHOLDER_URL.to_owned())
    }
}
