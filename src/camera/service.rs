use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Result, bail};
use tokio::{process::Child, sync::watch};
use tracing::debug;

use crate::core::state::{CameraState, CameraStatus, FacingMode};

use super::{image::CapturedImage, jpeg, traits::CameraBackend};

/// Marks the live feed as held. Dropping it releases the feed, whatever the exit path.
pub struct StreamLease {
    active: Arc<AtomicBool>,
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

pub struct StreamSession {
    pub child: Child,
    pub cancel_rx: watch::Receiver<bool>,
    pub lease: StreamLease,
}

pub struct CameraService<B: CameraBackend> {
    backend: B,
    enabled: bool,
    facing: FacingMode,
    stream_active: Arc<AtomicBool>,
    stream_cancel_tx: Option<watch::Sender<bool>>,
}

impl<B: CameraBackend> CameraService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            enabled: false,
            facing: FacingMode::default(),
            stream_active: Arc::new(AtomicBool::new(false)),
            stream_cancel_tx: None,
        }
    }

    pub fn start(&mut self) {
        self.enabled = true;
    }

    /// Ends the capture session and tells any live feed to shut down.
    pub fn stop(&mut self) {
        self.enabled = false;
        self.cancel_stream();
    }

    /// Flips front/back. A running feed is cancelled so the next one opens the other device.
    pub fn toggle_facing(&mut self) -> FacingMode {
        self.facing = self.facing.toggled();
        self.cancel_stream();
        self.facing
    }

    pub async fn open_stream_session(&mut self) -> Result<StreamSession> {
        if !self.enabled {
            bail!("camera is not started");
        }
        if self.is_stream_active() {
            bail!("stream already active");
        }

        let child = self.backend.spawn_stream(self.facing).await?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.stream_cancel_tx = Some(cancel_tx);
        self.stream_active.store(true, Ordering::SeqCst);

        Ok(StreamSession {
            child,
            cancel_rx,
            lease: StreamLease {
                active: self.stream_active.clone(),
            },
        })
    }

    /// Takes a still. While a feed runs the caller passes its newest frame, otherwise the
    /// device is read once. Returns `None`, leaving any earlier capture alone, when the camera
    /// is off or no complete frame is available.
    pub async fn capture(&self, streamed_frame: Option<Vec<u8>>) -> Result<Option<CapturedImage>> {
        if !self.enabled {
            debug!("capture ignored: camera is not started");
            return Ok(None);
        }

        let frame = if self.is_stream_active() {
            streamed_frame
        } else {
            Some(self.backend.grab_frame(self.facing).await?)
        };

        Ok(frame
            .filter(|frame| jpeg::is_jpeg(frame))
            .map(CapturedImage::jpeg))
    }

    fn cancel_stream(&mut self) {
        if let Some(cancel_tx) = self.stream_cancel_tx.take() {
            let _ = cancel_tx.send(true);
        }
    }

    pub fn is_stream_active(&self) -> bool {
        self.stream_active.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> CameraStatus {
        let stream_active = self.is_stream_active();
        let state = if stream_active {
            CameraState::Streaming
        } else if self.enabled {
            CameraState::Ready
        } else {
            CameraState::Idle
        };

        CameraStatus {
            enabled: self.enabled,
            stream_active,
            facing: self.facing,
            state,
        }
    }
}
