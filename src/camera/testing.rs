use std::{
    process::Stdio,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::core::state::FacingMode;

use super::{ffmpeg_backend::STREAM_BOUNDARY, traits::CameraBackend};

pub fn fake_jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0x74, 0x72, 0x65, 0x65, 0xFF, 0xD9]
}

/// Hands out a fixed frame and records how the device was used.
///
/// The live feed is a shell child that prints one mpjpeg part holding `stream_frame`, then idles.
pub struct MockBackend {
    frame: Vec<u8>,
    stream_frame: Vec<u8>,
    broken: bool,
    busy_failures: AtomicUsize,
    grabs: AtomicUsize,
    last_facing: Mutex<Option<FacingMode>>,
}

impl MockBackend {
    pub fn with_frame(frame: Vec<u8>) -> Self {
        Self {
            stream_frame: frame.clone(),
            frame,
            broken: false,
            busy_failures: AtomicUsize::new(0),
            grabs: AtomicUsize::new(0),
            last_facing: Mutex::new(None),
        }
    }

    /// The first `count` grabs fail the way a contended v4l2 device does.
    pub fn busy_for(self, count: usize) -> Self {
        self.busy_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn streaming(mut self, frame: Vec<u8>) -> Self {
        self.stream_frame = frame;
        self
    }

    /// Every grab fails the way ffmpeg does when the device vanished.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn last_facing(&self) -> Option<FacingMode> {
        *self.last_facing.lock().expect("facing lock poisoned")
    }
}

#[async_trait]
impl CameraBackend for MockBackend {
    async fn spawn_stream(&self, _facing: FacingMode) -> Result<Child> {
        let frame: String = self
            .stream_frame
            .iter()
            .map(|byte| format!("\\{byte:03o}"))
            .collect();
        let script = format!(
            "printf 'Content-Type: image/jpeg\\r\\n\\r\\n{frame}\\r\\n--{STREAM_BOUNDARY}\\r\\n'; exec sleep 30"
        );
        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }

    async fn grab_frame(&self, facing: FacingMode) -> Result<Vec<u8>> {
        self.grabs.fetch_add(1, Ordering::SeqCst);
        *self.last_facing.lock().expect("facing lock poisoned") = Some(facing);

        let busy = self
            .busy_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if busy {
            bail!("/dev/video0: Device or resource busy");
        }
        if self.broken {
            bail!("ffmpeg capture failed: /dev/video0: No such device");
        }
        Ok(self.frame.clone())
    }
}
