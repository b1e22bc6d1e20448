use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::{config::AppConfig, core::state::FacingMode};

use super::traits::CameraBackend;

pub const STREAM_BOUNDARY: &str = "treecam";

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    front_device: String,
    back_device: Option<String>,
    input_format: String,
    width: u32,
    height: u32,
}

impl FfmpegBackend {
    pub fn new(front_device: String, input_format: String) -> Self {
        Self {
            front_device,
            back_device: None,
            input_format,
            width: 720,
            height: 360,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            back_device: config.camera_device_back.clone(),
            width: config.capture_width,
            height: config.capture_height,
            ..Self::new(
                config.camera_device.clone(),
                config.camera_input_format.clone(),
            )
        }
    }

    /// Back camera falls back to the front device on single-camera stations.
    pub fn device_for(&self, facing: FacingMode) -> &str {
        match facing {
            FacingMode::User => &self.front_device,
            FacingMode::Environment => self.back_device.as_deref().unwrap_or(&self.front_device),
        }
    }

    fn input_args(&self, facing: FacingMode) -> Vec<String> {
        vec![
            "-hide_banner".to_owned(),
            "-loglevel".to_owned(),
            "error".to_owned(),
            "-f".to_owned(),
            "v4l2".to_owned(),
            "-input_format".to_owned(),
            self.input_format.clone(),
            "-video_size".to_owned(),
            format!("{}x{}", self.width, self.height),
            "-i".to_owned(),
            self.device_for(facing).to_owned(),
        ]
    }
}

#[async_trait]
impl CameraBackend for FfmpegBackend {
    async fn spawn_stream(&self, facing: FacingMode) -> Result<Child> {
        let child = Command::new("ffmpeg")
            .args(self.input_args(facing))
            .args(["-f", "mpjpeg", "-boundary_tag", STREAM_BOUNDARY, "pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn ffmpeg stream process")?;

        Ok(child)
    }

    async fn grab_frame(&self, facing: FacingMode) -> Result<Vec<u8>> {
        let output = Command::new("ffmpeg")
            .args(self.input_args(facing))
            .args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "mjpeg", "pipe:1"])
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to execute ffmpeg grab command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg grab exited with {}: {}", output.status, stderr.trim());
        }

        Ok(output.stdout)
    }
}
