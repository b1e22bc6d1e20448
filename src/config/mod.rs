use std::{env, net::SocketAddr};

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub auto_shutdown_seconds: u64,
    pub camera_device: String,
    pub camera_device_back: Option<String>,
    pub camera_input_format: String,
    pub capture_width: u32,
    pub capture_height: u32,
    pub pocketbase_url: String,
    pub pocketbase_token: Option<String>,
    pub submitter_id: String,
    pub submitter_name: Option<String>,
    pub fixed_location: Option<(f64, f64)>,
    pub geolocation_url: Option<String>,
    pub delete_orphaned_trees: bool,
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    optional_env(key)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn flag_env(key: &str) -> bool {
    optional_env(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn fixed_location_from_env() -> anyhow::Result<Option<(f64, f64)>> {
    match (
        optional_env("LOCATION_LATITUDE"),
        optional_env("LOCATION_LONGITUDE"),
    ) {
        (None, None) => Ok(None),
        (Some(latitude), Some(longitude)) => {
            let latitude = latitude
                .parse::<f64>()
                .with_context(|| format!("LOCATION_LATITUDE is not a number: {latitude}"))?;
            let longitude = longitude
                .parse::<f64>()
                .with_context(|| format!("LOCATION_LONGITUDE is not a number: {longitude}"))?;
            Ok(Some((latitude, longitude)))
        }
        _ => bail!("LOCATION_LATITUDE and LOCATION_LONGITUDE must be set together"),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name = optional_env("APP_NAME").unwrap_or_else(|| "treecam".to_owned());
        let bind_addr = optional_env("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let auto_shutdown_seconds = parsed_env("AUTO_SHUTDOWN_SECONDS", 120);

        let camera_device =
            optional_env("CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_owned());
        let camera_device_back = optional_env("CAMERA_DEVICE_BACK");
        let camera_input_format =
            optional_env("CAMERA_INPUT_FORMAT").unwrap_or_else(|| "mjpeg".to_owned());
        let capture_width = parsed_env("CAPTURE_WIDTH", 720);
        let capture_height = parsed_env("CAPTURE_HEIGHT", 360);

        let pocketbase_url =
            optional_env("POCKETBASE_URL").unwrap_or_else(|| "http://127.0.0.1:8090".to_owned());
        let pocketbase_token = optional_env("POCKETBASE_TOKEN");
        let submitter_id = optional_env("SUBMITTER_ID")
            .context("SUBMITTER_ID must be set to the id of the submitting user")?;
        let submitter_name = optional_env("SUBMITTER_NAME");

        let fixed_location = fixed_location_from_env()?;
        let geolocation_url = optional_env("GEOLOCATION_URL");
        let delete_orphaned_trees = flag_env("DELETE_ORPHANED_TREES");

        Ok(Self {
            app_name,
            bind_addr,
            auto_shutdown_seconds,
            camera_device,
            camera_device_back,
            camera_input_format,
            capture_width,
            capture_height,
            pocketbase_url,
            pocketbase_token,
            submitter_id,
            submitter_name,
            fixed_location,
            geolocation_url,
            delete_orphaned_trees,
        })
    }
}

#[cfg(test)]
impl AppConfig {
    /// Defaults from `from_env` with a submitter filled in, without touching the environment.
    pub(crate) fn sample() -> Self {
        Self {
            app_name: "treecam".to_owned(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auto_shutdown_seconds: 120,
            camera_device: "/dev/video0".to_owned(),
            camera_device_back: None,
            camera_input_format: "mjpeg".to_owned(),
            capture_width: 720,
            capture_height: 360,
            pocketbase_url: "http://127.0.0.1:8090".to_owned(),
            pocketbase_token: None,
            submitter_id: "user_1".to_owned(),
            submitter_name: None,
            fixed_location: None,
            geolocation_url: None,
            delete_orphaned_trees: false,
        }
    }
}
