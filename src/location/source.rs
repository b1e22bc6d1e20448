use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// One-shot position fixes, the station-side stand-in for browser geolocation.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Position>;
}

/// Coordinates surveyed once for a station that never moves.
pub struct FixedPosition(pub Position);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Position> {
        Ok(self.0)
    }
}

/// Asks a geolocation HTTP endpoint (GPS bridge or IP lookup) for the current fix.
pub struct HttpPosition {
    url: String,
    client: Client,
}

#[derive(Deserialize)]
struct PositionResponse {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

impl HttpPosition {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl PositionSource for HttpPosition {
    async fn current_position(&self) -> Result<Position> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("failed to send geolocation request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("geolocation error status={status} body={body}");
        }

        let fix: PositionResponse = response
            .json()
            .await
            .context("geolocation response is not a position")?;
        Ok(Position {
            latitude: fix.latitude,
            longitude: fix.longitude,
        })
    }
}

/// Fixed coordinates win over an HTTP source; `None` means the station cannot locate itself.
pub fn from_config(config: &AppConfig) -> Option<Arc<dyn PositionSource>> {
    if let Some((latitude, longitude)) = config.fixed_location {
        return Some(Arc::new(FixedPosition(Position {
            latitude,
            longitude,
        })));
    }

    config
        .geolocation_url
        .clone()
        .map(|url| Arc::new(HttpPosition::new(url)) as Arc<dyn PositionSource>)
}

#[cfg(test)]
mod tests {
    use super::PositionResponse;

    #[test]
    fn accepts_long_and_short_coordinate_names() {
        let long: PositionResponse =
            serde_json::from_str(r#"{"latitude": -6.2, "longitude": 106.816666}"#)
                .expect("long names should parse");
        assert_eq!(long.latitude, -6.2);
        assert_eq!(long.longitude, 106.816666);

        let short: PositionResponse =
            serde_json::from_str(r#"{"status":"success","lat":52.52,"lon":13.405}"#)
                .expect("ip lookup style should parse");
        assert_eq!(short.latitude, 52.52);
        assert_eq!(short.longitude, 13.405);
    }
}
