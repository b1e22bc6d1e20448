pub mod source;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

pub use source::{Position, PositionSource};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Geolocation is not supported by this station.")]
    Unsupported,
}

/// Coordinates as the record stores them: default float formatting, empty until a fix lands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub latitude: String,
    pub longitude: String,
}

impl Location {
    pub fn from_position(position: Position) -> Self {
        Self {
            latitude: position.latitude.to_string(),
            longitude: position.longitude.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty() && self.longitude.is_empty()
    }

    pub fn as_record_field(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

#[derive(Default)]
struct Slot {
    session: u64,
    location: Location,
}

#[derive(Clone)]
pub struct LocationResolver {
    source: Option<Arc<dyn PositionSource>>,
    slot: Arc<Mutex<Slot>>,
}

impl LocationResolver {
    pub fn new(source: Option<Arc<dyn PositionSource>>) -> Self {
        Self {
            source,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.source.is_some()
    }

    /// Opens a new capture session and requests one fix in the background.
    ///
    /// Callers are free to drop the handle; nothing waits on the fix. A fix that
    /// arrives after a newer session started is thrown away.
    pub async fn resolve(&self) -> Result<JoinHandle<()>, LocationError> {
        let Some(source) = self.source.clone() else {
            return Err(LocationError::Unsupported);
        };

        let session = {
            let mut slot = self.slot.lock().await;
            slot.session += 1;
            slot.session
        };

        let slot = self.slot.clone();
        Ok(tokio::spawn(async move {
            let position = match source.current_position().await {
                Ok(position) => position,
                Err(err) => {
                    warn!("position fix failed: {err:#}");
                    return;
                }
            };

            let mut slot = slot.lock().await;
            if slot.session != session {
                debug!(
                    "discarding fix from session {session}, current is {}",
                    slot.session
                );
                return;
            }
            slot.location = Location::from_position(position);
            info!(
                "location resolved: lat={} long={}",
                slot.location.latitude, slot.location.longitude
            );
        }))
    }

    pub async fn current(&self) -> Location {
        self.slot.lock().await.location.clone()
    }
}
