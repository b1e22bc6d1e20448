use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    Idle,
    Ready,
    Streaming,
}

/// Which way the camera points. Mirrors the browser `facingMode` constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::User => Self::Environment,
            Self::Environment => Self::User,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::User => "front",
            Self::Environment => "back",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraStatus {
    pub enabled: bool,
    pub stream_active: bool,
    pub facing: FacingMode,
    pub state: CameraState,
}
