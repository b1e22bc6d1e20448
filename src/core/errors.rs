use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::pipeline::SubmitError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(format!("{value:#}"))
    }
}

impl From<SubmitError> for AppError {
    fn from(value: SubmitError) -> Self {
        match &value {
            SubmitError::Picture(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{value}. Nothing was saved, capture the picture again."),
            ),
            SubmitError::TreeCreation(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                format!("{value}. Nothing was saved, please retry."),
            ),
            SubmitError::ImageCreation {
                compensated: true, ..
            } => Self::new(
                StatusCode::BAD_GATEWAY,
                format!("{value}. The tree record was removed again, please retry."),
            ),
            SubmitError::ImageCreation {
                compensated: false,
                ..
            } => Self::new(
                StatusCode::BAD_GATEWAY,
                format!("{value}. The tree record remains without a picture."),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
