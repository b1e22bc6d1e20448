use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use thiserror::Error;

/// Shown in the preview slot until something has been captured.
pub const PLACEHOLDER_URL: &str = "/static/tree.svg";

pub const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("data URL payload is empty")]
    Empty,
    #[error("data URL media type {0:?} is not an image type")]
    NotAnImage(String),
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// A still image ready for upload, with the URL used to preview it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data: Bytes,
    mime: String,
    preview_url: String,
}

/// Accepts `image/<subtype>` where the subtype is a plain media-type token.
fn is_image_mime(mime: &str) -> bool {
    let Some(subtype) = mime.strip_prefix("image/") else {
        return false;
    };
    !subtype.is_empty()
        && subtype
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "!#$&^_.+-".contains(ch))
}

impl CapturedImage {
    pub fn new(data: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        let data = data.into();
        let mime = mime.into();
        let preview_url = format!("data:{mime};base64,{}", STANDARD.encode(&data));
        Self {
            data,
            mime,
            preview_url,
        }
    }

    pub fn jpeg(data: impl Into<Bytes>) -> Self {
        Self::new(data, JPEG_MIME)
    }

    /// Decodes a `data:<mime>;base64,<payload>` URL as produced by a browser canvas.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url.trim().strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;

        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
            return Err(DataUrlError::NotBase64);
        }
        if !is_image_mime(&mime) {
            return Err(DataUrlError::NotAnImage(mime));
        }

        let data = STANDARD.decode(payload.trim())?;
        if data.is_empty() {
            return Err(DataUrlError::Empty);
        }

        Ok(Self {
            data: Bytes::from(data),
            mime,
            preview_url: url.trim().to_owned(),
        })
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn preview_url(&self) -> &str {
        &self.preview_url
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn file_name(&self) -> String {
        let extension = match self.mime.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        };
        format!("capture.{extension}")
    }
}
