use crate::error::ClientError;
use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

/// Photo payload normalized to JPEG, the only format the send endpoint
/// accepts.
#[derive(Clone, Debug)]
pub struct Attachment {
    data: Vec<u8>,
}

impl Attachment {
    /// Decodes any supported image format and re-encodes as JPEG.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| ClientError::Validation(format!("image decode: {err}")))?;
        let mut data = Cursor::new(Vec::new());
        decoded
            .write_to(&mut data, ImageFormat::Jpeg)
            .map_err(|err| ClientError::Validation(format!("image encode: {err}")))?;
        Ok(Self {
            data: data.into_inner(),
        })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path.as_ref())
            .await
            .map_err(|err| ClientError::Validation(format!("image read: {err}")))?;
        Self::from_bytes(&bytes)
    }

    pub async fn from_url(url: &str) -> Result<Self, ClientError> {
        let response = reqwest::get(url)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|err| ClientError::Remote(format!("image fetch: {err}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientError::Remote(format!("image fetch: {err}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn into_jpeg(self) -> Vec<u8> {
        self.data
    }
}
