//! Media storage client
//!
//! Inquiry photos/videos are persisted to an external storage service before
//! the lead record is written. Each file is classified by its declared
//! content type and uploaded independently; the lead service joins on all
//! uploads and aborts creation if any fails.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use tracing::{debug, warn};

use crate::types::LeadhubError;

/// Classification of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by declared media type: `image/*` is an image, everything
    /// else is treated as video.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image") {
            MediaKind::Image
        } else {
            MediaKind::Video
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file received with a lead creation request
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_content_type(&self.content_type)
    }
}

/// External media storage: bytes in, public URL out
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<String, LeadhubError>;
}

/// HTTP media store: PUTs files to a storage service and derives the public
/// URL from the configured public base.
pub struct HttpMediaStore {
    client: reqwest::Client,
    storage_url: String,
    public_url: String,
}

impl HttpMediaStore {
    pub fn new(storage_url: &str, public_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            storage_url: storage_url.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, file_name: &str, kind: MediaKind) -> String {
        format!("media/{}/{}", kind.as_str(), file_name)
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<String, LeadhubError> {
        let path = self.object_path(file_name, kind);
        let url = format!("{}/{}", self.storage_url, path);

        debug!(file = %file_name, kind = %kind, bytes = data.len(), "Uploading media");

        let response = self
            .client
            .put(&url)
            .body(data)
            .send()
            .await
            .map_err(|e| LeadhubError::Upstream(format!("Media upload failed: {e}")))?;

        if !response.status().is_success() {
            warn!(
                file = %file_name,
                status = %response.status(),
                "Media storage rejected upload"
            );
            return Err(LeadhubError::Upstream(format!(
                "Media storage returned {} for {}",
                response.status(),
                file_name
            )));
        }

        Ok(format!("{}/{}", self.public_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_from_content_type() {
        assert_eq!(MediaKind::from_content_type("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_content_type("image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_content_type("video/mp4"), MediaKind::Video);
        // Anything not image/* is treated as video, mirroring the upload rules
        assert_eq!(
            MediaKind::from_content_type("application/octet-stream"),
            MediaKind::Video
        );
    }

    #[test]
    fn test_object_path_includes_kind() {
        let store = HttpMediaStore::new("http://storage:9000/", "https://cdn.example.com");
        assert_eq!(
            store.object_path("a.png", MediaKind::Image),
            "media/image/a.png"
        );
        assert_eq!(
            store.object_path("b.mp4", MediaKind::Video),
            "media/video/b.mp4"
        );
    }
}
