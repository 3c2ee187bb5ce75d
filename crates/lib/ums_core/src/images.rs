//! Profile image storage.
//!
//! The service treats image hosting as `upload(bytes) -> URL`. The bundled
//! [`LocalImageStore`] writes files under a directory that the HTTP layer
//! serves at `/uploads`.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Folder profile pictures are stored under.
pub const USER_IMAGES_FOLDER: &str = "user-images";

/// Largest accepted upload: 5 MiB.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted MIME types and the file extension used for each.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Only JPEG, PNG, GIF, and WEBP images are allowed")]
    UnsupportedType(String),

    #[error("Image exceeds the 5 MB limit")]
    TooLarge(usize),

    #[error("Image storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded image held in memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    /// Check type and size, returning the file extension to store under.
    pub fn validate(&self) -> Result<&'static str, ImageError> {
        let ext = ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| self.content_type.eq_ignore_ascii_case(mime))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| ImageError::UnsupportedType(self.content_type.clone()))?;
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge(self.bytes.len()));
        }
        Ok(ext)
    }
}

/// Stores images and returns a public URL for each.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageError>;
}

/// Writes images to a local directory.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    /// `public_base_url` is the externally visible origin, e.g.
    /// `http://localhost:5000`. Files are addressed as
    /// `{public_base_url}/uploads/{folder}/{file}`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageError> {
        let ext = image.validate()?;
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{ext}", Uuid::now_v7());
        tokio::fs::write(dir.join(&file_name), &image.bytes).await?;
        debug!(folder, file = %file_name, size = image.bytes.len(), "stored image");

        Ok(format!("{}/uploads/{folder}/{file_name}", self.public_base_url))
    }
}
