//! Drawing storage: content sniffing plus a disk-backed object store.
//!
//! Uploads are validated by magic bytes, never by the declared content type.
//! Stored files land under the configured data root and are served back as
//! static files, so the returned URL is immediately retrievable.

use std::path::{Path, PathBuf};

use coinsketch_core::room::generate_id;
use thiserror::Error;

/// Sniffed image type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub ext: &'static str,
    pub mime: &'static str,
}

const PNG: ImageKind = ImageKind {
    ext: "png",
    mime: "image/png",
};
const JPEG: ImageKind = ImageKind {
    ext: "jpg",
    mime: "image/jpeg",
};
const GIF: ImageKind = ImageKind {
    ext: "gif",
    mime: "image/gif",
};
const WEBP: ImageKind = ImageKind {
    ext: "webp",
    mime: "image/webp",
};

/// Identify an image payload from its magic bytes.
///
/// Accepts the formats a drawing canvas realistically exports (PNG, JPEG,
/// GIF, WebP); anything else is rejected upstream as a validation error.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(PNG);
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(JPEG);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(GIF);
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some(WEBP);
    }
    None
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("payload is not a recognised image")]
    NotAnImage,

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored image: the public retrieval URL and the storage-relative path.
#[derive(Debug, Clone)]
pub struct StoredDrawing {
    pub url: String,
    pub path: String,
}

/// Disk-backed object store for drawings.
pub struct DrawingStore {
    root: PathBuf,
}

impl DrawingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store a player's drawing under
    /// `drawings/{room_code}/{player_id}-{nonce}.{ext}`.
    ///
    /// The nonce keeps resubmissions from overwriting each other; writing
    /// the same path twice is an overwrite, which is the idempotency the
    /// submission path relies on.
    pub async fn store_drawing(
        &self,
        room_code: &str,
        player_id: &str,
        bytes: &[u8],
    ) -> Result<StoredDrawing, UploadError> {
        let kind = sniff_image(bytes).ok_or(UploadError::NotAnImage)?;
        let nonce = &generate_id()[..8];
        let rel = format!("{room_code}/{player_id}-{nonce}.{}", kind.ext);
        self.write(&rel, bytes).await?;
        Ok(StoredDrawing {
            url: format!("/drawings/{rel}"),
            path: rel,
        })
    }

    /// Store an unscoped upload under a generated unique name.
    pub async fn store_upload(&self, bytes: &[u8]) -> Result<StoredDrawing, UploadError> {
        let kind = sniff_image(bytes).ok_or(UploadError::NotAnImage)?;
        let rel = format!("{}.{}", generate_id(), kind.ext);
        self.write(&rel, bytes).await?;
        Ok(StoredDrawing {
            url: format!("/drawings/{rel}"),
            path: rel,
        })
    }

    /// Directory that the static file service should serve.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write(&self, rel: &str, bytes: &[u8]) -> Result<(), std::io::Error> {
        let full = self.root.join(rel);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, bytes).await
    }
}
