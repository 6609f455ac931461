//! Loading image files for attachment

use anyhow::{Context, bail};
use medchat_ai::EncodedImage;
use std::path::{Path, PathBuf};

/// Images larger than this are refused
const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Expand a leading `~` to the home directory
pub fn expand_path(path_str: &str) -> PathBuf {
    if let Some(stripped) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path_str == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    PathBuf::from(path_str)
}

/// Guess an image MIME type from the file extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Read an image file and encode it for sending
pub async fn load_image(path_str: &str) -> anyhow::Result<EncodedImage> {
    let path = expand_path(path_str.trim());
    let Some(mime) = mime_for_path(&path) else {
        bail!("unsupported image type: {}", path.display());
    };

    let meta = tokio::fs::metadata(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    if meta.len() > MAX_IMAGE_BYTES {
        bail!(
            "{} is too large ({} bytes, limit {})",
            path.display(),
            meta.len(),
            MAX_IMAGE_BYTES
        );
    }

    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(EncodedImage::from_bytes(mime, &bytes)?)
}
