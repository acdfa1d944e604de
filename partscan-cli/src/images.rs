use partscan_gemini::ImagePayload;
use std::path::Path;

use crate::errors::CliError;

/// Reads an image file, sniffing its MIME type from the contents.
///
/// # Errors
///
/// Returns `CliError::Image` if the file cannot be read and
/// `CliError::EmptyImage` if it has no bytes.
pub async fn load_image(path: &Path) -> Result<ImagePayload, CliError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(CliError::EmptyImage(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded image");
    Ok(ImagePayload::from_bytes(bytes))
}
