use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hy3d_core::GenerationRequest;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upload limit for reference images.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image is {size} bytes; the limit is {max} bytes (5MB)")]
    TooLarge { size: u64, max: u64 },

    #[error("image file is empty")]
    Empty,

    #[error("unsupported image format; expected PNG, JPEG or WEBP")]
    UnsupportedFormat,
}

/// Sniffs the MIME type from the file signature.
pub fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// `data:<mime>;base64,<payload>` for an in-memory image.
pub fn encode_image_bytes(bytes: &[u8]) -> Result<String, ImageInputError> {
    if bytes.is_empty() {
        return Err(ImageInputError::Empty);
    }
    let size = bytes.len() as u64;
    if size > MAX_IMAGE_BYTES {
        return Err(ImageInputError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }
    let mime = detect_mime(bytes).ok_or(ImageInputError::UnsupportedFormat)?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

pub fn encode_image_file(path: &Path) -> Result<String, ImageInputError> {
    let io_err = |source| ImageInputError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Reject oversized files before reading them into memory.
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_IMAGE_BYTES {
        return Err(ImageInputError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }

    let bytes = std::fs::read(path).map_err(io_err)?;
    log::debug!("encoding {} ({} bytes)", path.display(), bytes.len());
    encode_image_bytes(&bytes)
}

pub fn image_request(path: &Path) -> anyhow::Result<GenerationRequest> {
    let data_url = encode_image_file(path)?;
    Ok(GenerationRequest::image(data_url)?)
}
