//! Saving rendered frames to image files.

use std::path::Path;

use image::{ImageBuffer, Rgba};

/// Saves tightly packed RGBA8 pixels (top-left origin) to `path`.
///
/// The format follows the extension: `.png`, `.jpg` or `.jpeg`.
pub fn save_image(
    path: impl AsRef<Path>,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, rgba.to_vec()).ok_or(ScreenshotError::InvalidImageData)?;

    match extension.as_str() {
        "png" => img.save_with_format(path, image::ImageFormat::Png)?,
        "jpg" | "jpeg" => {
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => return Err(ScreenshotError::UnsupportedFormat(extension)),
    }

    log::info!("saved {width}x{height} frame to {}", path.display());
    Ok(())
}

/// Encodes RGBA8 pixels as PNG in memory.
pub fn encode_png(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScreenshotError> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, rgba.to_vec()).ok_or(ScreenshotError::InvalidImageData)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("pixel buffer does not match the image size")]
    InvalidImageData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&[255, 0, 0, 255, 0, 255, 0, 255], 2, 1).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_size_mismatch() {
        assert!(matches!(encode_png(&[0; 4], 2, 2), Err(ScreenshotError::InvalidImageData)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = save_image("frame.bmp2", &[0; 4], 1, 1).unwrap_err();
        assert!(matches!(err, ScreenshotError::UnsupportedFormat(ext) if ext == "bmp2"));
    }
}
