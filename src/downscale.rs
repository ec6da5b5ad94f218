//! Thumbnail re-encoding applied before gallery persistence.

use crate::error::{PosterError, Result};
use crate::upload::DataUri;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// Width cap and quality used when shrinking gallery images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownscaleOptions {
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for DownscaleOptions {
    fn default() -> Self {
        Self {
            max_width: 800,
            quality: 70,
        }
    }
}

/// Output dimensions for an image capped at `max_width`.
///
/// Images already within the cap keep their size.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled =
        (u64::from(height) * u64::from(max_width) + u64::from(width) / 2) / u64::from(width);
    (max_width, (scaled as u32).max(1))
}

/// Decodes `source`, caps its width and re-encodes it as JPEG.
pub fn downscale_data_uri(source: &DataUri, options: &DownscaleOptions) -> Result<DataUri> {
    if !source.is_image() {
        return Err(PosterError::InvalidRequest(format!(
            "cannot downscale {} content",
            source.mime_type
        )));
    }
    let bytes = source.decode()?;
    let decoded = image::load_from_memory(&bytes)?;
    let jpeg = downscale_image(&decoded, options)?;
    Ok(DataUri::from_bytes(&jpeg, "image/jpeg"))
}

/// Caps `image` to `options.max_width` and encodes it as JPEG bytes.
pub fn downscale_image(image: &DynamicImage, options: &DownscaleOptions) -> Result<Vec<u8>> {
    let (width, height) = scaled_dimensions(image.width(), image.height(), options.max_width);
    let resized = if (width, height) == (image.width(), image.height()) {
        image.to_rgb8()
    } else {
        image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8()
    };

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, options.quality.clamp(1, 100));
    encoder.encode_image(&resized)?;
    tracing::debug!(
        width,
        height,
        quality = options.quality,
        size = bytes.len(),
        "downscaled image"
    );
    Ok(bytes)
}
