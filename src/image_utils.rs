//! Image decoding and scaling utilities for inline timeline images.

use image::{DynamicImage, ImageFormat};

/// The shortest input that `imghdr` can inspect, since it checks fixed offsets up to byte 12.
const MIN_SNIFF_LEN: usize = 12;

/// Decodes the given image `data`,
/// using the `imghdr` library to determine which format it is.
///
/// PNG, JPEG, GIF, WebP and BMP are supported. Only the first frame of an animated image is used.
/// Invalid, truncated or unsupported data yields `None` rather than an error,
/// which callers treat as "no image".
pub fn decode_image(data: &[u8]) -> Option<DynamicImage> {
    if data.len() < MIN_SNIFF_LEN {
        tracing::debug!(target: "ui", "decode_image(): Too little data to be an image ({} bytes)", data.len());
        return None;
    }
    let format = match imghdr::from_bytes(data) {
        Some(imghdr::Type::Png) => ImageFormat::Png,
        Some(imghdr::Type::Jpeg) => ImageFormat::Jpeg,
        Some(imghdr::Type::Gif) => ImageFormat::Gif,
        Some(imghdr::Type::Webp) => ImageFormat::WebP,
        Some(imghdr::Type::Bmp) => ImageFormat::Bmp,
        Some(unsupported) => {
            tracing::debug!(target: "ui", "decode_image(): The {unsupported:?} image format is unsupported");
            return None;
        }
        // imghdr only recognizes JPEGs with a JFIF or Exif header.
        None => match image::guess_format(data) {
            Ok(ImageFormat::Jpeg) => ImageFormat::Jpeg,
            _ => {
                tracing::debug!(target: "ui", "decode_image(): Unknown image format ({} bytes)", data.len());
                return None;
            }
        },
    };
    match image::load_from_memory_with_format(data, format) {
        Ok(img) if img.width() > 0 && img.height() > 0 => Some(img),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(target: "ui", "decode_image(): failed to decode {format:?} image: {e}");
            None
        }
    }
}

/// Scales `img` down so that it fits within `max_width` x `max_height`,
/// preserving its aspect ratio.
///
/// Images that already fit are returned unchanged; this never upscales.
pub fn scale_down(max_width: u32, max_height: u32, img: &DynamicImage) -> DynamicImage {
    let (orig_width, orig_height) = (img.width(), img.height());
    let needs_resize = orig_width > max_width || orig_height > max_height;

    if needs_resize {
        img.thumbnail(max_width.max(1), max_height.max(1))
    } else {
        img.clone()
    }
}
