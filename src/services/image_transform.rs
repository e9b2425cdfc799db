// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt image compression.
//!
//! Decodes any supported image, shrinks it to fit inside a 1200×1600 box
//! (never enlarging) and re-encodes it as JPEG.

use crate::error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Bounding box for stored receipts.
pub const MAX_WIDTH: u32 = 1200;
pub const MAX_HEIGHT: u32 = 1600;
pub const JPEG_QUALITY: u8 = 85;
pub const OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// A compressed receipt image.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Dimensions that fit `(width, height)` inside the receipt bounding box.
///
/// Images already inside the box are returned unchanged. Otherwise the
/// binding side lands exactly on its bound and the other side is rounded.
pub fn fit_within_bounds(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_WIDTH && height <= MAX_HEIGHT {
        return (width, height);
    }

    let (w, h) = (width as u64, height as u64);
    let (max_w, max_h) = (MAX_WIDTH as u64, MAX_HEIGHT as u64);

    // Compare w/h against max_w/max_h without floating point.
    if w * max_h >= h * max_w {
        let scaled = (h * max_w + w / 2) / w;
        (MAX_WIDTH, scaled.max(1) as u32)
    } else {
        let scaled = (w * max_h + h / 2) / h;
        (scaled.max(1) as u32, MAX_HEIGHT)
    }
}

/// Pick a resampling filter based on how far the image shrinks.
fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Compress raw upload bytes into a bounded JPEG.
pub fn compress_receipt(input: &[u8]) -> Result<CompressedImage, AppError> {
    if input.is_empty() {
        return Err(AppError::UnsupportedFormat("empty upload".to_string()));
    }

    let img = image::load_from_memory(input)
        .map_err(|e| AppError::UnsupportedFormat(e.to_string()))?;

    let (orig_width, orig_height) = img.dimensions();
    let (width, height) = fit_within_bounds(orig_width, orig_height);

    let resized = if (width, height) == (orig_width, orig_height) {
        img
    } else {
        let filter = select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AppError::UnsupportedFormat(format!("JPEG encoding failed: {}", e)))?;

    tracing::debug!(
        orig_width,
        orig_height,
        width,
        height,
        input_bytes = input.len(),
        output_bytes = bytes.len(),
        "Receipt image compressed"
    );

    Ok(CompressedImage {
        bytes,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 120, 40, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_fit_keeps_small_images() {
        assert_eq!(fit_within_bounds(800, 600), (800, 600));
        assert_eq!(fit_within_bounds(1200, 1600), (1200, 1600));
        assert_eq!(fit_within_bounds(1, 1), (1, 1));
    }

    #[test]
    fn test_fit_width_bound() {
        assert_eq!(fit_within_bounds(3000, 1500), (1200, 600));
        assert_eq!(fit_within_bounds(2400, 1600), (1200, 800));
        assert_eq!(fit_within_bounds(1300, 1700), (1200, 1569));
    }

    #[test]
    fn test_fit_height_bound() {
        assert_eq!(fit_within_bounds(1000, 4000), (400, 1600));
    }

    #[test]
    fn test_fit_extreme_aspect_never_zero() {
        assert_eq!(fit_within_bounds(100_000, 10), (1200, 1));
        assert_eq!(fit_within_bounds(10, 100_000), (1, 1600));
    }

    #[test]
    fn test_compress_small_png_keeps_dimensions() {
        let out = compress_receipt(&png(300, 200)).unwrap();
        assert_eq!((out.width, out.height), (300, 200));

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (300, 200));
        assert_eq!(
            image::guess_format(&out.bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_compress_large_png_is_bounded() {
        let out = compress_receipt(&png(2400, 1000)).unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1200, 500));
    }

    #[test]
    fn test_compress_rejects_garbage() {
        let err = compress_receipt(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_compress_rejects_empty() {
        let err = compress_receipt(&[]).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }
}
