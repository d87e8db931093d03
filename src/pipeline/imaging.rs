//! Image decoding and pixel statistics shared by the document and vision pathways.
//!
//! Every metric works on plain `image` buffers so results are reproducible
//! across platforms:
//! - channel means and grayscale brightness
//! - Laplacian variance (sharpness)
//! - Canny edge density

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};
use tracing::debug;

use super::TriageError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Maximum decoded pixel count, checked from the header before the full decode.
pub const MAX_IMAGE_PIXELS: u64 = 8192 * 8192;

/// Hysteresis thresholds for the Canny detector (gradient magnitude units).
pub const CANNY_LOW_THRESHOLD: f32 = 100.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 200.0;

// ═══════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
/// Returns early error for clearly invalid input — saves decode time.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), TriageError> {
    if bytes.is_empty() {
        return Err(TriageError::InputDecode("Image data is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(TriageError::InputDecode(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Decode raw upload bytes into an image, applying EXIF orientation.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, TriageError> {
    validate_image_bytes(bytes)?;

    let (width, height) = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TriageError::InputDecode(format!("Failed to read image header: {e}")))?
        .into_dimensions()
        .map_err(|e| TriageError::InputDecode(format!("Failed to decode image: {e}")))?;
    check_dimensions(width, height)?;

    let img = image::load_from_memory(bytes)
        .map_err(|e| TriageError::InputDecode(format!("Failed to decode image: {e}")))?;

    let orientation = read_exif_orientation(bytes);
    if orientation != 1 {
        debug!(orientation, "Applying EXIF orientation");
    }
    Ok(apply_orientation(img, orientation))
}

/// Reject images whose declared size would exceed `MAX_IMAGE_PIXELS` once decoded.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), TriageError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_IMAGE_PIXELS {
        return Err(TriageError::InputDecode(format!(
            "Image is {width}x{height}; at most {MAX_IMAGE_PIXELS} pixels are accepted"
        )));
    }
    Ok(())
}

/// Decode raw upload bytes straight to an RGB raster.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, TriageError> {
    Ok(decode_image(bytes)?.to_rgb8())
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Encode an image as PNG bytes (lossless hand-off to the OCR engine).
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, TriageError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| TriageError::InputDecode(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

// ═══════════════════════════════════════════════════════════
// Pixel statistics
// ═══════════════════════════════════════════════════════════

/// Mean intensity of the red, green and blue channels.
pub fn channel_means(rgb: &RgbImage) -> [f32; 3] {
    let count = (rgb.width() as u64) * (rgb.height() as u64);
    if count == 0 {
        return [0.0; 3];
    }

    let mut sums = [0u64; 3];
    for pixel in rgb.pixels() {
        sums[0] += pixel.0[0] as u64;
        sums[1] += pixel.0[1] as u64;
        sums[2] += pixel.0[2] as u64;
    }

    sums.map(|s| (s as f64 / count as f64) as f32)
}

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        let luma = 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }
    gray
}

/// Mean grayscale intensity.
pub fn mean_brightness(gray: &GrayImage) -> f32 {
    let count = (gray.width() as u64) * (gray.height() as u64);
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    (sum as f64 / count as f64) as f32
}

/// Compute Laplacian variance — measures image sharpness.
///
/// Higher variance = sharper image. Blurry photos < 100.
/// Uses a 3x3 Laplacian kernel: `[0,1,0; 1,-4,1; 0,1,0]` over interior pixels.
pub fn compute_laplacian_variance(img: &GrayImage) -> f32 {
    let (w, h) = (img.width(), img.height());
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| img.get_pixel(x, y).0[0] as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let laplacian =
                px(x, y - 1) + px(x, y + 1) + px(x - 1, y) + px(x + 1, y) - 4.0 * px(x, y);
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            count += 1;
        }
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    variance.max(0.0) as f32
}

/// Fraction of pixels marked as edges by the Canny detector.
pub fn compute_edge_density(img: &GrayImage) -> f32 {
    let total = (img.width() as usize) * (img.height() as usize);
    if total == 0 {
        return 0.0;
    }
    let edges = detect_edges(img, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
    edges.iter().filter(|&&e| e).count() as f32 / total as f32
}

/// Canny edge map: Sobel gradients (L1 magnitude), non-maximum suppression,
/// then hysteresis between `low` and `high`.
///
/// Returns one flag per pixel in row-major order. Border pixels are never edges.
pub fn detect_edges(img: &GrayImage, low: f32, high: f32) -> Vec<bool> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut edges = vec![false; w * h];
    if w < 3 || h < 3 {
        return edges;
    }

    let px = |x: usize, y: usize| img.get_pixel(x as u32, y as u32).0[0] as f32;

    // 1. Sobel gradients
    let mut magnitude = vec![0.0f32; w * h];
    let mut direction = vec![0u8; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            let idx = y * w + x;
            magnitude[idx] = gx.abs() + gy.abs();
            direction[idx] = quantize_direction(gx, gy);
        }
    }

    // 2. Non-maximum suppression along the gradient direction
    let mut thin = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = y * w + x;
            let m = magnitude[idx];
            if m <= low {
                continue;
            }
            let (before, after) = match direction[idx] {
                0 => (magnitude[idx - 1], magnitude[idx + 1]),
                1 => (magnitude[idx - w - 1], magnitude[idx + w + 1]),
                2 => (magnitude[idx - w], magnitude[idx + w]),
                _ => (magnitude[idx - w + 1], magnitude[idx + w - 1]),
            };
            // Asymmetric comparison keeps exactly one pixel on flat ridges
            if m >= before && m > after {
                thin[idx] = m;
            }
        }
    }

    // 3. Hysteresis: grow strong edges through connected weak ones
    let mut stack = Vec::new();
    for start in 0..w * h {
        if thin[start] <= high || edges[start] {
            continue;
        }
        edges[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if !edges[n] && thin[n] > low {
                        edges[n] = true;
                        stack.push(n);
                    }
                }
            }
        }
    }

    edges
}

/// Bucket a gradient into 0°, 45°, 90° or 135° (image coordinates, y down).
fn quantize_direction(gx: f32, gy: f32) -> u8 {
    let mut angle = gy.atan2(gx).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }
    if !(22.5..157.5).contains(&angle) {
        0
    } else if angle < 67.5 {
        1
    } else if angle < 112.5 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    fn stripes(width: u32, height: u32, stripe: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            if (x / stripe) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    // ── Decoding ──

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    #[test]
    fn rejects_empty_input() {
        let err = decode_image(&[]).unwrap_err();
        assert!(matches!(err, TriageError::InputDecode(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn decodes_single_pixel_bmp() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 20, 30])));
        let mut bmp = Vec::new();
        img.write_to(&mut bmp, ImageOutputFormat::Bmp).unwrap();
        assert!(bmp.len() < 67);

        let rgb = decode_rgb(&bmp).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (1, 1));
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn pixel_cap_rejects_oversized_dimensions() {
        assert!(check_dimensions(8192, 8192).is_ok());
        let err = check_dimensions(100_000, 100_000).unwrap_err();
        assert!(matches!(err, TriageError::InputDecode(_)));
        assert!(err.to_string().contains("pixels"));
        // No overflow at the u32 extremes
        assert!(check_dimensions(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn header_declaring_huge_canvas_is_rejected_before_decode() {
        let mut bytes = png_bytes(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        // IHDR: length(8..12) type(12..16) width(16..20) height(20..24) ... crc(29..33)
        bytes[16..20].copy_from_slice(&100_000u32.to_be_bytes());
        bytes[20..24].copy_from_slice(&100_000u32.to_be_bytes());
        let crc = crc32(&bytes[12..29]);
        bytes[29..33].copy_from_slice(&crc.to_be_bytes());

        let err = decode_image(&bytes).unwrap_err();
        assert!(matches!(err, TriageError::InputDecode(_)));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF].repeat(25);
        let err = decode_rgb(&garbage).unwrap_err();
        assert!(matches!(err, TriageError::InputDecode(_)));
        assert!(err.to_string().contains("decode"));
    }

    #[test]
    fn decodes_png_round_trip_dimensions() {
        let bytes = png_bytes(RgbImage::from_fn(40, 30, |x, y| Rgb([x as u8 * 5, y as u8 * 5, 30])));
        let rgb = decode_rgb(&bytes).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (40, 30));
        assert_eq!(rgb.get_pixel(3, 2).0, [15, 10, 30]);
    }

    #[test]
    fn exif_no_data_returns_identity() {
        let bytes = png_bytes(RgbImage::from_pixel(32, 32, Rgb([128, 128, 128])));
        assert_eq!(read_exif_orientation(&bytes), 1);
    }

    #[test]
    fn apply_orientation_rotate90_swaps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([100, 100, 100])));
        let result = apply_orientation(img, 6);
        assert_eq!((result.width(), result.height()), (20, 10));
    }

    #[test]
    fn apply_orientation_unknown_is_identity() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([100, 100, 100])));
        let result = apply_orientation(img, 99);
        assert_eq!((result.width(), result.height()), (10, 20));
    }

    // ── Statistics ──

    #[test]
    fn channel_means_of_two_tone_image() {
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([200, 0, 100])
            } else {
                Rgb([100, 50, 0])
            }
        });
        let [r, g, b] = channel_means(&img);
        assert!((r - 150.0).abs() < 1e-3);
        assert!((g - 25.0).abs() < 1e-3);
        assert!((b - 50.0).abs() < 1e-3);
    }

    #[test]
    fn grayscale_uses_bt601_weights() {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        let gray = rgb_to_gray(&img);
        // 0.299 * 255 = 76.2
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert!((mean_brightness(&gray) - 76.0).abs() < 1e-3);
    }

    #[test]
    fn laplacian_sharp_image_high_variance() {
        let img = GrayImage::from_fn(100, 100, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let variance = compute_laplacian_variance(&img);
        assert!(variance > 1000.0, "Checkerboard should have high variance, got {variance}");
    }

    #[test]
    fn laplacian_uniform_image_zero_variance() {
        let img = GrayImage::from_pixel(100, 100, Luma([128]));
        assert!(compute_laplacian_variance(&img) < 1.0);
    }

    #[test]
    fn laplacian_tiny_image_returns_zero() {
        assert_eq!(compute_laplacian_variance(&GrayImage::new(2, 2)), 0.0);
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(50, 50, Luma([90]));
        assert_eq!(compute_edge_density(&img), 0.0);
    }

    #[test]
    fn narrow_stripes_have_high_edge_density() {
        let density = compute_edge_density(&stripes(40, 40, 4));
        assert!(density > 0.05, "Stripes should be edge-dense, got {density}");
    }

    #[test]
    fn single_boundary_is_one_pixel_wide() {
        let img = stripes(100, 100, 50);
        let edges = detect_edges(&img, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
        let count = edges.iter().filter(|&&e| e).count();
        // One column along the boundary, excluding the two border rows
        assert_eq!(count, 98);
        assert!(compute_edge_density(&img) < 0.05);
    }

    #[test]
    fn soft_gradient_stays_below_thresholds() {
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([(x * 2) as u8]));
        assert_eq!(compute_edge_density(&img), 0.0);
    }

    #[test]
    fn tiny_image_has_no_edges() {
        assert_eq!(compute_edge_density(&GrayImage::new(2, 2)), 0.0);
        assert_eq!(compute_edge_density(&GrayImage::new(0, 0)), 0.0);
    }
}
