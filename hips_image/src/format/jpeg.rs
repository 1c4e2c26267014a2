//! 3-channel 8-bit JPEG encode/decode for the `byteJpeg` tile encoding.
//! `byteJpeg` stores `R=G=B=sample, A=255`; since JPEG itself has no alpha
//! channel, only the RGB triplet is ever actually encoded.

use anyhow::{Result, anyhow, bail, ensure};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, ImageFormat, load_from_memory_with_format};

/// Encodes a single-channel `width x height` byte plane as an RGB JPEG with
/// `R=G=B=pixel`. `quality` is `0..100` and defaults to `95`; JPEG cannot
/// encode losslessly so `quality >= 100` is rejected.
pub fn encode_grey_as_rgb(pixels: &[u8], width: u32, height: u32, quality: Option<u8>) -> Result<Vec<u8>> {
	ensure!(
		pixels.len() == (width as usize) * (height as usize),
		"pixel buffer length {} does not match {width}x{height}",
		pixels.len()
	);
	let quality = quality.unwrap_or(95);
	if quality >= 100 {
		bail!("JPEG does not support lossless compression, use a quality < 100");
	}

	let rgb: Vec<u8> = pixels.iter().flat_map(|&v| [v, v, v]).collect();
	let mut buffer = Vec::new();
	JpegEncoder::new_with_quality(&mut buffer, quality).write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)?;
	Ok(buffer)
}

/// Decodes a JPEG into luminance bytes via `0.299R + 0.587G + 0.114B`.
pub fn decode_to_luminance(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
	let image = load_from_memory_with_format(bytes, ImageFormat::Jpeg).map_err(|e| anyhow!("failed to decode JPEG: {e}"))?;
	let rgb = image.into_rgb8();
	let (width, height) = (rgb.width(), rgb.height());
	let luma = rgb
		.pixels()
		.map(|p| (0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2])).round() as u8)
		.collect();
	Ok((luma, width, height))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_close_to_original_for_a_flat_plane() {
		let (w, h) = (16u32, 8u32);
		let pixels = vec![128u8; (w * h) as usize];
		let encoded = encode_grey_as_rgb(&pixels, w, h, Some(90)).unwrap();
		let (decoded, dw, dh) = decode_to_luminance(&encoded).unwrap();
		assert_eq!((dw, dh), (w, h));
		for &v in &decoded {
			assert!((i32::from(v) - 128).abs() <= 2);
		}
	}

	#[test]
	fn rejects_quality_at_or_above_100() {
		assert!(encode_grey_as_rgb(&[0u8; 4], 2, 2, Some(100)).is_err());
	}
}
