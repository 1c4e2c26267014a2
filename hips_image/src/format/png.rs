//! Single-channel 8-bit PNG encode/decode for the `bytePng` tile encoding.

use anyhow::{Result, anyhow, ensure};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat, load_from_memory_with_format};

/// Encodes a single-channel `width x height` byte plane as a lossless,
/// grayscale PNG. `speed` follows the usual compression-effort convention:
/// `0..=100`, lower is smaller/slower, higher is faster/larger; defaults to
/// `10`.
pub fn encode_grey(pixels: &[u8], width: u32, height: u32, speed: Option<u8>) -> Result<Vec<u8>> {
	ensure!(
		pixels.len() == (width as usize) * (height as usize),
		"pixel buffer length {} does not match {width}x{height}",
		pixels.len()
	);

	let speed = speed.unwrap_or(10).clamp(0, 100);
	let (compression_type, filter_type) = match speed {
		0..20 => (CompressionType::Best, FilterType::Adaptive),
		20..40 => (CompressionType::Default, FilterType::Adaptive),
		40..60 => (CompressionType::Default, FilterType::Paeth),
		60..80 => (CompressionType::Default, FilterType::Avg),
		80..90 => (CompressionType::Fast, FilterType::Avg),
		_ => (CompressionType::Fast, FilterType::NoFilter),
	};

	let mut buffer = Vec::new();
	PngEncoder::new_with_quality(&mut buffer, compression_type, filter_type).write_image(
		pixels,
		width,
		height,
		image::ExtendedColorType::L8,
	)?;
	Ok(buffer)
}

/// Decodes a grayscale PNG back into a `(pixels, width, height)` byte plane.
pub fn decode_grey(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
	let image = load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| anyhow!("failed to decode PNG: {e}"))?;
	let grey = image.into_luma8();
	let (width, height) = (grey.width(), grey.height());
	Ok((grey.into_raw(), width, height))
}
