//! The `byteJpeg` tile encoding: a 4-channel lossy-compressed image where
//! `R=G=B=scaled sample, A=255`; JPEG itself carries no alpha channel, so
//! only the RGB triplet is ever actually compressed.

use crate::format::jpeg;
use crate::tile::Tile;
use anyhow::Result;

fn scale_to_bytes(samples: &[f32]) -> Vec<u8> {
	let Some((lo, hi)) = Tile::finite_range(samples) else {
		return vec![0u8; samples.len()];
	};
	let scale = 255.0 / (hi - lo);
	samples
		.iter()
		.map(|&v| {
			if v.is_finite() {
				(((v - lo) * scale).clamp(0.0, 255.0)).round() as u8
			} else {
				0u8
			}
		})
		.collect()
}

pub fn encode(pixels: &[f32], width: usize, _depth: usize) -> Result<Vec<u8>> {
	let plane = &pixels[..width * width];
	let bytes = scale_to_bytes(plane);
	jpeg::encode_grey_as_rgb(&bytes, width as u32, width as u32, None)
}

/// Decodes to luminance via `0.299*R + 0.587*G + 0.114*B`, matching what a
/// decoder sees regardless of whether it was encoded by this module (R=G=B)
/// or by some other RGB JPEG producer.
pub fn decode(bytes: &[u8]) -> Result<Tile> {
	let (luma, width, height) = jpeg::decode_to_luminance(bytes)?;
	let samples = luma.into_iter().map(f32::from).collect();
	Tile::new(width as usize, 1, samples)
}
