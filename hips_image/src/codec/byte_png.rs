//! The `bytePng` tile encoding: a single-channel, 8-bit lossless byte-plane
//! image. Cubes are reduced to their first spectral plane on encode — a
//! documented lossy simplification, not a bug.

use crate::format::png;
use crate::tile::Tile;
use anyhow::Result;

/// Linearly maps `samples` into `[0, 255]` using the finite range of
/// `samples` itself, clamping and mapping non-finite values to `0`.
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
	png::encode_grey(&bytes, width as u32, width as u32, None)
}

pub fn decode(bytes: &[u8]) -> Result<Tile> {
	let (pixels, width, height) = png::decode_grey(bytes)?;
	let samples = pixels.into_iter().map(f32::from).collect();
	Tile::new(width as usize, 1, samples)
}
