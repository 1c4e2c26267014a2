//! The canonical in-memory pixel buffer every tile encoding round-trips
//! through: a flat row-major `f32` sample plane (or stack of planes for
//! spectral cubes), where non-finite values mark "no data".

use anyhow::{Result, ensure};

/// A decoded tile: `width x width` pixels, `depth` stacked planes, samples in
/// row-major, plane-major order. A non-finite sample means "no data" at that
/// pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
	pub width: usize,
	pub depth: usize,
	pub samples: Vec<f32>,
}

impl Tile {
	pub fn new(width: usize, depth: usize, samples: Vec<f32>) -> Result<Self> {
		ensure!(
			samples.len() == width * width * depth,
			"pixel buffer length {} does not match width*width*depth = {}",
			samples.len(),
			width * width * depth
		);
		Ok(Self { width, depth, samples })
	}

	#[must_use]
	pub fn plane(&self, index: usize) -> &[f32] {
		let plane_len = self.width * self.width;
		&self.samples[index * plane_len..(index + 1) * plane_len]
	}

	/// The `[lo, hi]` range of finite samples in `plane`, widened by one if
	/// degenerate (`hi == lo`), matching the min/max mapping every byte-plane
	/// encoding uses. Returns `None` if the plane has no finite samples.
	#[must_use]
	pub fn finite_range(plane: &[f32]) -> Option<(f32, f32)> {
		let mut lo = f32::INFINITY;
		let mut hi = f32::NEG_INFINITY;
		for &v in plane {
			if v.is_finite() {
				lo = lo.min(v);
				hi = hi.max(v);
			}
		}
		if !lo.is_finite() || !hi.is_finite() {
			return None;
		}
		if hi == lo {
			hi = lo + 1.0;
		}
		Some((lo, hi))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_length_mismatch() {
		assert!(Tile::new(4, 1, vec![0.0; 15]).is_err());
	}

	#[test]
	fn plane_slices_are_contiguous_and_ordered() {
		let tile = Tile::new(2, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
		assert_eq!(tile.plane(0), &[1.0, 2.0, 3.0, 4.0]);
		assert_eq!(tile.plane(1), &[5.0, 6.0, 7.0, 8.0]);
	}

	#[test]
	fn finite_range_widens_degenerate_and_ignores_non_finite() {
		assert_eq!(Tile::finite_range(&[1.0, f32::NAN, 1.0]), Some((1.0, 2.0)));
		assert_eq!(Tile::finite_range(&[1.0, 3.0, f32::NAN]), Some((1.0, 3.0)));
		assert_eq!(Tile::finite_range(&[f32::NAN, f32::INFINITY]), None);
	}
}
