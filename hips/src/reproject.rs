//! Reprojection kernels: a resampling sampler with nearest/bilinear/
//! bicubic modes, a mean/nearest block downsampler, and the plane-to-tile
//! reprojection step the pyramid builder runs per cell.

use hips_core::{TileKey, Wcs};

/// Resampling mode for [`sample`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SampleMode {
	Nearest,
	Bilinear,
	Bicubic,
}

/// Aggregation mode for [`downsample`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DownsampleMode {
	Mean,
	Nearest,
}

/// Samples `plane` (`w x h`, row-major) at fractional pixel position
/// `(x, y)`, falling back to `blank` where there is nothing finite to
/// sample.
#[must_use]
pub fn sample(plane: &[f32], w: usize, h: usize, x: f64, y: f64, mode: SampleMode, blank: f32) -> f32 {
	match mode {
		SampleMode::Nearest => sample_nearest(plane, w, h, x, y, blank),
		SampleMode::Bilinear => sample_bilinear(plane, w, h, x, y, blank),
		SampleMode::Bicubic => sample_bicubic(plane, w, h, x, y, blank),
	}
}

fn at(plane: &[f32], w: usize, h: usize, ix: i64, iy: i64) -> Option<f32> {
	if ix < 0 || iy < 0 || ix as usize >= w || iy as usize >= h {
		return None;
	}
	let value = plane[iy as usize * w + ix as usize];
	value.is_finite().then_some(value)
}

fn sample_nearest(plane: &[f32], w: usize, h: usize, x: f64, y: f64, blank: f32) -> f32 {
	at(plane, w, h, x.round() as i64, y.round() as i64).unwrap_or(blank)
}

fn sample_bilinear(plane: &[f32], w: usize, h: usize, x: f64, y: f64, blank: f32) -> f32 {
	let x0 = x.floor();
	let y0 = y.floor();
	let tx = x - x0;
	let ty = y - y0;
	let ix0 = x0 as i64;
	let iy0 = y0 as i64;

	let corners = [
		(at(plane, w, h, ix0, iy0), (1.0 - tx) * (1.0 - ty)),
		(at(plane, w, h, ix0 + 1, iy0), tx * (1.0 - ty)),
		(at(plane, w, h, ix0, iy0 + 1), (1.0 - tx) * ty),
		(at(plane, w, h, ix0 + 1, iy0 + 1), tx * ty),
	];

	let mut sum = 0.0;
	let mut weight = 0.0;
	for (value, corner_weight) in corners {
		if let Some(v) = value {
			sum += v as f64 * corner_weight;
			weight += corner_weight;
		}
	}
	if weight <= 0.0 { blank } else { (sum / weight) as f32 }
}

const CATMULL_ROM: [[f64; 4]; 4] = [
	[-0.5, 1.5, -1.5, 0.5],
	[1.0, -2.5, 2.0, -0.5],
	[-0.5, 0.0, 0.5, 0.0],
	[0.0, 1.0, 0.0, 0.0],
];

fn cubic_weight(t: f64, p: [f64; 4]) -> f64 {
	let a: f64 = CATMULL_ROM[0].iter().zip(p).map(|(c, v)| c * v).sum();
	let b: f64 = CATMULL_ROM[1].iter().zip(p).map(|(c, v)| c * v).sum();
	let c: f64 = CATMULL_ROM[2].iter().zip(p).map(|(c, v)| c * v).sum();
	let d: f64 = CATMULL_ROM[3].iter().zip(p).map(|(c, v)| c * v).sum();
	((a * t + b) * t + c) * t + d
}

fn sample_bicubic(plane: &[f32], w: usize, h: usize, x: f64, y: f64, blank: f32) -> f32 {
	let x0 = x.floor();
	let y0 = y.floor();
	let tx = x - x0;
	let ty = y - y0;
	let ix0 = x0 as i64;
	let iy0 = y0 as i64;

	let mut neighbors = [[0.0f64; 4]; 4];
	let mut all_finite = true;
	for (row, dy) in (-1..=2).enumerate() {
		for (col, dx) in (-1..=2).enumerate() {
			match at(plane, w, h, ix0 + dx, iy0 + dy) {
				Some(v) => neighbors[row][col] = v as f64,
				None => all_finite = false,
			}
		}
	}
	if !all_finite {
		return sample_bilinear(plane, w, h, x, y, blank);
	}

	let mut rows = [0.0f64; 4];
	for (row, values) in neighbors.iter().enumerate() {
		rows[row] = cubic_weight(tx, [values[0], values[1], values[2], values[3]]);
	}
	cubic_weight(ty, rows) as f32
}

/// Downsamples `plane` (`w x h`) by 2x2 blocks into a `(w/2) x (h/2)` plane.
#[must_use]
pub fn downsample(plane: &[f32], w: usize, h: usize, mode: DownsampleMode) -> Vec<f32> {
	let out_w = w / 2;
	let out_h = h / 2;
	let mut out = vec![f32::NAN; out_w * out_h];
	for oy in 0..out_h {
		for ox in 0..out_w {
			let block = [
				plane[(2 * oy) * w + 2 * ox],
				plane[(2 * oy) * w + 2 * ox + 1],
				plane[(2 * oy + 1) * w + 2 * ox],
				plane[(2 * oy + 1) * w + 2 * ox + 1],
			];
			out[oy * out_w + ox] = match mode {
				DownsampleMode::Nearest => block[0],
				DownsampleMode::Mean => {
					let finite: Vec<f64> = block.iter().copied().filter(|v| v.is_finite()).map(f64::from).collect();
					if finite.is_empty() {
						f32::NAN
					} else {
						(finite.iter().sum::<f64>() / finite.len() as f64) as f32
					}
				}
			};
		}
	}
	out
}

/// Reprojects one depth plane of a source image onto a `w x w` tile plane
/// for HEALPix cell `key`: for each tile pixel, the tile's synthesized WCS
/// (reversed tile-header synthesis) gives sky coordinates, the source WCS maps those to a
/// source-pixel position, and [`sample`] reads the value there.
#[must_use]
pub fn reproject_plane_to_tile(
	source_plane: &[f32],
	source_w: usize,
	source_h: usize,
	source_wcs: &Wcs,
	key: &TileKey,
	tile_w: usize,
	mode: SampleMode,
) -> anyhow::Result<Vec<f32>> {
	let tile_wcs = Wcs::for_tile(key, tile_w)?;
	let mut out = vec![f32::NAN; tile_w * tile_w];
	for v in 0..tile_w {
		for u in 0..tile_w {
			let (lon, lat) = tile_wcs.pixel_to_world(u as f64 + 1.0, v as f64 + 1.0);
			// Source WCS pixel coordinates are 1-indexed (FITS convention);
			// `sample` expects 0-indexed array positions. A cell that falls
			// outside the source WCS's invertible range (singular CD matrix)
			// simply samples as blank rather than aborting the whole tile.
			let value = match source_wcs.world_to_pixel(lon, lat) {
				Ok((sx, sy)) => sample(source_plane, source_w, source_h, sx - 1.0, sy - 1.0, mode, f32::NAN),
				Err(_) => f32::NAN,
			};
			out[v * tile_w + u] = value;
		}
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ramp(w: usize, h: usize) -> Vec<f32> {
		(0..w * h).map(|i| i as f32).collect()
	}

	#[test]
	fn nearest_rounds_to_closest_pixel() {
		let plane = ramp(4, 4);
		assert_eq!(sample_nearest(&plane, 4, 4, 1.4, 1.4, -1.0), 5.0);
		assert_eq!(sample_nearest(&plane, 4, 4, 100.0, 0.0, -1.0), -1.0);
	}

	#[test]
	fn bilinear_interpolates_between_corners() {
		let plane = vec![0.0, 10.0, 0.0, 10.0];
		let value = sample_bilinear(&plane, 2, 2, 0.5, 0.0, -1.0);
		assert!((value - 5.0).abs() < 1e-6);
	}

	#[test]
	fn bilinear_ignores_non_finite_corners() {
		let plane = vec![f32::NAN, 10.0, f32::NAN, 10.0];
		let value = sample_bilinear(&plane, 2, 2, 0.5, 0.0, -1.0);
		assert!((value - 10.0).abs() < 1e-6);
	}

	#[test]
	fn bilinear_returns_blank_when_nothing_is_finite() {
		let plane = vec![f32::NAN; 4];
		assert_eq!(sample_bilinear(&plane, 2, 2, 0.5, 0.5, -99.0), -99.0);
	}

	#[test]
	fn bicubic_matches_bilinear_on_a_flat_plane() {
		let plane = vec![7.0f32; 36];
		let value = sample(&plane, 6, 6, 2.3, 2.7, SampleMode::Bicubic, -1.0);
		assert!((value - 7.0).abs() < 1e-4);
	}

	#[test]
	fn bicubic_falls_back_to_bilinear_near_the_edge() {
		let plane = ramp(4, 4);
		let bicubic = sample(&plane, 4, 4, 0.5, 0.5, SampleMode::Bicubic, -1.0);
		let bilinear = sample(&plane, 4, 4, 0.5, 0.5, SampleMode::Bilinear, -1.0);
		assert!((bicubic - bilinear).abs() < 1e-6);
	}

	#[test]
	fn downsample_mean_averages_finite_subset() {
		let plane = vec![1.0, 3.0, f32::NAN, 5.0];
		let out = downsample(&plane, 2, 2, DownsampleMode::Mean);
		assert_eq!(out.len(), 1);
		assert!((out[0] - 3.0).abs() < 1e-6);
	}

	#[test]
	fn downsample_mean_is_non_finite_when_block_is_empty() {
		let plane = vec![f32::NAN; 4];
		let out = downsample(&plane, 2, 2, DownsampleMode::Mean);
		assert!(out[0].is_nan());
	}

	#[test]
	fn downsample_nearest_takes_top_left() {
		let plane = vec![1.0, 2.0, 3.0, 4.0];
		let out = downsample(&plane, 2, 2, DownsampleMode::Nearest);
		assert_eq!(out[0], 1.0);
	}
}
