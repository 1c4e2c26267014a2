//! Reads an arbitrary (not-necessarily-square) source image through the
//! image container codec and its WCS ahead of pyramid
//! building — the builder's step 1.

use anyhow::{Context, Result};
use hips_core::container::{KeywordRecord, KeywordValue, read_float_container, read_header_records};
use hips_core::{Blob, Frame, Wcs};

/// A decoded source plane stack: `width x height` pixels, `depth` planes,
/// samples in row-major, plane-major order (matching [`hips_image::Tile`]'s
/// convention, generalized to a non-square extent).
#[derive(Clone, Debug)]
pub struct SourceImage {
	pub width: usize,
	pub height: usize,
	pub depth: usize,
	pub samples: Vec<f32>,
}

impl SourceImage {
	#[must_use]
	pub fn plane(&self, index: usize) -> &[f32] {
		let plane_len = self.width * self.height;
		&self.samples[index * plane_len..(index + 1) * plane_len]
	}
}

/// Reads the source image's pixel planes, WCS and inferred frame from its
/// raw container bytes.
pub fn read_source(bytes: &[u8]) -> Result<(SourceImage, Wcs, Frame)> {
	let records = read_header_records(bytes)?;
	let width = required_int(&records, "NAXIS1")? as usize;
	let height = required_int(&records, "NAXIS2")? as usize;
	let depth = optional_int(&records, "NAXIS3").unwrap_or(1) as usize;

	let (wcs, frame) = Wcs::from_keywords(&records)?;

	let blob = Blob::from(bytes.to_vec());
	let (_records, samples) = read_float_container(&blob, width * height * depth)?;

	Ok((
		SourceImage {
			width,
			height,
			depth,
			samples,
		},
		wcs,
		frame,
	))
}

fn required_int(records: &[KeywordRecord], keyword: &str) -> Result<i64> {
	optional_int(records, keyword).with_context(|| format!("missing required keyword {keyword}"))
}

fn optional_int(records: &[KeywordRecord], keyword: &str) -> Option<i64> {
	records.iter().find(|r| r.keyword == keyword).and_then(|r| match r.value {
		KeywordValue::Int(v) => Some(v),
		_ => None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use hips_core::container::write_float_container;

	fn sample_records(width: i64, height: i64) -> Vec<KeywordRecord> {
		vec![
			KeywordRecord::new("SIMPLE", KeywordValue::Bool(true)).unwrap(),
			KeywordRecord::new("BITPIX", KeywordValue::Int(-32)).unwrap(),
			KeywordRecord::new("NAXIS", KeywordValue::Int(2)).unwrap(),
			KeywordRecord::new("NAXIS1", KeywordValue::Int(width)).unwrap(),
			KeywordRecord::new("NAXIS2", KeywordValue::Int(height)).unwrap(),
			KeywordRecord::new("CTYPE1", KeywordValue::Str("RA---CAR".into())).unwrap(),
			KeywordRecord::new("CTYPE2", KeywordValue::Str("DEC--CAR".into())).unwrap(),
			KeywordRecord::new("CRPIX1", KeywordValue::Float(16.5)).unwrap(),
			KeywordRecord::new("CRPIX2", KeywordValue::Float(8.5)).unwrap(),
			KeywordRecord::new("CRVAL1", KeywordValue::Float(0.0)).unwrap(),
			KeywordRecord::new("CRVAL2", KeywordValue::Float(0.0)).unwrap(),
			KeywordRecord::new("CDELT1", KeywordValue::Float(-0.5)).unwrap(),
			KeywordRecord::new("CDELT2", KeywordValue::Float(0.5)).unwrap(),
		]
	}

	#[test]
	fn reads_a_non_square_source_image() {
		let records = sample_records(32, 16);
		let samples = vec![1.0f32; 32 * 16];
		let blob = write_float_container(&records, &samples).unwrap();

		let (image, _wcs, frame) = read_source(blob.as_slice()).unwrap();
		assert_eq!(image.width, 32);
		assert_eq!(image.height, 16);
		assert_eq!(image.depth, 1);
		assert_eq!(frame, Frame::Equatorial);
	}

	#[test]
	fn missing_naxis_is_an_error() {
		let records = vec![KeywordRecord::new("SIMPLE", KeywordValue::Bool(true)).unwrap()];
		let blob = write_float_container(&records, &[]).unwrap();
		assert!(read_source(blob.as_slice()).is_err());
	}
}
