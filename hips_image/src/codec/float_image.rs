//! The `floatImage` tile encoding: a 32-bit float image container carrying
//! the tile's synthesized WCS keyword records (hips_core's 4.B engine).

use crate::tile::Tile;
use anyhow::{Result, bail};
use hips_core::container::{KeywordRecord, KeywordValue, read_float_container, read_header_records, write_float_container};
use hips_core::{Frame, TileKey, Wcs, healpix};

fn axis_tokens(frame: Frame) -> (&'static str, &'static str) {
	match frame {
		Frame::Equatorial => ("RA---TAN", "DEC--TAN"),
		Frame::Galactic => ("GLON-TAN", "GLAT-TAN"),
		Frame::Ecliptic => ("ELON-TAN", "ELAT-TAN"),
	}
}

pub fn encode(key: &TileKey, pixels: &[f32], width: usize, depth: usize) -> Result<Vec<u8>> {
	let wcs = Wcs::for_tile(key, width)?;
	let (ctype1, ctype2) = axis_tokens(key.frame);

	let mut records = vec![
		KeywordRecord::new("SIMPLE", KeywordValue::Bool(true))?,
		KeywordRecord::new("BITPIX", KeywordValue::Int(-32))?,
		KeywordRecord::new("NAXIS", KeywordValue::Int(if depth > 1 { 3 } else { 2 }))?,
		KeywordRecord::new("NAXIS1", KeywordValue::Int(width as i64))?,
		KeywordRecord::new("NAXIS2", KeywordValue::Int(width as i64))?,
	];
	if depth > 1 {
		records.push(KeywordRecord::new("NAXIS3", KeywordValue::Int(depth as i64))?);
	}
	records.extend([
		KeywordRecord::new("CTYPE1", KeywordValue::Str(ctype1.to_string()))?,
		KeywordRecord::new("CTYPE2", KeywordValue::Str(ctype2.to_string()))?,
		KeywordRecord::new("CRPIX1", KeywordValue::Float(wcs.crpix1))?,
		KeywordRecord::new("CRPIX2", KeywordValue::Float(wcs.crpix2))?,
		KeywordRecord::new("CRVAL1", KeywordValue::Float(wcs.crval1))?,
		KeywordRecord::new("CRVAL2", KeywordValue::Float(wcs.crval2))?,
		KeywordRecord::new("CD1_1", KeywordValue::Float(wcs.cd[0][0]))?,
		KeywordRecord::new("CD1_2", KeywordValue::Float(wcs.cd[0][1]))?,
		KeywordRecord::new("CD2_1", KeywordValue::Float(wcs.cd[1][0]))?,
		KeywordRecord::new("CD2_2", KeywordValue::Float(wcs.cd[1][1]))?,
		KeywordRecord::new("COORDSYS", KeywordValue::Str(key.frame.as_fits_letter().to_string()))?,
		KeywordRecord::new("ORDER", KeywordValue::Int(i64::from(key.order)))?,
		KeywordRecord::new("NPIX", KeywordValue::Int(key.ipix as i64))?,
		KeywordRecord::new("NSIDE", KeywordValue::Int(healpix::nside(key.order) as i64))?,
		KeywordRecord::new("ORDERING", KeywordValue::Str("NESTED".to_string()))?,
	]);
	if let (Some(sorder), Some(sindex)) = (key.spectral_order, key.spectral_index) {
		records.push(KeywordRecord::new("FORDER", KeywordValue::Int(i64::from(sorder)))?);
		records.push(KeywordRecord::new("FPIX", KeywordValue::Int(sindex as i64))?);
	}

	let blob = write_float_container(&records, pixels)?;
	Ok(blob.into_vec())
}

pub fn decode(bytes: &[u8]) -> Result<Tile> {
	let records = read_header_records(bytes)?;
	let width = get_int(&records, "NAXIS1")? as usize;
	let height = get_int(&records, "NAXIS2")? as usize;
	if width != height {
		bail!("floatImage tiles must be square, got {width}x{height}");
	}
	let depth = match get_int(&records, "NAXIS3") {
		Ok(d) => d as usize,
		Err(_) => 1,
	};

	let blob = hips_core::Blob::from(bytes.to_vec());
	let (_records, samples) = read_float_container(&blob, width * width * depth)?;
	Tile::new(width, depth, samples)
}

fn get_int(records: &[KeywordRecord], keyword: &str) -> Result<i64> {
	for record in records {
		if record.keyword == keyword {
			if let KeywordValue::Int(value) = record.value {
				return Ok(value);
			}
			bail!("{keyword} is present but is not an integer value");
		}
	}
	bail!("missing required keyword {keyword}")
}

#[cfg(test)]
mod tests {
	use super::*;
	use hips_core::TileEncoding;

	#[test]
	fn round_trips_a_2d_plane() {
		let key = TileKey::new(3, 42, Frame::Galactic, TileEncoding::FloatImage).unwrap();
		let pixels = vec![1.0f32, 2.0, 3.0, 4.0];
		let encoded = encode(&key, &pixels, 2, 1).unwrap();
		let tile = decode(&encoded).unwrap();
		assert_eq!(tile.width, 2);
		assert_eq!(tile.depth, 1);
		assert_eq!(tile.samples, pixels);
	}

	#[test]
	fn round_trips_a_spectral_cube() {
		let key = TileKey::new(1, 3, Frame::Equatorial, TileEncoding::FloatImage).unwrap();
		let pixels: Vec<f32> = (0..8).map(|i| i as f32).collect();
		let encoded = encode(&key, &pixels, 2, 2).unwrap();
		let tile = decode(&encoded).unwrap();
		assert_eq!(tile.depth, 2);
		assert_eq!(tile.samples, pixels);
	}

	#[test]
	fn preserves_non_finite_no_data_samples() {
		let key = TileKey::new(0, 0, Frame::Ecliptic, TileEncoding::FloatImage).unwrap();
		let pixels = vec![f32::NAN, 1.0, 2.0, 3.0];
		let encoded = encode(&key, &pixels, 2, 1).unwrap();
		let tile = decode(&encoded).unwrap();
		assert!(tile.samples[0].is_nan());
	}
}
