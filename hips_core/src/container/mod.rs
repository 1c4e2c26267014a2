//! The image container codec: a FITS-like header of 80-byte keyword records
//! padded to a 2880-byte block, followed by a big-endian binary payload also
//! padded to a 2880-byte block boundary. Used for float-image tiles, the
//! Allsky mosaic, and the full-sphere binary-table map export.

mod block;
mod record;

pub use block::{BLOCK_LEN, RECORDS_PER_BLOCK, padded_len};
pub use record::{KeywordRecord, KeywordValue, RECORD_LEN};

use crate::error::{HipsError, HipsErrorKind};
use crate::io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob};
use crate::types::Blob;
use anyhow::{Context, Result, ensure};
use byteorder::BigEndian;

/// A parsed container: its header keyword records (in file order, `END`
/// excluded) and its raw payload bytes (unpadded, trimmed to `NAXIS1*NAXIS2*4`
/// or whatever the caller's `BITPIX`/`NAXIS*` keywords describe).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Container {
	pub records: Vec<KeywordRecord>,
}

impl Container {
	#[must_use]
	pub fn new(records: Vec<KeywordRecord>) -> Self {
		Self { records }
	}

	#[must_use]
	pub fn get(&self, keyword: &str) -> Option<&KeywordRecord> {
		self.records.iter().find(|r| r.keyword == keyword)
	}
}

/// Encodes a header + big-endian `f32` payload into a single container blob.
pub fn write_float_container(records: &[KeywordRecord], samples: &[f32]) -> Result<Blob> {
	let mut header = Vec::new();
	for record in records {
		header.extend_from_slice(&record.encode());
	}
	header.extend_from_slice(&KeywordRecord::end().encode());
	block::pad_header_to_block_boundary(&mut header);

	let mut writer = ValueWriterBlob::<BigEndian>::new();
	for &sample in samples {
		writer.write_f32(sample)?;
	}
	let mut data = writer.into_blob().into_vec();
	block::pad_to_block_boundary(&mut data);

	header.extend_from_slice(&data);
	Ok(Blob::from(header))
}

/// Decodes a container blob into its header records and `f32` payload. The
/// caller supplies the expected sample count (derived from `NAXIS1 * NAXIS2`,
/// which this module does not itself interpret — see the WCS/tile codec
/// layers for that).
pub fn read_float_container(blob: &Blob, sample_count: usize) -> Result<(Vec<KeywordRecord>, Vec<f32>)> {
	let bytes = blob.as_slice();
	let records = read_header_records(bytes)?;
	let header_len = padded_len(header_byte_len(&records));

	let payload_len = sample_count * 4;
	ensure!(
		bytes.len() >= header_len + payload_len,
		"container too short: need {} bytes, have {}",
		header_len + payload_len,
		bytes.len()
	);

	let mut reader = ValueReaderSlice::<BigEndian>::new(&bytes[header_len..header_len + payload_len]);
	let mut samples = Vec::with_capacity(sample_count);
	for _ in 0..sample_count {
		samples.push(reader.read_f32()?);
	}
	Ok((records, samples))
}

/// Reads only the keyword records from a container's header blocks, without
/// decoding any payload — used by the lint walker and the pyramid reader's
/// tile-header synthesis path, which both need header metadata but not
/// pixel data.
pub fn read_header_records(bytes: &[u8]) -> Result<Vec<KeywordRecord>> {
	let mut records = Vec::new();
	let mut offset = 0;
	loop {
		ensure!(
			offset + RECORD_LEN <= bytes.len(),
			"container ended before an END keyword record"
		);
		let mut line = [0u8; RECORD_LEN];
		line.copy_from_slice(&bytes[offset..offset + RECORD_LEN]);
		offset += RECORD_LEN;

		let record = KeywordRecord::decode(&line).map_err(|e| {
			anyhow::Error::new(HipsError::new(HipsErrorKind::Parse, e.to_string()))
		})?;
		if record.keyword == "END" {
			return Ok(records);
		}
		records.push(record);
	}
}

fn header_byte_len(records: &[KeywordRecord]) -> usize {
	(records.len() + 1) * RECORD_LEN
}

/// Convenience for building a required `NAXIS`-style int keyword, failing
/// with [`HipsErrorKind::Encode`] rather than panicking if the keyword name
/// is malformed.
pub fn int_record(keyword: &str, value: i64) -> Result<KeywordRecord> {
	KeywordRecord::new(keyword, KeywordValue::Int(value))
		.with_context(|| format!("failed to encode {keyword} header keyword"))
}

/// Encodes a header + arbitrary already-encoded payload into a single
/// container blob, used for units whose payload is not a flat `f32` array —
/// the binary-table map export and the `Moc.fits` coverage map.
pub fn write_container(records: &[KeywordRecord], payload: &[u8]) -> Blob {
	let mut header = Vec::new();
	for record in records {
		header.extend_from_slice(&record.encode());
	}
	header.extend_from_slice(&KeywordRecord::end().encode());
	block::pad_header_to_block_boundary(&mut header);

	let mut data = payload.to_vec();
	block::pad_to_block_boundary(&mut data);

	header.extend_from_slice(&data);
	Blob::from(header)
}

/// Decodes a container blob into its header records and raw payload bytes,
/// deriving the payload length from `BITPIX`/`NAXIS*`/`PCOUNT`/`GCOUNT` per
/// the standard FITS-style size formula rather than requiring the caller to
/// supply an element count.
pub fn read_container(bytes: &[u8]) -> Result<(Vec<KeywordRecord>, Vec<u8>)> {
	let records = read_header_records(bytes)?;
	let header_len = padded_len(header_byte_len(&records));
	let payload_len = payload_byte_len(&records)?;
	ensure!(
		bytes.len() >= header_len + payload_len,
		"container too short: need {} bytes, have {}",
		header_len + payload_len,
		bytes.len()
	);
	Ok((records, bytes[header_len..header_len + payload_len].to_vec()))
}

/// `bytes_per_element * GCOUNT * (PCOUNT + NAXIS1*NAXIS2*...*NAXISn)`, the
/// standard FITS-style payload size formula. `PCOUNT`/`GCOUNT` default to
/// `0`/`1` when absent, matching the primary-HDU convention.
fn payload_byte_len(records: &[KeywordRecord]) -> Result<usize> {
	let bitpix = required_int(records, "BITPIX")?;
	let naxis = required_int(records, "NAXIS")? as usize;

	let mut n_elements: u64 = 1;
	for i in 1..=naxis {
		n_elements *= required_int(records, &format!("NAXIS{i}"))? as u64;
	}
	let pcount = optional_int(records, "PCOUNT").unwrap_or(0) as u64;
	let gcount = optional_int(records, "GCOUNT").unwrap_or(1) as u64;
	let bytes_per_element = (bitpix.unsigned_abs() / 8) as u64;

	Ok((bytes_per_element * gcount * (pcount + n_elements)) as usize)
}

fn required_int(records: &[KeywordRecord], keyword: &str) -> Result<i64> {
	optional_int(records, keyword).with_context(|| format!("missing or non-integer required keyword {keyword}"))
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
	use pretty_assertions::assert_eq;

	fn sample_records() -> Vec<KeywordRecord> {
		vec![
			KeywordRecord::new("SIMPLE", KeywordValue::Bool(true)).unwrap(),
			KeywordRecord::new("BITPIX", KeywordValue::Int(-32)).unwrap(),
			KeywordRecord::new("NAXIS", KeywordValue::Int(2)).unwrap(),
			int_record("NAXIS1", 2).unwrap(),
			int_record("NAXIS2", 2).unwrap(),
		]
	}

	#[test]
	fn round_trips_float_payload() {
		let samples = vec![1.0f32, 2.5, -3.0, f32::NAN];
		let blob = write_float_container(&sample_records(), &samples).unwrap();
		assert_eq!(blob.len() as usize % BLOCK_LEN, 0);

		let (records, decoded) = read_float_container(&blob, samples.len()).unwrap();
		assert_eq!(records.len(), sample_records().len());
		assert_eq!(decoded[0], 1.0);
		assert_eq!(decoded[1], 2.5);
		assert_eq!(decoded[2], -3.0);
		assert!(decoded[3].is_nan());
	}

	#[test]
	fn header_records_readable_without_payload_decode() {
		let blob = write_float_container(&sample_records(), &[0.0, 0.0]).unwrap();
		let records = read_header_records(blob.as_slice()).unwrap();
		assert_eq!(records, sample_records());
	}

	#[test]
	fn rejects_truncated_payload() {
		let blob = write_float_container(&sample_records(), &[1.0, 2.0]).unwrap();
		assert!(read_float_container(&blob, 100).is_err());
	}

	#[test]
	fn rejects_header_with_no_end_record() {
		let mut bytes = vec![b' '; BLOCK_LEN];
		bytes[0..6].copy_from_slice(b"SIMPLE");
		assert!(read_header_records(&bytes[..RECORD_LEN]).is_err());
	}

	#[test]
	fn generic_container_round_trips_arbitrary_payload() {
		let records = vec![
			KeywordRecord::new("XTENSION", KeywordValue::Str("BINTABLE".into())).unwrap(),
			int_record("BITPIX", 8).unwrap(),
			int_record("NAXIS", 2).unwrap(),
			int_record("NAXIS1", 4).unwrap(),
			int_record("NAXIS2", 3).unwrap(),
			int_record("PCOUNT", 0).unwrap(),
			int_record("GCOUNT", 1).unwrap(),
		];
		let payload: Vec<u8> = (0..12).collect();
		let blob = write_container(&records, &payload);
		assert_eq!(blob.len() as usize % BLOCK_LEN, 0);

		let (decoded_records, decoded_payload) = read_container(blob.as_slice()).unwrap();
		assert_eq!(decoded_records.len(), records.len());
		assert_eq!(decoded_payload, payload);
	}

	#[test]
	fn generic_container_computes_payload_len_from_bitpix() {
		let records = vec![
			int_record("BITPIX", -32).unwrap(),
			int_record("NAXIS", 1).unwrap(),
			int_record("NAXIS1", 4).unwrap(),
		];
		let payload = vec![0u8; 16];
		let blob = write_container(&records, &payload);
		let (_records, decoded_payload) = read_container(blob.as_slice()).unwrap();
		assert_eq!(decoded_payload.len(), 16);
	}
}
