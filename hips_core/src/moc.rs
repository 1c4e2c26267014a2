//! The coverage map (`Moc.fits`): the set of HEALPix cells at the pyramid's
//! max order that received at least one finite sample during build, written
//! out as the `CoverageMap` once a build completes.
//!
//! The broader HiPS ecosystem's MOC format is a compressed multi-order
//! interval encoding; reproducing that wire format is out of scope here (no
//! MOC/XML-signature verification utilities), so
//! `Moc.fits` here is the flat, single-order NESTED pixel index list that a
//! `CoverageMap` already is — stored through the same container codec as
//! every other artifact, with an `ORDER` keyword recording which order the
//! indices are relative to.

use anyhow::{Context, Result, ensure};
use byteorder::{BigEndian, ByteOrder};

use crate::container::{KeywordRecord, KeywordValue, int_record, read_container, write_container};
use crate::types::Blob;

/// The set of max-order HEALPix cells a pyramid build populated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageMap {
	pub order: u8,
	ipix: Vec<u64>,
}

impl CoverageMap {
	#[must_use]
	pub fn new(order: u8) -> Self {
		Self { order, ipix: Vec::new() }
	}

	pub fn insert(&mut self, ipix: u64) {
		if let Err(pos) = self.ipix.binary_search(&ipix) {
			self.ipix.insert(pos, ipix);
		}
	}

	#[must_use]
	pub fn contains(&self, ipix: u64) -> bool {
		self.ipix.binary_search(&ipix).is_ok()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.ipix.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.ipix.is_empty()
	}

	#[must_use]
	pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
		self.ipix.iter().copied()
	}

	/// Fraction of the sphere this map covers at its order (`len / npix`).
	#[must_use]
	pub fn sky_fraction(&self) -> f64 {
		self.len() as f64 / crate::healpix::npix(self.order) as f64
	}

	/// Encodes this coverage map as `Moc.fits`: a `BITPIX=64` one-dimensional
	/// payload of big-endian NESTED pixel indices, an `ORDER` keyword, and
	/// `NPIX` recording the element count.
	#[must_use]
	pub fn to_blob(&self) -> Blob {
		let records = vec![
			KeywordRecord::new("SIMPLE", KeywordValue::Bool(true)).unwrap(),
			int_record("BITPIX", 64).unwrap(),
			int_record("NAXIS", 1).unwrap(),
			int_record("NAXIS1", self.ipix.len() as i64).unwrap(),
			int_record("ORDER", i64::from(self.order)).unwrap(),
			int_record("NPIX", self.ipix.len() as i64).unwrap(),
		];
		let mut payload = vec![0u8; self.ipix.len() * 8];
		for (i, &ipix) in self.ipix.iter().enumerate() {
			BigEndian::write_u64(&mut payload[i * 8..i * 8 + 8], ipix);
		}
		write_container(&records, &payload)
	}

	/// Decodes a `Moc.fits` blob back into a `CoverageMap`.
	pub fn from_blob(blob: &Blob) -> Result<Self> {
		let (records, payload) = read_container(blob.as_slice())?;
		let order = records
			.iter()
			.find(|r| r.keyword == "ORDER")
			.context("Moc.fits missing ORDER keyword")?;
		let KeywordValue::Int(order) = order.value else {
			anyhow::bail!("ORDER keyword must be an integer");
		};
		ensure!(payload.len() % 8 == 0, "Moc.fits payload length must be a multiple of 8");
		let ipix = payload.chunks_exact(8).map(BigEndian::read_u64).collect();
		Ok(Self { order: order as u8, ipix })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_keeps_sorted_unique_order() {
		let mut map = CoverageMap::new(3);
		map.insert(5);
		map.insert(1);
		map.insert(5);
		map.insert(3);
		assert_eq!(map.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
		assert_eq!(map.len(), 3);
	}

	#[test]
	fn round_trips_through_blob() {
		let mut map = CoverageMap::new(3);
		for ipix in [0u64, 10, 767] {
			map.insert(ipix);
		}
		let blob = map.to_blob();
		let decoded = CoverageMap::from_blob(&blob).unwrap();
		assert_eq!(decoded, map);
	}

	#[test]
	fn sky_fraction_of_full_order_zero_map_is_one() {
		let mut map = CoverageMap::new(0);
		for ipix in 0..12 {
			map.insert(ipix);
		}
		assert_eq!(map.sky_fraction(), 1.0);
	}

	#[test]
	fn empty_map_round_trips() {
		let map = CoverageMap::new(5);
		let blob = map.to_blob();
		let decoded = CoverageMap::from_blob(&blob).unwrap();
		assert!(decoded.is_empty());
		assert_eq!(decoded.order, 5);
	}
}
