//! [`TileKey`] identifies a single HEALPix tile inside a pyramid: its order,
//! its NESTED pixel index within that order, the reference frame and
//! encoding of the pyramid it belongs to, and (for cube pyramids) the
//! spectral plane it addresses.

use anyhow::{Result, ensure};
use std::fmt;

use super::{Frame, TileEncoding};

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct TileKey {
	pub order: u8,
	pub ipix: u64,
	pub frame: Frame,
	pub encoding: TileEncoding,
	pub spectral_order: Option<u8>,
	pub spectral_index: Option<u64>,
}

#[allow(dead_code)]
impl TileKey {
	pub fn new(order: u8, ipix: u64, frame: Frame, encoding: TileEncoding) -> Result<TileKey> {
		ensure!(order <= 29, "order ({order}) must be <= 29");
		ensure!(
			ipix < 12u64 * 4u64.pow(u32::from(order)),
			"ipix ({ipix}) out of range for order {order}"
		);
		Ok(TileKey {
			order,
			ipix,
			frame,
			encoding,
			spectral_order: None,
			spectral_index: None,
		})
	}

	#[must_use]
	pub fn with_spectral_plane(mut self, order: u8, index: u64) -> Self {
		self.spectral_order = Some(order);
		self.spectral_index = Some(index);
		self
	}

	/// Number of HEALPix cells at this key's order (`12 * 4^order`).
	#[must_use]
	pub fn npix_at_order(&self) -> u64 {
		12u64 * 4u64.pow(u32::from(self.order))
	}

	/// Index of the direct parent cell at `order - 1`, or `None` at order 0.
	#[must_use]
	pub fn parent_ipix(&self) -> Option<u64> {
		if self.order == 0 { None } else { Some(self.ipix / 4) }
	}

	/// Keys of this cell's four children at `order + 1`.
	#[must_use]
	pub fn children(&self) -> [u64; 4] {
		let base = self.ipix * 4;
		[base, base + 1, base + 2, base + 3]
	}

	#[must_use]
	pub fn at_order(&self, order: u8, ipix: u64) -> TileKey {
		TileKey { order, ipix, ..*self }
	}
}

impl fmt::Debug for TileKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileKey(order={}, ipix={})", self.order, self.ipix)
	}
}

impl PartialOrd for TileKey {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TileKey {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.order.cmp(&other.order).then(self.ipix.cmp(&other.ipix))
	}
}
