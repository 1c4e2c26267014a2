//! Thin wrapper around the [`cdshealpix`] crate's NESTED-scheme primitives.
//!
//! Per the HEALPix pixelization non-goal, sphere tessellation math itself is
//! never rederived here — this module only adapts `cdshealpix`'s API to the
//! `order`/`ipix`/`(lon, lat)` vocabulary the rest of the codebase uses, and
//! keeps the NESTED/RING conversion used by the full-sphere map exporter in
//! one place.

use anyhow::{Result, ensure};
use cdshealpix::nested;

/// Number of pixels on a side for the given `order` (`nside = 2^order`).
#[must_use]
pub fn nside(order: u8) -> u64 {
	1u64 << order
}

/// Total number of HEALPix cells at `order` (`12 * 4^order`).
#[must_use]
pub fn npix(order: u8) -> u64 {
	12u64 * nside(order) * nside(order)
}

/// NESTED-scheme pixel index of the cell containing `(lon, lat)`, both in
/// radians.
pub fn ang2pix(order: u8, lon_rad: f64, lat_rad: f64) -> Result<u64> {
	ensure!(order <= 29, "order ({order}) must be <= 29");
	let layer = nested::get(order);
	Ok(layer.hash(lon_rad, lat_rad))
}

/// The `(lon, lat)` in radians of the center of NESTED cell `ipix` at `order`.
pub fn pix2ang(order: u8, ipix: u64) -> Result<(f64, f64)> {
	ensure!(order <= 29, "order ({order}) must be <= 29");
	ensure!(ipix < npix(order), "ipix ({ipix}) out of range for order {order}");
	let layer = nested::get(order);
	Ok(layer.center(ipix))
}

/// Converts a NESTED pixel index to its RING counterpart at the same order,
/// used by the full-sphere map exporter's `ORDERING='RING'` mode.
pub fn nest_to_ring(order: u8, ipix_nest: u64) -> Result<u64> {
	ensure!(order <= 29, "order ({order}) must be <= 29");
	let layer = nested::get(order);
	Ok(layer.to_ring(ipix_nest))
}

/// Converts a RING pixel index to its NESTED counterpart at the same order.
pub fn ring_to_nest(order: u8, ipix_ring: u64) -> Result<u64> {
	ensure!(order <= 29, "order ({order}) must be <= 29");
	let layer = nested::get(order);
	Ok(layer.from_ring(ipix_ring))
}
