//! HEALPix tile path layout: `Norder<o>/Dir<bucket>/Npix<i>.<ext>` for 2-D
//! pyramids, `Norder<o>_<sOrder>/Dir<bucket>_<sb>/Npix<i>_<si>.<ext>` for cube
//! pyramids, where `bucket = (ipix / 10000) * 10000` and
//! `sb = (spectral_index / 10) * 10` — directory bucketing matching the
//! convention real HiPS pyramids use to keep any single directory from
//! holding more than ~10000 entries.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::types::{Frame, TileEncoding, TileKey};

const BUCKET_SIZE: u64 = 10_000;
const SPECTRAL_BUCKET_SIZE: u64 = 10;

/// Directory bucket a cell's tile file lives under.
#[must_use]
pub fn bucket(ipix: u64) -> u64 {
	(ipix / BUCKET_SIZE) * BUCKET_SIZE
}

/// Directory bucket a spectral plane's tile file lives under, within its
/// cell's directory.
#[must_use]
pub fn spectral_bucket(spectral_index: u64) -> u64 {
	(spectral_index / SPECTRAL_BUCKET_SIZE) * SPECTRAL_BUCKET_SIZE
}

/// Builds the relative path (no pyramid root prefix) for `key`'s tile file.
#[must_use]
pub fn tile_path(key: &TileKey) -> PathBuf {
	match (key.spectral_order, key.spectral_index) {
		(Some(sorder), Some(sindex)) => PathBuf::from(format!("Norder{}_{sorder}", key.order))
			.join(format!("Dir{}_{}", bucket(key.ipix), spectral_bucket(sindex)))
			.join(format!("Npix{}_{sindex}.{}", key.ipix, key.encoding.extension())),
		_ => PathBuf::from(format!("Norder{}", key.order))
			.join(format!("Dir{}", bucket(key.ipix)))
			.join(format!("Npix{}.{}", key.ipix, key.encoding.extension())),
	}
}

/// Parses a relative tile path back into a [`TileKey`], given the `frame`
/// the pyramid declares (not itself encoded in the path). Does not validate
/// bucket values against the convention beyond using them to navigate — any
/// bucket present in the path is accepted, since callers walk the filesystem
/// rather than re-deriving buckets from `ipix`/`spectral_index`.
pub fn parse_tile_path(path: &Path, frame: Frame) -> Result<TileKey> {
	let mut components = path.components().map(|c| c.as_os_str().to_string_lossy().into_owned());

	let norder = components.next().context("tile path missing Norder<o> component")?;
	let norder_body = norder
		.strip_prefix("Norder")
		.with_context(|| format!("expected 'Norder<o>[_<s>]' component, got {norder:?}"))?;
	let (order_str, spectral_order) = match norder_body.split_once('_') {
		Some((o, s)) => (
			o,
			Some(
				s.parse::<u8>()
					.with_context(|| format!("could not parse spectral order from {norder:?}"))?,
			),
		),
		None => (norder_body, None),
	};
	let order = order_str
		.parse::<u8>()
		.with_context(|| format!("could not parse order from {norder:?}"))?;

	let dir = components.next().context("tile path missing Dir<bucket> component")?;
	if !dir.starts_with("Dir") {
		bail!("expected 'Dir<bucket>[_<sb>]' component, got {dir:?}");
	}

	let npix = components.next().context("tile path missing Npix<i>[_<si>].<ext> component")?;
	let rest = npix
		.strip_prefix("Npix")
		.with_context(|| format!("expected 'Npix<i>[_<si>].<ext>', got {npix:?}"))?;
	let (body, ext) = rest
		.split_once('.')
		.with_context(|| format!("expected 'Npix<i>[_<si>].<ext>', got {npix:?}"))?;
	let (ipix_str, spectral_index) = match body.split_once('_') {
		Some((i, s)) => (
			i,
			Some(
				s.parse::<u64>()
					.with_context(|| format!("could not parse spectral index from {npix:?}"))?,
			),
		),
		None => (body, None),
	};
	let ipix = ipix_str
		.parse::<u64>()
		.with_context(|| format!("could not parse pixel index from {npix:?}"))?;
	let encoding = TileEncoding::from_extension(ext)?;

	let key = TileKey::new(order, ipix, frame, encoding)?;
	Ok(match (spectral_order, spectral_index) {
		(Some(so), Some(si)) => key.with_spectral_plane(so, si),
		_ => key,
	})
}

/// The HiPS Allsky mosaic path for `order`, always `Norder<order>/Allsky.<ext>`.
#[must_use]
pub fn allsky_path(order: u8, encoding: TileEncoding) -> PathBuf {
	PathBuf::from(format!("Norder{order}")).join(format!("Allsky.{}", encoding.extension()))
}
