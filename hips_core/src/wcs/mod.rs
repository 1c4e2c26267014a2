//! The linear World Coordinate System engine: pixel↔world mapping via a CD
//! matrix (or synthesized from `CDELT`/`CROTA2`), singular-matrix detection,
//! and longitude wraparound handling.

use crate::container::{KeywordRecord, KeywordValue};
use crate::error::{HipsError, HipsErrorKind};
use crate::healpix;
use crate::types::{Frame, TileKey};
use anyhow::{Context, Result, bail};

/// A linear, tangent-plane-style WCS: reference pixel, reference world
/// coordinate, and a 2x2 CD matrix mapping pixel offsets to world offsets
/// (degrees per pixel).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wcs {
	pub crpix1: f64,
	pub crpix2: f64,
	pub crval1: f64,
	pub crval2: f64,
	pub cd: [[f64; 2]; 2],
}

impl Wcs {
	/// Builds a WCS directly from a CD matrix.
	pub fn from_cd_matrix(crpix1: f64, crpix2: f64, crval1: f64, crval2: f64, cd: [[f64; 2]; 2]) -> Result<Self> {
		let wcs = Wcs {
			crpix1,
			crpix2,
			crval1,
			crval2,
			cd,
		};
		wcs.determinant_checked()?;
		Ok(wcs)
	}

	/// Synthesizes a CD matrix from `CDELT1`/`CDELT2`/`CROTA2` (degrees),
	/// the classic legacy WCS keyword trio.
	pub fn from_cdelt_crota(
		crpix1: f64,
		crpix2: f64,
		crval1: f64,
		crval2: f64,
		cdelt1: f64,
		cdelt2: f64,
		crota2_deg: f64,
	) -> Result<Self> {
		let theta = crota2_deg.to_radians();
		let (sin, cos) = theta.sin_cos();
		let cd = [
			[cdelt1 * cos, -cdelt2 * sin],
			[cdelt1 * sin, cdelt2 * cos],
		];
		Self::from_cd_matrix(crpix1, crpix2, crval1, crval2, cd)
	}

	/// Constructs a `Wcs` (and its inferred [`Frame`]) from a source image's
	/// header keyword records: `CD1_1..CD2_2` verbatim if any is finite,
	/// otherwise synthesized from `CDELT1`/`CDELT2`/`CROTA2`. The frame is
	/// inferred from the `CTYPE1` axis-type token's prefix
	/// (`RA---*|GLON-*|ELON-*`).
	pub fn from_keywords(records: &[KeywordRecord]) -> Result<(Self, Frame)> {
		let crpix1 = get_float(records, "CRPIX1")?;
		let crpix2 = get_float(records, "CRPIX2")?;
		let crval1 = get_float(records, "CRVAL1")?;
		let crval2 = get_float(records, "CRVAL2")?;

		let cd = [
			get_float(records, "CD1_1").ok(),
			get_float(records, "CD1_2").ok(),
			get_float(records, "CD2_1").ok(),
			get_float(records, "CD2_2").ok(),
		];
		let wcs = if cd.iter().any(|v| v.is_some_and(f64::is_finite)) {
			let cd = [
				[cd[0].unwrap_or(0.0), cd[1].unwrap_or(0.0)],
				[cd[2].unwrap_or(0.0), cd[3].unwrap_or(0.0)],
			];
			Self::from_cd_matrix(crpix1, crpix2, crval1, crval2, cd)?
		} else {
			let cdelt1 = get_float(records, "CDELT1")?;
			let cdelt2 = get_float(records, "CDELT2")?;
			let crota2 = get_float(records, "CROTA2").unwrap_or(0.0);
			Self::from_cdelt_crota(crpix1, crpix2, crval1, crval2, cdelt1, cdelt2, crota2)?
		};

		let ctype1 = get_str(records, "CTYPE1")?;
		let frame = frame_from_ctype(&ctype1)?;

		Ok((wcs, frame))
	}

	/// Synthesizes the WCS a tile of edge `w` carries in its `floatImage`
	/// container: reference pixel at the tile centre, reference world
	/// coordinate at the HEALPix cell centre, and a uniform pixel scale of
	/// `45°/(w·nside)` with longitude flipped (the sky-standard orientation)
	/// and no rotation.
	pub fn for_tile(key: &TileKey, w: usize) -> Result<Self> {
		let nside = healpix::nside(key.order) as f64;
		let (lon_rad, lat_rad) = healpix::pix2ang(key.order, key.ipix)?;
		let scale = 45.0 / (w as f64 * nside);
		let crpix = w as f64 / 2.0 + 0.5;
		Self::from_cd_matrix(
			crpix,
			crpix,
			lon_rad.to_degrees(),
			lat_rad.to_degrees(),
			[[-scale, 0.0], [0.0, scale]],
		)
	}

	fn determinant(&self) -> f64 {
		self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0]
	}

	fn determinant_checked(&self) -> Result<f64> {
		let det = self.determinant();
		if det.abs() < 1e-15 {
			return Err(anyhow::Error::new(HipsError::new(
				HipsErrorKind::Wcs,
				"CD matrix is singular (determinant is zero)",
			)));
		}
		Ok(det)
	}

	/// Maps a pixel coordinate (1-indexed, FITS convention) to `(lon, lat)`
	/// world coordinates in degrees, wrapping longitude into `[0, 360)`.
	#[must_use]
	pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
		let dx = px - self.crpix1;
		let dy = py - self.crpix2;
		let dlon = self.cd[0][0] * dx + self.cd[0][1] * dy;
		let dlat = self.cd[1][0] * dx + self.cd[1][1] * dy;
		let lon = wrap_degrees(self.crval1 + dlon);
		let lat = self.crval2 + dlat;
		(lon, lat)
	}

	/// Maps `(lon, lat)` world coordinates in degrees back to a pixel
	/// coordinate by inverting the CD matrix.
	pub fn world_to_pixel(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
		let det = self.determinant_checked()?;
		let dlon = shortest_delta(lon, self.crval1);
		let dlat = lat - self.crval2;

		let inv = [
			[self.cd[1][1] / det, -self.cd[0][1] / det],
			[-self.cd[1][0] / det, self.cd[0][0] / det],
		];
		let dx = inv[0][0] * dlon + inv[0][1] * dlat;
		let dy = inv[1][0] * dlon + inv[1][1] * dlat;
		Ok((self.crpix1 + dx, self.crpix2 + dy))
	}
}

fn get_float(records: &[KeywordRecord], keyword: &str) -> Result<f64> {
	let record = records
		.iter()
		.find(|r| r.keyword == keyword)
		.with_context(|| format!("missing required WCS keyword {keyword}"))?;
	match record.value {
		KeywordValue::Float(f) => Ok(f),
		KeywordValue::Int(i) => Ok(i as f64),
		ref other => bail!("{keyword} must be numeric, got {other:?}"),
	}
}

fn get_str(records: &[KeywordRecord], keyword: &str) -> Result<String> {
	let record = records
		.iter()
		.find(|r| r.keyword == keyword)
		.with_context(|| format!("missing required WCS keyword {keyword}"))?;
	match &record.value {
		KeywordValue::Str(s) => Ok(s.trim().to_string()),
		other => bail!("{keyword} must be a string, got {other:?}"),
	}
}

/// Infers the [`Frame`] from a `CTYPE1` axis-type token, matching on the
/// first four characters (`RA--`, `GLON`, `ELON`), case-insensitively.
fn frame_from_ctype(ctype1: &str) -> Result<Frame> {
	let prefix = ctype1.to_ascii_uppercase();
	if prefix.starts_with("RA--") {
		Ok(Frame::Equatorial)
	} else if prefix.starts_with("GLON") {
		Ok(Frame::Galactic)
	} else if prefix.starts_with("ELON") {
		Ok(Frame::Ecliptic)
	} else {
		Err(anyhow::Error::new(HipsError::new(
			HipsErrorKind::Wcs,
			format!("unrecognized CTYPE1 axis token {ctype1:?}"),
		)))
	}
}

fn wrap_degrees(lon: f64) -> f64 {
	lon.rem_euclid(360.0)
}

/// The signed shortest angular distance from `to` to `from`, accounting for
/// the `0`/`360` wraparound seam.
fn shortest_delta(from: f64, to: f64) -> f64 {
	let raw = from - to;
	let wrapped = ((raw + 180.0).rem_euclid(360.0)) - 180.0;
	wrapped
}
