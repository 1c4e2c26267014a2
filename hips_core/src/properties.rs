//! The pyramid properties sidecar: an ordered, line-based `key = value` text
//! descriptor sitting alongside a pyramid's tile directories.

use anyhow::{Context, Result};
use std::fmt;

use crate::types::{Frame, TileEncoding};

/// Keys every pyramid's properties file must carry.
pub const REQUIRED_KEYS: &[&str] = &[
	"creator_did",
	"hips_frame",
	"hips_order",
	"hips_tile_width",
	"hips_tile_format",
];

/// Required only when `dataproduct_type = cube`.
pub const CUBE_REQUIRED_KEY: &str = "hips_cube_depth";

/// Keys that round-trip through the descriptor if present, but are not
/// required for a pyramid to be considered valid.
pub const OPTIONAL_KEYS: &[&str] = &[
	"obs_title",
	"obs_description",
	"hips_status",
	"hips_release_date",
	"hips_builder",
	"hips_copyright",
	"hips_version",
	"hips_order_min",
	"dataproduct_type",
	"moc_sky_fraction",
	"hips_allsky_restriction",
];

/// Outcome of [`Properties::validate`]: absent required keys, semantically
/// invalid values, and non-fatal warnings, each keyed by a stable short code
/// so callers (and the lint walker) can report them uniformly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
	/// Required keys that are absent, by short code `MISSING_PROPERTY`.
	pub missing: Vec<String>,
	/// Present keys whose value violates an invariant, `code: message`.
	pub invalid: Vec<String>,
	/// Non-fatal issues, `code: message`.
	pub warnings: Vec<String>,
}

impl ValidationReport {
	#[must_use]
	pub fn is_ok(&self) -> bool {
		self.missing.is_empty() && self.invalid.is_empty()
	}
}

/// An ordered `key = value` descriptor, preserving insertion order so that
/// round-tripping a properties file does not reshuffle its lines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
	entries: Vec<(String, String)>,
}

impl Properties {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, key: &str, value: impl Into<String>) {
		let value = value.into();
		if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
			entry.1 = value;
		} else {
			self.entries.push((key.to_string(), value));
		}
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	/// Parses a properties file body into an ordered descriptor. Blank lines
	/// and lines starting with `#` are ignored; every other non-blank line
	/// must be of the form `key = value` (equals sign required).
	pub fn parse(text: &str) -> Result<Self> {
		let mut props = Properties::new();
		for (lineno, line) in text.lines().enumerate() {
			let trimmed = line.trim();
			if trimmed.is_empty() || trimmed.starts_with('#') {
				continue;
			}
			let (key, value) = trimmed
				.split_once('=')
				.with_context(|| format!("line {}: expected 'key = value', got {trimmed:?}", lineno + 1))?;
			props.set(key.trim(), value.trim());
		}
		Ok(props)
	}

	/// Checks required keys, inter-field constraints and recommended
	/// conventions, returning a [`ValidationReport`] rather than raising —
	/// callers decide whether `missing`/`invalid` should abort an operation.
	#[must_use]
	pub fn validate(&self) -> ValidationReport {
		let mut report = ValidationReport::default();

		for key in REQUIRED_KEYS {
			match self.get(key) {
				Some(v) if !v.is_empty() => {}
				_ => report.missing.push(format!("MISSING_PROPERTY: required key '{key}' is absent")),
			}
		}

		let is_cube = self.get("dataproduct_type") == Some("cube");
		if is_cube && self.get(CUBE_REQUIRED_KEY).is_none_or(str::is_empty) {
			report
				.missing
				.push(format!("MISSING_PROPERTY: required key '{CUBE_REQUIRED_KEY}' is absent for a cube pyramid"));
		}

		if let Some(frame) = self.get("hips_frame")
			&& Frame::from_fits_letter(&frame_letter(frame)).is_err()
		{
			report
				.invalid
				.push(format!("INVALID_FRAME: unsupported frame token '{frame}'"));
		}

		let max_order: Option<u8> = self.get("hips_order").and_then(|v| v.parse().ok());
		if let Some(order_str) = self.get("hips_order")
			&& max_order.is_none()
		{
			report
				.invalid
				.push(format!("INVALID_ORDER: hips_order '{order_str}' is not an unsigned integer"));
		}

		if let Some(min_str) = self.get("hips_order_min") {
			match (min_str.parse::<u8>(), max_order) {
				(Ok(min), Some(max)) if min > max => {
					report
						.invalid
						.push(format!("INVALID_ORDER_RANGE: hips_order_min ({min}) > hips_order ({max})"));
				}
				(Err(_), _) => {
					report
						.invalid
						.push(format!("INVALID_ORDER: hips_order_min '{min_str}' is not an unsigned integer"));
				}
				_ => {}
			}
		}

		if let Some(formats) = self.get("hips_tile_format") {
			let tokens: Vec<&str> = formats.split([' ', ',']).filter(|s| !s.is_empty()).collect();
			if tokens.is_empty() {
				report
					.invalid
					.push("INVALID_TILE_FORMAT: hips_tile_format is empty".to_string());
			}
			for token in tokens {
				if format_token_to_encoding(token).is_none() {
					report
						.invalid
						.push(format!("INVALID_TILE_FORMAT: unsupported tile format token '{token}'"));
				}
			}
		}

		if let Some(width_str) = self.get("hips_tile_width") {
			match width_str.parse::<u32>() {
				Ok(width) if !width.is_power_of_two() => {
					report
						.warnings
						.push(format!("NON_POWER_OF_TWO_TILE_WIDTH: hips_tile_width ({width}) is not a power of two"));
				}
				Err(_) => {
					report
						.invalid
						.push(format!("INVALID_TILE_WIDTH: hips_tile_width '{width_str}' is not an unsigned integer"));
				}
				_ => {}
			}
		}

		report
	}

	#[must_use]
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Parses `hips_frame`, defaulting to equatorial when absent.
	pub fn frame(&self) -> Result<Frame> {
		let frame = self.get("hips_frame").unwrap_or("equatorial");
		Frame::from_fits_letter(&frame_letter(frame))
	}

	/// Parses the required `hips_order` key.
	pub fn max_order(&self) -> Result<u8> {
		self
			.get("hips_order")
			.context("missing hips_order")?
			.parse()
			.context("hips_order is not an unsigned integer")
	}

	/// Parses the optional `hips_order_min` key, defaulting to `0`.
	pub fn min_order(&self) -> Result<u8> {
		match self.get("hips_order_min") {
			Some(v) => v.parse().context("hips_order_min is not an unsigned integer"),
			None => Ok(0),
		}
	}

	/// Parses the required `hips_tile_width` key.
	pub fn tile_width(&self) -> Result<usize> {
		self
			.get("hips_tile_width")
			.context("missing hips_tile_width")?
			.parse()
			.context("hips_tile_width is not an unsigned integer")
	}

	/// Parses `hips_tile_format` into its declared encodings, in declared
	/// order, defaulting to `[floatImage]` when absent or empty.
	#[must_use]
	pub fn tile_formats(&self) -> Vec<TileEncoding> {
		let Some(formats) = self.get("hips_tile_format") else {
			return vec![TileEncoding::FloatImage];
		};
		let tokens: Vec<TileEncoding> = formats
			.split([' ', ','])
			.filter(|s| !s.is_empty())
			.filter_map(format_token_to_encoding)
			.collect();
		if tokens.is_empty() { vec![TileEncoding::FloatImage] } else { tokens }
	}
}

/// Maps a `hips_frame` value (`equatorial|galactic|ecliptic`) to its FITS
/// single-letter form, so frame validity can be checked via [`Frame::from_fits_letter`].
fn frame_letter(frame: &str) -> String {
	match frame.to_ascii_lowercase().as_str() {
		"equatorial" => "C",
		"galactic" => "G",
		"ecliptic" => "E",
		_ => "?",
	}
	.to_string()
}

/// Maps a declared `hips_tile_format` token to its [`TileEncoding`]. Accepts
/// both the on-disk extension (`fits`/`png`/`jpg`) and the semantic encoding
/// names (`float`/`png`/`jpeg`).
#[must_use]
pub fn format_token_to_encoding(token: &str) -> Option<TileEncoding> {
	match token.to_ascii_lowercase().as_str() {
		"float" | "fits" => Some(TileEncoding::FloatImage),
		"png" => Some(TileEncoding::BytePng),
		"jpeg" | "jpg" => Some(TileEncoding::ByteJpeg),
		_ => None,
	}
}

impl fmt::Display for Properties {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (key, value) in &self.entries {
			writeln!(f, "{key} = {value}")?;
		}
		Ok(())
	}
}

/// Errors raised by lint/validation call sites bail out as plain
/// `anyhow::Error`s; this helper raises the `E-VALIDATION` short code.
pub fn reject(message: impl Into<String>) -> anyhow::Error {
	anyhow::Error::new(crate::error::HipsError::new(
		crate::error::HipsErrorKind::Validation,
		message,
	))
}
