//! The three on-disk tile encodings a pyramid can store per order.

use anyhow::{Result, bail};
use std::fmt;

/// Pixel encoding used for a stored tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TileEncoding {
	/// 32-bit float samples in the image container codec, non-finite = no-data.
	FloatImage,
	/// 8-bit lossy PNG.
	BytePng,
	/// 4-channel lossy JPEG, decoded to luminance.
	ByteJpeg,
}

impl TileEncoding {
	/// File extension used in `NpixN.<ext>` path components.
	#[must_use]
	pub fn extension(&self) -> &'static str {
		match self {
			TileEncoding::FloatImage => "fits",
			TileEncoding::BytePng => "png",
			TileEncoding::ByteJpeg => "jpg",
		}
	}

	pub fn from_extension(ext: &str) -> Result<Self> {
		match ext {
			"fits" => Ok(TileEncoding::FloatImage),
			"png" => Ok(TileEncoding::BytePng),
			"jpg" | "jpeg" => Ok(TileEncoding::ByteJpeg),
			other => bail!("unknown tile extension '{other}'"),
		}
	}

	/// `true` for encodings that lose precision relative to the source samples.
	#[must_use]
	pub fn is_lossy(&self) -> bool {
		!matches!(self, TileEncoding::FloatImage)
	}
}

impl fmt::Display for TileEncoding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.extension())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(TileEncoding::FloatImage)]
	#[case(TileEncoding::BytePng)]
	#[case(TileEncoding::ByteJpeg)]
	fn round_trip_extension(#[case] enc: TileEncoding) {
		assert_eq!(TileEncoding::from_extension(enc.extension()).unwrap(), enc);
	}

	#[rstest]
	#[case(TileEncoding::BytePng, true)]
	#[case(TileEncoding::ByteJpeg, true)]
	#[case(TileEncoding::FloatImage, false)]
	fn lossy_matches_encoding(#[case] enc: TileEncoding, #[case] expected: bool) {
		assert_eq!(enc.is_lossy(), expected);
	}

	#[test]
	fn jpeg_extension_also_accepted_on_decode() {
		assert_eq!(TileEncoding::from_extension("jpeg").unwrap(), TileEncoding::ByteJpeg);
	}

	#[test]
	fn unknown_extension_fails() {
		assert!(TileEncoding::from_extension("tiff").is_err());
	}
}
