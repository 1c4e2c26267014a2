//! The celestial reference frame a pyramid or tile is expressed in.

use anyhow::{Result, bail};
use std::fmt;

/// Reference frame for HEALPix pixelization and WCS tile headers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Frame {
	Equatorial,
	Galactic,
	Ecliptic,
}

impl Frame {
	/// The single-letter `COORDSYS`/`CTYPE` prefix used by FITS-style headers.
	#[must_use]
	pub fn as_fits_letter(&self) -> &'static str {
		match self {
			Frame::Equatorial => "C",
			Frame::Galactic => "G",
			Frame::Ecliptic => "E",
		}
	}

	pub fn from_fits_letter(letter: &str) -> Result<Self> {
		match letter {
			"C" => Ok(Frame::Equatorial),
			"G" => Ok(Frame::Galactic),
			"E" => Ok(Frame::Ecliptic),
			other => bail!("unknown coordinate frame letter '{other}'"),
		}
	}
}

impl fmt::Display for Frame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Frame::Equatorial => "equatorial",
			Frame::Galactic => "galactic",
			Frame::Ecliptic => "ecliptic",
		};
		write!(f, "{name}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Frame::Equatorial)]
	#[case(Frame::Galactic)]
	#[case(Frame::Ecliptic)]
	fn round_trip_fits_letter(#[case] frame: Frame) {
		let letter = frame.as_fits_letter();
		assert_eq!(Frame::from_fits_letter(letter).unwrap(), frame);
	}

	#[test]
	fn unknown_letter_fails() {
		assert!(Frame::from_fits_letter("X").is_err());
	}
}
