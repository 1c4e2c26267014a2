//! Error taxonomy shared by every component: a stable short code per kind,
//! wrapped into [`anyhow::Error`] at the call site the way the rest of the
//! codebase reports failures.

use std::fmt;

/// The kind of failure a fallible operation produced, independent of the
/// human-readable message `anyhow` carries alongside it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HipsErrorKind {
	/// Malformed input: header, keyword record, or path could not be parsed.
	Parse,
	/// A value could not be encoded into the target container/codec.
	Encode,
	/// A value could not be decoded from a stored tile or container.
	Decode,
	/// The WCS could not be synthesized or evaluated (e.g. singular CD matrix).
	Wcs,
	/// Input failed a structural or semantic invariant check.
	Validation,
	/// Underlying filesystem/network I/O failed.
	Io,
	/// The operation observed a cancellation request.
	Cancelled,
}

impl HipsErrorKind {
	/// Stable short code surfaced in error messages and the lint walker.
	#[must_use]
	pub fn code(&self) -> &'static str {
		match self {
			HipsErrorKind::Parse => "E-PARSE",
			HipsErrorKind::Encode => "E-ENCODE",
			HipsErrorKind::Decode => "E-DECODE",
			HipsErrorKind::Wcs => "E-WCS",
			HipsErrorKind::Validation => "E-VALIDATION",
			HipsErrorKind::Io => "E-IO",
			HipsErrorKind::Cancelled => "E-CANCELLED",
		}
	}
}

impl fmt::Display for HipsErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.code())
	}
}

/// An error carrying one of the stable [`HipsErrorKind`]s.
///
/// Call sites construct this with [`HipsError::new`] and propagate it as an
/// `anyhow::Error` via `?` or `anyhow::Context`; there is no dedicated
/// `Result` alias, matching the rest of the codebase.
#[derive(Debug)]
pub struct HipsError {
	pub kind: HipsErrorKind,
	message: String,
}

impl HipsError {
	pub fn new(kind: HipsErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}
}

impl fmt::Display for HipsError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}] {}", self.kind.code(), self.message)
	}
}

impl std::error::Error for HipsError {}

/// Shorthand for `Err(HipsError::new(kind, message).into())`.
#[macro_export]
macro_rules! hips_bail {
	($kind:expr, $($arg:tt)*) => {
		return Err(anyhow::Error::new($crate::error::HipsError::new($kind, format!($($arg)*))))
	};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_includes_stable_code() {
		let err = HipsError::new(HipsErrorKind::Wcs, "singular CD matrix");
		assert_eq!(err.to_string(), "[E-WCS] singular CD matrix");
	}

	#[test]
	fn hips_bail_produces_anyhow_error() {
		fn fails() -> anyhow::Result<()> {
			hips_bail!(HipsErrorKind::Parse, "bad keyword {}", "FOO");
		}
		let err = fails().unwrap_err();
		assert!(err.to_string().contains("E-PARSE"));
	}
}
