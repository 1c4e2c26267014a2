//! The lint walker: walks a pyramid rooted at a local directory,
//! cross-checking path grammar, order bounds, declared-format coverage,
//! cube/non-cube path grammar and Allsky placement.
//!
//! Limited to local roots: enumerating "every file under `Norder*/…`" needs
//! directory listing, a capability `StorageTarget` deliberately does
//! not expose — lint is scoped to the case where the source is a local root
//! or explicitly supports `exists`, and a plain recursive `std::fs` walk is
//! the simplest thing that satisfies that for the one backend that matters.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use hips_core::{Frame, Properties, path};

/// Severity of a single lint finding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LintLevel {
	Error,
	Warning,
}

/// A single lint finding: a stable short code, the offending relative path
/// (empty for pyramid-wide issues such as missing properties keys), and a
/// human message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LintIssue {
	pub level: LintLevel,
	pub code: &'static str,
	pub path: String,
	pub message: String,
}

impl LintIssue {
	fn error(code: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			level: LintLevel::Error,
			code,
			path: path.into(),
			message: message.into(),
		}
	}

	fn warning(code: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			level: LintLevel::Warning,
			code,
			path: path.into(),
			message: message.into(),
		}
	}
}

/// Walks the pyramid rooted at `root` and returns every issue found. Never
/// raises for structural pyramid problems — those are reported as issues;
/// it only errors if `root`'s `properties` file cannot be read at all.
pub fn lint_pyramid(root: &Path) -> Result<Vec<LintIssue>> {
	let mut issues = Vec::new();

	let properties_text = fs::read_to_string(root.join("properties")).context("reading properties")?;
	let properties = Properties::parse(&properties_text).context("parsing properties")?;

	let report = properties.validate();
	for missing in &report.missing {
		issues.push(LintIssue::error("MISSING_PROPERTY", "properties", missing.clone()));
	}
	for invalid in &report.invalid {
		issues.push(LintIssue::error("INVALID_PROPERTY", "properties", invalid.clone()));
	}
	for warning in &report.warnings {
		issues.push(LintIssue::warning("PROPERTY_WARNING", "properties", warning.clone()));
	}

	let max_order = properties.max_order().ok();
	let declared_formats = properties.tile_formats();
	let is_cube = properties.get("dataproduct_type") == Some("cube");
	let frame = properties.frame().unwrap_or(Frame::Equatorial);

	let mut entries = Vec::new();
	walk(root, root, &mut entries)?;

	let mut found_allsky = false;
	for rel in entries {
		let rel_str = rel.to_string_lossy().replace('\\', "/");
		if rel_str == "properties" || rel_str == "Moc.fits" {
			continue;
		}

		let file_name = rel.file_name().and_then(|n| n.to_str()).unwrap_or_default();
		if let Some(stripped) = file_name.strip_prefix("Allsky.") {
			found_allsky = true;
			let parent_order = rel
				.parent()
				.and_then(|p| p.file_name())
				.and_then(|n| n.to_str())
				.and_then(|s| s.strip_prefix("Norder"))
				.and_then(|s| s.parse::<u8>().ok());
			if parent_order != Some(3) {
				issues.push(LintIssue::error(
					"ALLSKY_WRONG_ORDER",
					rel_str.clone(),
					"Allsky mosaic must live under Norder3/",
				));
			}
			if stripped.is_empty() {
				issues.push(LintIssue::error("PATH_GRAMMAR_VIOLATION", rel_str.clone(), "Allsky file has no extension"));
			}
			continue;
		}

		match path::parse_tile_path(&rel, frame) {
			Ok(key) => {
				if let Some(max) = max_order
					&& key.order > max
				{
					issues.push(LintIssue::error(
						"ORDER_EXCEEDS_DECLARED",
						rel_str.clone(),
						format!("tile order {} exceeds declared hips_order {max}", key.order),
					));
				}
				if !declared_formats.contains(&key.encoding) {
					issues.push(LintIssue::warning(
						"TILE_FORMAT_UNDECLARED",
						rel_str.clone(),
						format!("tile format '{}' is not declared in hips_tile_format", key.encoding),
					));
				}
				let key_is_cube = key.spectral_order.is_some();
				if key_is_cube != is_cube {
					issues.push(LintIssue::error(
						"CUBE_GRAMMAR_MISMATCH",
						rel_str.clone(),
						format!("path grammar is {} but dataproduct_type is {}", grammar_word(key_is_cube), grammar_word(is_cube)),
					));
				}
			}
			Err(err) => {
				issues.push(LintIssue::error("PATH_GRAMMAR_VIOLATION", rel_str.clone(), err.to_string()));
			}
		}
	}

	if !found_allsky {
		issues.push(LintIssue::warning(
			"ALLSKY_MISSING",
			String::new(),
			"no Norder3/Allsky.<ext> mosaic found",
		));
	}

	Ok(issues)
}

fn grammar_word(is_cube: bool) -> &'static str {
	if is_cube { "cube" } else { "non-cube" }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
	for entry in fs::read_dir(dir).with_context(|| format!("reading directory {dir:?}"))? {
		let entry = entry?;
		let entry_path = entry.path();
		if entry_path.is_dir() {
			walk(root, &entry_path, out)?;
		} else {
			out.push(entry_path.strip_prefix(root).unwrap_or(&entry_path).to_path_buf());
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::TempDir;
	use assert_fs::fixture::{FileWriteStr, PathChild};
	use hips_core::{TileEncoding, TileKey};
	use rstest::rstest;

	fn write_valid_pyramid(dir: &TempDir) -> Result<()> {
		dir.child("properties").write_str(
			"creator_did = ivo://example.org/hips/survey\n\
			 hips_frame = equatorial\n\
			 hips_order = 3\n\
			 hips_tile_width = 4\n\
			 hips_tile_format = float\n",
		)?;
		let key = TileKey::new(3, 0, Frame::Equatorial, TileEncoding::FloatImage)?;
		let rel = path::tile_path(&key);
		dir.child(rel.to_string_lossy().as_ref()).write_str("x")?;
		dir.child("Norder3/Allsky.fits").write_str("x")?;
		Ok(())
	}

	#[test]
	fn clean_pyramid_reports_no_issues() -> Result<()> {
		let dir = TempDir::new()?;
		write_valid_pyramid(&dir)?;
		let issues = lint_pyramid(dir.path())?;
		assert!(issues.is_empty(), "{issues:?}");
		Ok(())
	}

	#[rstest]
	#[case(TileKey::new(2, 0, Frame::Equatorial, TileEncoding::BytePng), "TILE_FORMAT_UNDECLARED", LintLevel::Warning)]
	#[case(TileKey::new(4, 0, Frame::Equatorial, TileEncoding::FloatImage), "ORDER_EXCEEDS_DECLARED", LintLevel::Error)]
	fn an_extra_stray_tile_is_flagged(#[case] key: Result<TileKey>, #[case] code: &str, #[case] level: LintLevel) -> Result<()> {
		let dir = TempDir::new()?;
		write_valid_pyramid(&dir)?;
		let key = key?;
		dir.child(path::tile_path(&key).to_string_lossy().as_ref()).write_str("x")?;

		let issues = lint_pyramid(dir.path())?;
		assert!(issues.iter().any(|i| i.code == code && i.level == level));
		Ok(())
	}

	#[test]
	fn missing_allsky_is_a_warning() -> Result<()> {
		let dir = TempDir::new()?;
		dir.child("properties").write_str(
			"creator_did = x\nhips_frame = equatorial\nhips_order = 3\nhips_tile_width = 4\nhips_tile_format = float\n",
		)?;
		let key = TileKey::new(3, 0, Frame::Equatorial, TileEncoding::FloatImage)?;
		dir.child(path::tile_path(&key).to_string_lossy().as_ref()).write_str("x")?;

		let issues = lint_pyramid(dir.path())?;
		assert!(issues.iter().any(|i| i.code == "ALLSKY_MISSING"));
		Ok(())
	}

	#[test]
	fn missing_required_properties_are_errors() -> Result<()> {
		let dir = TempDir::new()?;
		dir.child("properties").write_str("creator_did = x\n")?;
		let issues = lint_pyramid(dir.path())?;
		assert!(issues.iter().any(|i| i.code == "MISSING_PROPERTY" && i.level == LintLevel::Error));
		Ok(())
	}
}
