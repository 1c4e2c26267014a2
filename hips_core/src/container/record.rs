//! 80-column keyword records: `KEYWORD = value / comment`, FITS-style.

use anyhow::{Context, Result, bail, ensure};

pub const RECORD_LEN: usize = 80;
const VALUE_INDICATOR: &str = "= ";

/// The value carried by a keyword record.
#[derive(Clone, Debug, PartialEq)]
pub enum KeywordValue {
	Str(String),
	Int(i64),
	Float(f64),
	Bool(bool),
	/// A record with no value, e.g. `COMMENT` or `END`.
	None,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeywordRecord {
	pub keyword: String,
	pub value: KeywordValue,
	pub comment: Option<String>,
}

impl KeywordRecord {
	pub fn new(keyword: &str, value: KeywordValue) -> Result<Self> {
		ensure!(
			keyword.len() <= 8,
			"keyword {keyword:?} is longer than 8 characters"
		);
		ensure!(
			keyword.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_'),
			"keyword {keyword:?} must be uppercase ASCII/digits/-/_"
		);
		Ok(Self {
			keyword: keyword.to_string(),
			value,
			comment: None,
		})
	}

	#[must_use]
	pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = Some(comment.into());
		self
	}

	pub fn end() -> Self {
		Self {
			keyword: "END".to_string(),
			value: KeywordValue::None,
			comment: None,
		}
	}

	/// Encodes this record into an 80-byte, space-padded ASCII line.
	pub fn encode(&self) -> [u8; RECORD_LEN] {
		let mut line = format!("{:<8}", self.keyword);
		match &self.value {
			KeywordValue::None => {
				if let Some(comment) = &self.comment {
					line.push(' ');
					line.push_str(comment);
				}
			}
			value => {
				line.push_str(VALUE_INDICATOR);
				line.push_str(&encode_value(value));
				if let Some(comment) = &self.comment {
					line.push_str(" / ");
					line.push_str(comment);
				}
			}
		}
		let mut bytes = [b' '; RECORD_LEN];
		let truncated = line.as_bytes();
		let n = truncated.len().min(RECORD_LEN);
		bytes[..n].copy_from_slice(&truncated[..n]);
		bytes
	}

	/// Parses an 80-byte keyword record line.
	pub fn decode(line: &[u8; RECORD_LEN]) -> Result<Self> {
		let text = std::str::from_utf8(line).context("keyword record is not valid ASCII/UTF-8")?;
		let keyword = text[0..8].trim_end().to_string();

		if keyword.is_empty() {
			bail!("keyword record has an empty keyword");
		}
		if keyword == "END" {
			return Ok(Self::end());
		}

		let rest = &text[8..];
		if !rest.starts_with(VALUE_INDICATOR) {
			// COMMENT/HISTORY-style free-text record.
			return Ok(Self {
				keyword,
				value: KeywordValue::None,
				comment: Some(rest.trim().to_string()),
			});
		}

		let (value_str, comment) = split_value_and_comment(&rest[VALUE_INDICATOR.len()..]);
		let value = decode_value(value_str)?;
		Ok(Self {
			keyword,
			value,
			comment,
		})
	}
}

fn encode_value(value: &KeywordValue) -> String {
	match value {
		KeywordValue::Str(s) => format!("'{:<8}'", s.replace('\'', "''")),
		KeywordValue::Int(i) => i.to_string(),
		KeywordValue::Float(f) => format_float(*f),
		KeywordValue::Bool(b) => if *b { "T" } else { "F" }.to_string(),
		KeywordValue::None => String::new(),
	}
}

fn format_float(f: f64) -> String {
	if f == 0.0 {
		return "0.0".to_string();
	}
	format!("{f:E}").replace('E', "E+").replace("E+-", "E-")
}

fn split_value_and_comment(rest: &str) -> (&str, Option<String>) {
	let rest = rest.trim();
	if let Some(quoted_end) = quoted_string_end(rest) {
		let value = &rest[..=quoted_end];
		let tail = rest[quoted_end + 1..].trim_start();
		let comment = tail.strip_prefix('/').map(|c| c.trim().to_string());
		return (value, comment);
	}
	match rest.split_once('/') {
		Some((value, comment)) => (value.trim(), Some(comment.trim().to_string())),
		None => (rest, None),
	}
}

fn quoted_string_end(rest: &str) -> Option<usize> {
	if !rest.starts_with('\'') {
		return None;
	}
	let bytes = rest.as_bytes();
	let mut i = 1;
	while i < bytes.len() {
		if bytes[i] == b'\'' {
			if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
				i += 2;
				continue;
			}
			return Some(i);
		}
		i += 1;
	}
	None
}

fn decode_value(value_str: &str) -> Result<KeywordValue> {
	let trimmed = value_str.trim();
	if trimmed.is_empty() {
		return Ok(KeywordValue::None);
	}
	if let Some(stripped) = trimmed.strip_prefix('\'') {
		let inner = stripped.strip_suffix('\'').unwrap_or(stripped);
		return Ok(KeywordValue::Str(inner.trim_end().replace("''", "'")));
	}
	if trimmed == "T" {
		return Ok(KeywordValue::Bool(true));
	}
	if trimmed == "F" {
		return Ok(KeywordValue::Bool(false));
	}
	if let Ok(i) = trimmed.parse::<i64>() {
		return Ok(KeywordValue::Int(i));
	}
	let normalized = trimmed.replace('D', "E");
	normalized
		.parse::<f64>()
		.map(KeywordValue::Float)
		.with_context(|| format!("could not parse keyword value {value_str:?}"))
}
