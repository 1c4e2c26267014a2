//! In-memory `StorageTarget`: a real, usable zero-I/O backend rather than a
//! test-only stub — used throughout this crate's own test suite and
//! available to downstream embedders who want a fake with no filesystem
//! footprint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{StorageTarget, normalize_path};

/// A `StorageTarget` backed by an in-process `HashMap`. Cheap to construct,
/// safe to share across threads via `Arc`.
#[derive(Default)]
pub struct MemoryStorage {
	entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds an entry directly, bypassing the trait — handy for test setup.
	pub fn seed(&self, path: &str, bytes: impl Into<Vec<u8>>) {
		self
			.entries
			.write()
			.expect("memory storage lock poisoned")
			.insert(normalize_path(path), bytes.into());
	}
}

#[async_trait]
impl StorageTarget for MemoryStorage {
	async fn write_binary(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
		self.entries
			.write()
			.expect("memory storage lock poisoned")
			.insert(normalize_path(path), bytes);
		Ok(())
	}

	async fn write_text(&self, path: &str, text: &str) -> Result<()> {
		self.write_binary(path, text.as_bytes().to_vec()).await
	}

	async fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
		self
			.entries
			.read()
			.expect("memory storage lock poisoned")
			.get(&normalize_path(path))
			.cloned()
			.with_context(|| format!("{path} not found"))
	}

	async fn read_text(&self, path: &str) -> Result<String> {
		let bytes = self.read_binary(path).await?;
		String::from_utf8(bytes).with_context(|| format!("{path} is not valid UTF-8"))
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		Ok(self
			.entries
			.read()
			.expect("memory storage lock poisoned")
			.contains_key(&normalize_path(path)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn write_then_read_round_trips() -> Result<()> {
		let storage = MemoryStorage::new();
		storage.write_binary("Norder0/Dir0/Npix0.fits", vec![9, 9]).await?;
		assert!(storage.exists("Norder0/Dir0/Npix0.fits").await?);
		assert_eq!(storage.read_binary("Norder0/Dir0/Npix0.fits").await?, vec![9, 9]);
		Ok(())
	}

	#[tokio::test]
	async fn missing_key_reports_error() -> Result<()> {
		let storage = MemoryStorage::new();
		assert!(storage.read_binary("nope").await.is_err());
		assert!(!storage.exists("nope").await?);
		Ok(())
	}

	#[tokio::test]
	async fn seed_bypasses_the_trait() -> Result<()> {
		let storage = MemoryStorage::new();
		storage.seed("properties", "hips_order = 0\n");
		assert_eq!(storage.read_text("properties").await?, "hips_order = 0\n");
		Ok(())
	}
}
