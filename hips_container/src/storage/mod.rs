//! The `StorageTarget` capability: the only persistence interface
//! the rest of the toolbox depends on, plus its first-party implementations.

mod directory;
mod memory;
mod remote;

pub use directory::DirectoryStorage;
pub use memory::MemoryStorage;
pub use remote::RemoteStorage;

use anyhow::Result;
use async_trait::async_trait;

/// Normalizes a storage path to forward slashes with leading slashes
/// de-duplicated.
#[must_use]
pub fn normalize_path(path: &str) -> String {
	path.replace('\\', "/").trim_start_matches('/').to_string()
}

/// The only persistence interface the pyramid reader, builder and export
/// engine depend on. Object-safe so callers can hold a `dyn StorageTarget`
/// without knowing which backend (filesystem, memory, HTTP) serves it.
#[async_trait]
pub trait StorageTarget: Send + Sync {
	async fn write_binary(&self, path: &str, bytes: Vec<u8>) -> Result<()>;
	async fn write_text(&self, path: &str, text: &str) -> Result<()>;
	async fn read_binary(&self, path: &str) -> Result<Vec<u8>>;
	async fn read_text(&self, path: &str) -> Result<String>;
	async fn exists(&self, path: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_backslashes_and_leading_slashes() {
		assert_eq!(normalize_path("///Norder3/Allsky.fits"), "Norder3/Allsky.fits");
		assert_eq!(normalize_path("a\\b\\c"), "a/b/c");
		assert_eq!(normalize_path("already/clean"), "already/clean");
	}
}
