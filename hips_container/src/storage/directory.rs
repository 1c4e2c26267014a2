//! Filesystem-backed `StorageTarget`, generalized from XYZ tile-path layouts
//! to HEALPix paths. Reads and writes are synchronous `std::fs` calls made
//! from within `async fn` bodies rather than spawned onto a blocking pool,
//! since each call only ever touches a single small file.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

use super::{StorageTarget, normalize_path};

/// A `StorageTarget` rooted at an absolute directory on the local filesystem.
pub struct DirectoryStorage {
	root: PathBuf,
}

impl DirectoryStorage {
	/// Opens `root` as a storage target. `root` need not already exist; it is
	/// created on first write.
	pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		bail_if_relative(&root)?;
		Ok(Self { root })
	}

	fn resolve(&self, path: &str) -> PathBuf {
		self.root.join(normalize_path(path))
	}
}

fn bail_if_relative(root: &std::path::Path) -> Result<()> {
	if root.is_relative() {
		bail!("storage root {root:?} must be absolute");
	}
	Ok(())
}

#[async_trait]
impl StorageTarget for DirectoryStorage {
	async fn write_binary(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
		let dest = self.resolve(path);
		log::trace!("write_binary {dest:?}");
		if let Some(parent) = dest.parent()
			&& !parent.exists()
		{
			fs::create_dir_all(parent).with_context(|| format!("creating directory {parent:?}"))?;
		}
		fs::write(&dest, bytes).with_context(|| format!("writing {dest:?}"))
	}

	async fn write_text(&self, path: &str, text: &str) -> Result<()> {
		self.write_binary(path, text.as_bytes().to_vec()).await
	}

	async fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
		let src = self.resolve(path);
		log::trace!("read_binary {src:?}");
		fs::read(&src).with_context(|| format!("reading {src:?}"))
	}

	async fn read_text(&self, path: &str) -> Result<String> {
		let src = self.resolve(path);
		fs::read_to_string(&src).with_context(|| format!("reading {src:?}"))
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		Ok(self.resolve(path).exists())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::TempDir;

	#[tokio::test]
	async fn write_then_read_round_trips() -> Result<()> {
		let dir = TempDir::new()?;
		let storage = DirectoryStorage::new(dir.path())?;

		storage.write_binary("Norder3/Dir0/Npix0.fits", vec![1, 2, 3]).await?;
		assert!(storage.exists("Norder3/Dir0/Npix0.fits").await?);
		assert_eq!(storage.read_binary("Norder3/Dir0/Npix0.fits").await?, vec![1, 2, 3]);

		storage.write_text("properties", "hips_order = 3\n").await?;
		assert_eq!(storage.read_text("properties").await?, "hips_order = 3\n");

		Ok(())
	}

	#[tokio::test]
	async fn missing_file_reports_error() -> Result<()> {
		let dir = TempDir::new()?;
		let storage = DirectoryStorage::new(dir.path())?;
		assert!(storage.read_binary("missing.fits").await.is_err());
		assert!(!storage.exists("missing.fits").await?);
		Ok(())
	}

	#[tokio::test]
	async fn leading_slashes_are_normalized_into_the_root() -> Result<()> {
		let dir = TempDir::new()?;
		let storage = DirectoryStorage::new(dir.path())?;
		storage.write_binary("///properties", vec![1]).await?;
		assert!(dir.path().join("properties").exists());
		Ok(())
	}

	#[test]
	fn relative_root_is_rejected() {
		assert!(DirectoryStorage::new("relative/path").is_err());
	}
}
