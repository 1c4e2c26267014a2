//! The pyramid reader: resolves declared tile formats from a
//! pyramid's `properties`, reads and decodes tiles and the Allsky mosaic
//! through a `StorageTarget`, and memoizes `properties` per ordering
//! guarantee that a memoised value is reused on every subsequent call.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use hips_core::{Frame, Properties, TileEncoding, TileKey, path};
use hips_image::Tile;

use crate::storage::{DirectoryStorage, RemoteStorage, StorageTarget};

/// Where a pyramid's files live. `Custom` accepts any `StorageTarget`,
/// including `MemoryStorage` or an embedder-supplied implementation.
pub enum HipsSource {
	LocalRoot(PathBuf),
	RemoteRoot(String),
	Custom(Arc<dyn StorageTarget>),
}

/// Reads tiles, the Allsky mosaic and properties from a pyramid addressed
/// by a [`HipsSource`].
pub struct PyramidReader {
	storage: Arc<dyn StorageTarget>,
	properties: OnceLock<Properties>,
}

impl PyramidReader {
	pub fn new(source: HipsSource) -> Result<Self> {
		let storage: Arc<dyn StorageTarget> = match source {
			HipsSource::LocalRoot(dir) => Arc::new(DirectoryStorage::new(dir)?),
			HipsSource::RemoteRoot(url) => Arc::new(RemoteStorage::new(url)?),
			HipsSource::Custom(storage) => storage,
		};
		Ok(Self {
			storage,
			properties: OnceLock::new(),
		})
	}

	/// Wraps an already-constructed `StorageTarget`, bypassing `HipsSource`.
	#[must_use]
	pub fn from_storage(storage: Arc<dyn StorageTarget>) -> Self {
		Self {
			storage,
			properties: OnceLock::new(),
		}
	}

	/// Loads and memoizes `properties`. All subsequent calls observe the
	/// memoized value, per the reader's idempotence guarantee.
	pub async fn properties(&self) -> Result<&Properties> {
		if let Some(props) = self.properties.get() {
			return Ok(props);
		}
		let text = self.storage.read_text("properties").await.context("reading properties")?;
		let parsed = Properties::parse(&text).context("parsing properties")?;
		let _ = self.properties.set(parsed);
		Ok(self.properties.get().expect("just set"))
	}

	/// The parsed, normalized `hips_tile_format` list (empty defaults to
	/// `[floatImage]`).
	pub async fn tile_formats(&self) -> Result<Vec<TileEncoding>> {
		Ok(self.properties().await?.tile_formats())
	}

	async fn frame(&self) -> Result<Frame> {
		self.properties().await?.frame()
	}

	/// Resolves frame from properties, then tries each declared format in
	/// preference order until one decodes successfully; on exhaustion
	/// reports the last underlying error.
	pub async fn read_tile(&self, order: u8, ipix: u64, spectral: Option<(u8, u64)>) -> Result<Tile> {
		let frame = self.frame().await?;
		let formats = self.tile_formats().await?;

		let mut last_err = None;
		for encoding in formats {
			let mut key = TileKey::new(order, ipix, frame, encoding)?;
			if let Some((sorder, sindex)) = spectral {
				key = key.with_spectral_plane(sorder, sindex);
			}
			let rel_path = path::tile_path(&key);
			let rel_path = rel_path.to_string_lossy();
			match self.storage.read_binary(&rel_path).await {
				Ok(bytes) => match hips_image::decode(&key, &bytes) {
					Ok(tile) => return Ok(tile),
					Err(err) => last_err = Some(err),
				},
				Err(err) => last_err = Some(err),
			}
		}
		Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no declared tile format for order {order} ipix {ipix}")))
	}

	/// Tries the requested format (or each declared format in order) for the
	/// `Norder3/Allsky.<ext>` mosaic.
	pub async fn read_allsky(&self, format: Option<TileEncoding>) -> Result<Tile> {
		let frame = self.frame().await?;
		let formats = match format {
			Some(encoding) => vec![encoding],
			None => self.tile_formats().await?,
		};

		let mut last_err = None;
		for encoding in formats {
			let key = TileKey::new(3, 0, frame, encoding)?;
			let rel_path = path::allsky_path(3, encoding);
			let rel_path = rel_path.to_string_lossy();
			match self.storage.read_binary(&rel_path).await {
				Ok(bytes) => match hips_image::decode(&key, &bytes) {
					Ok(tile) => return Ok(tile),
					Err(err) => last_err = Some(err),
				},
				Err(err) => last_err = Some(err),
			}
		}
		Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no Allsky mosaic found")))
	}

	#[must_use]
	pub fn storage(&self) -> &Arc<dyn StorageTarget> {
		&self.storage
	}
}

/// Reads the raw bytes at `path` directly, skipping tile decoding — used by
/// the lint walker and the full-sphere map exporter's coverage-map read.
pub async fn read_raw(storage: &dyn StorageTarget, path: &str) -> Result<Vec<u8>> {
	if !storage.exists(path).await? {
		bail!("{path} does not exist");
	}
	storage.read_binary(path).await
}
