//! The pyramid builder: turns one source image into a full tile
//! pyramid, with an optional Allsky mosaic and MOC coverage map.

use anyhow::{Context, Result, ensure};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use hips_container::StorageTarget;
use hips_core::progress::{ProgressTrait, get_progress_bar};
use hips_core::{CancellationHandle, CoverageMap, Frame, Properties, TileEncoding, TileKey, healpix, path};
use hips_image::Tile;

use crate::reproject::{DownsampleMode, SampleMode, downsample, reproject_plane_to_tile};
use crate::source::read_source;

/// Parameters controlling one [`Builder::build`] call.
pub struct BuildOptions {
	pub creator_did: String,
	pub tile_width: usize,
	pub formats: Vec<TileEncoding>,
	/// Highest order to generate tiles at; derived from the source image and
	/// `tile_width` when absent.
	pub max_order: Option<u8>,
	pub min_order: u8,
	pub include_allsky: bool,
	pub include_moc: bool,
	pub sample_mode: SampleMode,
}

impl Default for BuildOptions {
	fn default() -> Self {
		Self {
			creator_did: "ivo://anonymous/hips".to_string(),
			tile_width: 512,
			formats: vec![TileEncoding::FloatImage],
			max_order: None,
			min_order: 0,
			include_allsky: true,
			include_moc: true,
			sample_mode: SampleMode::Bilinear,
		}
	}
}

/// Derives `maxOrder` from the source extent and tile width when the caller
/// does not supply one: `min(13, max(0, ceil(log2(max(w,h)/tileWidth))))`.
#[must_use]
pub fn derive_max_order(source_width: usize, source_height: usize, tile_width: usize) -> u8 {
	let ratio = source_width.max(source_height) as f64 / tile_width as f64;
	let order = if ratio <= 1.0 { 0.0 } else { ratio.log2().ceil() };
	order.clamp(0.0, 13.0) as u8
}

/// Runs the pyramid builder algorithm against one [`StorageTarget`].
pub struct Builder {
	storage: Arc<dyn StorageTarget>,
	cancellation: CancellationHandle,
}

impl Builder {
	#[must_use]
	pub fn new(storage: Arc<dyn StorageTarget>, cancellation: CancellationHandle) -> Self {
		Self { storage, cancellation }
	}

	/// Runs the full build algorithm and returns the emitted
	/// `properties` descriptor.
	pub async fn build(&self, source_bytes: &[u8], opts: &BuildOptions) -> Result<Properties> {
		ensure!(!opts.formats.is_empty(), "at least one tile format is required");
		ensure!(opts.tile_width.is_power_of_two(), "tile_width must be a power of two");

		let (image, source_wcs, frame) = read_source(source_bytes).context("reading source image")?;
		let max_order = opts
			.max_order
			.unwrap_or_else(|| derive_max_order(image.width, image.height, opts.tile_width));
		ensure!(opts.min_order <= max_order, "min_order must not exceed max_order");

		let depth = image.depth;
		let is_cube = depth > 1;
		log::info!("building pyramid: max_order={max_order} tile_width={} depth={depth}", opts.tile_width);

		let npix = healpix::npix(max_order);
		let progress = Mutex::new(get_progress_bar("reprojecting tiles", npix));

		let cells: Vec<(u64, Tile)> = (0..npix)
			.into_par_iter()
			.filter_map(|ipix| {
				self.cancellation.check().ok()?;
				let tile = reproject_cell(&image, &source_wcs, frame, ipix, max_order, opts.tile_width, depth, opts.sample_mode).ok()?;
				progress.lock().expect("progress lock poisoned").inc(1);
				if Tile::finite_range(&tile.samples).is_none() { None } else { Some((ipix, tile)) }
			})
			.collect();
		progress.into_inner().expect("progress lock poisoned").finish();

		let mut coverage = CoverageMap::new(max_order);
		for &(ipix, _) in &cells {
			coverage.insert(ipix);
		}

		let mut current: HashMap<u64, Tile> = cells.into_iter().collect();
		self.persist_order(max_order, &current, frame, &opts.formats).await?;

		let mut order3_tiles: Option<HashMap<u64, Tile>> = (max_order == 3).then(|| current.clone());

		for order in (opts.min_order..max_order).rev() {
			self.cancellation.check()?;
			let mut progress = get_progress_bar(&format!("aggregating order {order}"), 1);

			let next = aggregate_order(&current, opts.tile_width, depth);
			self.persist_order(order, &next, frame, &opts.formats).await?;

			if order == 3 {
				order3_tiles = Some(next.clone());
			}
			current = next;
			progress.set_position(1);
			progress.finish();
		}

		let mut allsky_restriction = None;
		if opts.include_allsky {
			if let Some(order3) = &order3_tiles {
				let allsky_formats: Vec<TileEncoding> = if is_cube {
					vec![TileEncoding::FloatImage]
				} else {
					opts.formats.clone()
				};
				if is_cube && opts.formats.iter().any(TileEncoding::is_lossy) {
					allsky_restriction = Some("float_only_for_cube".to_string());
				}
				self.persist_allsky(order3, opts.tile_width, depth, frame, &allsky_formats).await?;
			} else {
				log::warn!("skipping Allsky synthesis: order 3 is outside [{}, {max_order}]", opts.min_order);
			}
		}

		if opts.include_moc {
			let blob = coverage.to_blob();
			self.storage.write_binary("Moc.fits", blob.into_vec()).await.context("writing Moc.fits")?;
		}

		let properties = build_properties(opts, max_order, frame, is_cube, depth, allsky_restriction);
		self
			.storage
			.write_text("properties", &properties.to_string())
			.await
			.context("writing properties")?;
		Ok(properties)
	}

	/// Encodes every declared format for every tile in `tiles` (parallel,
	/// pure) then persists each through the storage target (sequential —
	/// `StorageTarget` is not assumed to tolerate concurrent writers).
	async fn persist_order(&self, order: u8, tiles: &HashMap<u64, Tile>, frame: Frame, formats: &[TileEncoding]) -> Result<()> {
		let encoded: Vec<Vec<(PathBuf, Vec<u8>)>> = tiles
			.par_iter()
			.map(|(&ipix, tile)| -> Result<Vec<(PathBuf, Vec<u8>)>> {
				formats
					.iter()
					.map(|&encoding| {
						let key = TileKey::new(order, ipix, frame, encoding)?;
						let bytes = hips_image::encode(&key, &tile.samples, tile.width, tile.depth)?;
						Ok((path::tile_path(&key), bytes))
					})
					.collect()
			})
			.collect::<Result<Vec<_>>>()?;

		for (rel_path, bytes) in encoded.into_iter().flatten() {
			self.cancellation.check()?;
			self
				.storage
				.write_binary(&rel_path.to_string_lossy(), bytes)
				.await
				.with_context(|| format!("writing {}", rel_path.display()))?;
		}
		Ok(())
	}

	async fn persist_allsky(&self, order3: &HashMap<u64, Tile>, tile_width: usize, depth: usize, frame: Frame, formats: &[TileEncoding]) -> Result<()> {
		let mosaic = synthesize_allsky(order3, tile_width, depth);
		for &encoding in formats {
			let key = TileKey::new(3, 0, frame, encoding)?;
			let bytes = hips_image::encode(&key, &mosaic.samples, mosaic.width, mosaic.depth)?;
			let rel_path = path::allsky_path(3, encoding);
			self
				.storage
				.write_binary(&rel_path.to_string_lossy(), bytes)
				.await
				.with_context(|| format!("writing {}", rel_path.display()))?;
		}
		Ok(())
	}
}

#[allow(clippy::too_many_arguments)]
fn reproject_cell(
	image: &crate::source::SourceImage,
	source_wcs: &hips_core::Wcs,
	frame: Frame,
	ipix: u64,
	order: u8,
	tile_width: usize,
	depth: usize,
	mode: SampleMode,
) -> Result<Tile> {
	let mut samples = Vec::with_capacity(tile_width * tile_width * depth);
	for plane_index in 0..depth {
		let key = TileKey::new(order, ipix, frame, TileEncoding::FloatImage)?;
		let plane = reproject_plane_to_tile(image.plane(plane_index), image.width, image.height, source_wcs, &key, tile_width, mode)?;
		samples.extend(plane);
	}
	Tile::new(tile_width, depth, samples)
}

/// Composes each complete quadruple of order `o+1` children into a `2w x 2w`
/// mosaic (children placed by nested child index, `dx = i & 1, dy = i >> 1`)
/// and downsamples it back down to `w x w`.
fn aggregate_order(children_level: &HashMap<u64, Tile>, tile_width: usize, depth: usize) -> HashMap<u64, Tile> {
	let mut by_parent: HashMap<u64, Vec<(u64, &Tile)>> = HashMap::new();
	for (&ipix, tile) in children_level {
		by_parent.entry(ipix / 4).or_default().push((ipix, tile));
	}

	by_parent
		.into_par_iter()
		.filter_map(|(parent_ipix, mut children)| {
			if children.len() != 4 {
				return None;
			}
			children.sort_by_key(|(ipix, _)| *ipix);

			let mosaic_w = tile_width * 2;
			let mut samples = Vec::with_capacity(tile_width * tile_width * depth);
			for plane_index in 0..depth {
				let mut mosaic = vec![f32::NAN; mosaic_w * mosaic_w];
				for (i, (_, child)) in children.iter().enumerate() {
					let dx = (i & 1) * tile_width;
					let dy = (i >> 1) * tile_width;
					let plane = child.plane(plane_index);
					for y in 0..tile_width {
						for x in 0..tile_width {
							mosaic[(dy + y) * mosaic_w + dx + x] = plane[y * tile_width + x];
						}
					}
				}
				samples.extend(downsample(&mosaic, mosaic_w, mosaic_w, DownsampleMode::Mean));
			}

			let tile = Tile::new(tile_width, depth, samples).ok()?;
			if Tile::finite_range(&tile.samples).is_none() { None } else { Some((parent_ipix, tile)) }
		})
		.collect()
}

/// Lays out all order-3 cells into a single square mosaic (`ceil(sqrt(npix))`
/// tiles per side; unpopulated cells and the grid's trailing slots are
/// non-finite) — a simple, convention-free stand-in for the real HiPS
/// Allsky layout, whose exact packing convention is left unspecified here.
fn synthesize_allsky(order3_tiles: &HashMap<u64, Tile>, tile_width: usize, depth: usize) -> Tile {
	let npix = healpix::npix(3) as usize;
	let cols = (npix as f64).sqrt().ceil() as usize;
	let mosaic_w = cols * tile_width;

	let mut samples = vec![f32::NAN; mosaic_w * mosaic_w * depth];
	for ipix in 0..npix as u64 {
		let Some(tile) = order3_tiles.get(&ipix) else { continue };
		let col = ipix as usize % cols;
		let row = ipix as usize / cols;
		for plane_index in 0..depth {
			let plane = tile.plane(plane_index);
			let plane_offset = plane_index * mosaic_w * mosaic_w;
			for y in 0..tile_width {
				for x in 0..tile_width {
					let gx = col * tile_width + x;
					let gy = row * tile_width + y;
					samples[plane_offset + gy * mosaic_w + gx] = plane[y * tile_width + x];
				}
			}
		}
	}
	Tile::new(mosaic_w, depth, samples).expect("mosaic buffer sized exactly")
}

fn build_properties(opts: &BuildOptions, max_order: u8, frame: Frame, is_cube: bool, depth: usize, allsky_restriction: Option<String>) -> Properties {
	let mut properties = Properties::new();
	properties.set("creator_did", opts.creator_did.clone());
	properties.set("hips_frame", frame.to_string());
	properties.set("hips_order", max_order.to_string());
	properties.set("hips_order_min", opts.min_order.to_string());
	properties.set("hips_tile_width", opts.tile_width.to_string());
	let formats = opts.formats.iter().map(TileEncoding::extension).collect::<Vec<_>>().join(" ");
	properties.set("hips_tile_format", formats);
	if is_cube {
		properties.set("dataproduct_type", "cube");
		properties.set("hips_cube_depth", depth.to_string());
	}
	if let Some(restriction) = allsky_restriction {
		properties.set("hips_allsky_restriction", restriction);
	}
	properties
}

#[cfg(test)]
mod tests {
	use super::*;
	use hips_container::MemoryStorage;
	use hips_core::container::write_float_container;
	use hips_core::container::{KeywordRecord, KeywordValue};

	fn flat_source(width: i64, height: i64, value: f32) -> Vec<u8> {
		let records = vec![
			KeywordRecord::new("SIMPLE", KeywordValue::Bool(true)).unwrap(),
			KeywordRecord::new("BITPIX", KeywordValue::Int(-32)).unwrap(),
			KeywordRecord::new("NAXIS", KeywordValue::Int(2)).unwrap(),
			KeywordRecord::new("NAXIS1", KeywordValue::Int(width)).unwrap(),
			KeywordRecord::new("NAXIS2", KeywordValue::Int(height)).unwrap(),
			KeywordRecord::new("CTYPE1", KeywordValue::Str("RA---CAR".into())).unwrap(),
			KeywordRecord::new("CTYPE2", KeywordValue::Str("DEC--CAR".into())).unwrap(),
			KeywordRecord::new("CRPIX1", KeywordValue::Float(width as f64 / 2.0 + 0.5)).unwrap(),
			KeywordRecord::new("CRPIX2", KeywordValue::Float(height as f64 / 2.0 + 0.5)).unwrap(),
			KeywordRecord::new("CRVAL1", KeywordValue::Float(0.0)).unwrap(),
			KeywordRecord::new("CRVAL2", KeywordValue::Float(0.0)).unwrap(),
			KeywordRecord::new("CDELT1", KeywordValue::Float(-0.1)).unwrap(),
			KeywordRecord::new("CDELT2", KeywordValue::Float(0.1)).unwrap(),
		];
		let samples = vec![value; (width * height) as usize];
		write_float_container(&records, &samples).unwrap().into_vec()
	}

	#[test]
	fn derives_max_order_from_extent_and_tile_width() {
		assert_eq!(derive_max_order(32, 16, 32), 0);
		assert_eq!(derive_max_order(64, 32, 32), 1);
		assert_eq!(derive_max_order(1_000_000, 1, 32), 13);
	}

	#[tokio::test]
	async fn builds_a_minimal_pyramid_and_emits_properties() -> Result<()> {
		let storage = Arc::new(MemoryStorage::new());
		let builder = Builder::new(storage.clone(), CancellationHandle::new());
		let source = flat_source(16, 16, 42.0);

		let opts = BuildOptions {
			tile_width: 8,
			max_order: Some(0),
			min_order: 0,
			..Default::default()
		};
		let properties = builder.build(&source, &opts).await?;

		assert_eq!(properties.get("hips_order"), Some("0"));
		assert!(storage.exists("properties").await?);
		assert!(storage.exists("Moc.fits").await?);
		Ok(())
	}
}
