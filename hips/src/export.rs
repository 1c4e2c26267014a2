//! The export engine: produces one of {single-tile image, full-sphere
//! map image, rectilinear cutout image} from a pyramid, built on the pyramid
//! reader and the reprojection kernels. Exactly one mode is
//! selected per call.

use anyhow::{Context, Result, ensure};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use hips_container::PyramidReader;
use hips_core::container::{KeywordRecord, KeywordValue, int_record, write_float_container};
use hips_core::{CancellationHandle, Frame, TileEncoding, TileKey, Wcs, healpix};
use hips_image::Tile;

use crate::reproject::{SampleMode, sample};
use crate::remote_cutout::RemoteCutoutService;

/// HEALPix cell ordering for a full-sphere map export.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MapOrdering {
	Nested,
	Ring,
}

impl MapOrdering {
	#[must_use]
	fn as_fits_str(&self) -> &'static str {
		match self {
			MapOrdering::Nested => "NESTED",
			MapOrdering::Ring => "RING",
		}
	}
}

/// Reads tile `(order, ipix)` and re-encodes it as a `floatImage` container
/// carrying the synthesized tile WCS. The output equals the original
/// bytes only when the source tile was itself `floatImage` — the decode step
/// is lossy for `bytePng`/`byteJpeg` sources.
pub async fn export_tile(reader: &PyramidReader, order: u8, ipix: u64, cancellation: &CancellationHandle) -> Result<Vec<u8>> {
	cancellation.check()?;
	let frame = reader.properties().await?.frame()?;
	let tile = reader.read_tile(order, ipix, None).await?;
	let key = TileKey::new(order, ipix, frame, TileEncoding::FloatImage)?;
	hips_image::encode(&key, &tile.samples, tile.width, tile.depth)
}

/// Exports a full-sphere sampled map at `order` (default `hips_order`) in the
/// requested cell ordering. Each destination sample is the arithmetic mean of
/// its tile's finite samples; cells whose read fails are left non-finite
/// (the map exporter recovers locally, unlike the tile/cutout
/// exporters).
pub async fn export_map(reader: &PyramidReader, order: Option<u8>, ordering: MapOrdering, cancellation: &CancellationHandle) -> Result<Vec<u8>> {
	let properties = reader.properties().await?;
	let frame = properties.frame()?;
	let order = match order {
		Some(o) => o,
		None => properties.max_order()?,
	};
	let npix = healpix::npix(order);

	let mut dest = vec![f32::NAN; npix as usize];
	for ipix in 0..npix {
		cancellation.check()?;
		let Ok(tile) = reader.read_tile(order, ipix, None).await else {
			continue;
		};
		let finite: Vec<f64> = tile.plane(0).iter().copied().filter(|v| v.is_finite()).map(f64::from).collect();
		if finite.is_empty() {
			continue;
		}
		let mean = (finite.iter().sum::<f64>() / finite.len() as f64) as f32;
		let dest_ipix = match ordering {
			MapOrdering::Nested => ipix,
			MapOrdering::Ring => healpix::nest_to_ring(order, ipix)?,
		};
		dest[dest_ipix as usize] = mean;
	}

	let records = vec![
		KeywordRecord::new("XTENSION", KeywordValue::Str("BINTABLE".to_string()))?,
		int_record("BITPIX", 8)?,
		int_record("NAXIS", 2)?,
		int_record("NAXIS1", 4)?,
		int_record("NAXIS2", npix as i64)?,
		int_record("PCOUNT", 0)?,
		int_record("GCOUNT", 1)?,
		int_record("TFIELDS", 1)?,
		KeywordRecord::new("TTYPE1", KeywordValue::Str("MAP".to_string()))?,
		KeywordRecord::new("TFORM1", KeywordValue::Str("E".to_string()))?,
		KeywordRecord::new("ORDERING", KeywordValue::Str(ordering.as_fits_str().to_string()))?,
		KeywordRecord::new("INDXSCHM", KeywordValue::Str("IMPLICIT".to_string()))?,
		int_record("NSIDE", healpix::nside(order) as i64)?,
		int_record("FIRSTPIX", 0)?,
		int_record("LASTPIX", npix as i64 - 1)?,
		KeywordRecord::new("COORDSYS", KeywordValue::Str(frame.as_fits_letter().to_string()))?,
	];
	Ok(write_float_container(&records, &dest)?.into_vec())
}

/// Parameters for a rectilinear cutout export, built from caller-supplied
/// sky geometry rather than an explicit keyword map.
#[derive(Clone, Debug)]
pub struct CutoutParams {
	pub width: usize,
	pub height: usize,
	pub ra: f64,
	pub dec: f64,
	pub fov: f64,
	pub projection: String,
	pub rotation_angle: f64,
	pub sample_mode: SampleMode,
}

impl CutoutParams {
	fn target_wcs(&self) -> Result<Wcs> {
		let scale = self.fov / (self.width.max(self.height) as f64);
		let crpix1 = self.width as f64 / 2.0 + 0.5;
		let crpix2 = self.height as f64 / 2.0 + 0.5;
		Wcs::from_cdelt_crota(crpix1, crpix2, self.ra, self.dec, -scale, scale, self.rotation_angle)
	}
}

fn axis_tokens(frame: Frame, projection: &str) -> (String, String) {
	let projection = projection.to_ascii_uppercase();
	match frame {
		Frame::Equatorial => (format!("RA---{projection}"), format!("DEC--{projection}")),
		Frame::Galactic => (format!("GLON-{projection}"), format!("GLAT-{projection}")),
		Frame::Ecliptic => (format!("ELON-{projection}"), format!("ELAT-{projection}")),
	}
}

/// Bounded `ipix -> decoded tile` cache for the cutout exporter, instance
/// local per export call: accesses most-recently-used cells stay resident
/// without an external LRU dependency, the same hand-rolled-utility idiom
/// used elsewhere in this crate for small one-off concerns (the terminal
/// progress bar) rather than reaching for another crate.
struct TileCache<'a> {
	reader: &'a PyramidReader,
	capacity: usize,
	tiles: HashMap<u64, Arc<Tile>>,
	order: VecDeque<u64>,
}

impl<'a> TileCache<'a> {
	fn new(reader: &'a PyramidReader, capacity: usize) -> Self {
		Self {
			reader,
			capacity,
			tiles: HashMap::new(),
			order: VecDeque::new(),
		}
	}

	async fn get(&mut self, max_order: u8, ipix: u64) -> Result<Arc<Tile>> {
		if let Some(tile) = self.tiles.get(&ipix) {
			self.order.retain(|&i| i != ipix);
			self.order.push_back(ipix);
			return Ok(tile.clone());
		}

		let tile = Arc::new(self.reader.read_tile(max_order, ipix, None).await?);
		if self.tiles.len() >= self.capacity
			&& let Some(evicted) = self.order.pop_front()
		{
			self.tiles.remove(&evicted);
		}
		self.tiles.insert(ipix, tile.clone());
		self.order.push_back(ipix);
		Ok(tile)
	}
}

/// Default per-export cutout tile cache size.
const DEFAULT_CUTOUT_CACHE_CAPACITY: usize = 64;

/// Builds a cutout purely from the local reader: each output pixel's world
/// coordinates are located in the pyramid's max-order HEALPix grid, the
/// containing tile is decoded (via the LRU cache) and sampled.
pub async fn export_cutout(reader: &PyramidReader, params: &CutoutParams, cancellation: &CancellationHandle) -> Result<Vec<u8>> {
	ensure!(params.width > 0 && params.height > 0, "cutout width/height must be positive");

	let properties = reader.properties().await?;
	let frame = properties.frame()?;
	let max_order = properties.max_order()?;
	let tile_width = properties.tile_width()?;

	let wcs = params.target_wcs()?;
	let mut cache = TileCache::new(reader, DEFAULT_CUTOUT_CACHE_CAPACITY);

	let mut samples = vec![f32::NAN; params.width * params.height];
	for y in 0..params.height {
		cancellation.check()?;
		for x in 0..params.width {
			let (lon, lat) = wcs.pixel_to_world(x as f64 + 1.0, y as f64 + 1.0);
			let Ok(ipix) = healpix::ang2pix(max_order, lon.to_radians(), lat.to_radians()) else {
				continue;
			};
			let Ok(tile) = cache.get(max_order, ipix).await else {
				continue;
			};
			let key = TileKey::new(max_order, ipix, frame, TileEncoding::FloatImage)?;
			let tile_wcs = Wcs::for_tile(&key, tile_width)?;
			let value = match tile_wcs.world_to_pixel(lon, lat) {
				Ok((tx, ty)) => sample(tile.plane(0), tile_width, tile_width, tx - 1.0, ty - 1.0, params.sample_mode, f32::NAN),
				Err(_) => f32::NAN,
			};
			samples[y * params.width + x] = value;
		}
	}

	let (ctype1, ctype2) = axis_tokens(frame, &params.projection);
	let records = vec![
		KeywordRecord::new("SIMPLE", KeywordValue::Bool(true))?,
		int_record("BITPIX", -32)?,
		int_record("NAXIS", 2)?,
		int_record("NAXIS1", params.width as i64)?,
		int_record("NAXIS2", params.height as i64)?,
		KeywordRecord::new("CTYPE1", KeywordValue::Str(ctype1))?,
		KeywordRecord::new("CTYPE2", KeywordValue::Str(ctype2))?,
		KeywordRecord::new("CRPIX1", KeywordValue::Float(wcs.crpix1))?,
		KeywordRecord::new("CRPIX2", KeywordValue::Float(wcs.crpix2))?,
		KeywordRecord::new("CRVAL1", KeywordValue::Float(wcs.crval1))?,
		KeywordRecord::new("CRVAL2", KeywordValue::Float(wcs.crval2))?,
		KeywordRecord::new("CD1_1", KeywordValue::Float(wcs.cd[0][0]))?,
		KeywordRecord::new("CD1_2", KeywordValue::Float(wcs.cd[0][1]))?,
		KeywordRecord::new("CD2_1", KeywordValue::Float(wcs.cd[1][0]))?,
		KeywordRecord::new("CD2_2", KeywordValue::Float(wcs.cd[1][1]))?,
		int_record("HIPSORD", i64::from(max_order))?,
		int_record("HIPSFWID", tile_width as i64)?,
	];
	Ok(write_float_container(&records, &samples)?.into_vec())
}

/// Which collaborator serves a cutout request ("Backend
/// selection"). `Auto` needs an already-constructed remote service plus the
/// pyramid id the remote side should resolve.
pub enum ExportBackend {
	Local,
	Remote { service: RemoteCutoutService, hips_id: String },
	Auto { remote: Option<(RemoteCutoutService, String)> },
}

/// Runs a cutout export through the backend selected by `backend`: `Local`
/// always uses the reader, `Remote` always calls the external service,
/// `Auto` prefers local and falls back to remote only if configured,
/// otherwise re-raising the local error verbatim.
pub async fn export_cutout_with_backend(reader: &PyramidReader, params: &CutoutParams, backend: &ExportBackend, cancellation: &CancellationHandle) -> Result<Vec<u8>> {
	match backend {
		ExportBackend::Local => export_cutout(reader, params, cancellation).await,
		ExportBackend::Remote { service, hips_id } => {
			let frame = reader.properties().await?.frame()?;
			service.fetch_cutout(hips_id, params, frame)
		}
		ExportBackend::Auto { remote } => match export_cutout(reader, params, cancellation).await {
			Ok(bytes) => Ok(bytes),
			Err(local_err) => match remote {
				Some((service, hips_id)) => {
					let frame = reader.properties().await?.frame()?;
					service
						.fetch_cutout(hips_id, params, frame)
						.with_context(|| format!("local cutout export failed ({local_err}); remote fallback also failed"))
				}
				None => Err(local_err),
			},
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hips_container::{HipsSource, MemoryStorage};
	use hips_core::path;
	use pretty_assertions::assert_eq;
	use std::sync::Arc as StdArc;

	fn seed_pyramid() -> StdArc<MemoryStorage> {
		let storage = StdArc::new(MemoryStorage::new());
		storage.seed(
			"properties",
			"creator_did = ivo://example.org/hips/survey\n\
			 hips_frame = equatorial\n\
			 hips_order = 1\n\
			 hips_tile_width = 4\n\
			 hips_tile_format = float\n",
		);
		for ipix in 0..healpix::npix(1) {
			let key = TileKey::new(1, ipix, Frame::Equatorial, TileEncoding::FloatImage).unwrap();
			let pixels = vec![ipix as f32; 16];
			let bytes = hips_image::encode(&key, &pixels, 4, 1).unwrap();
			storage.seed(path::tile_path(&key).to_string_lossy().as_ref(), bytes);
		}
		storage
	}

	#[tokio::test]
	async fn export_tile_reencodes_as_float_image() -> Result<()> {
		let storage = seed_pyramid();
		let reader = PyramidReader::new(HipsSource::Custom(storage))?;
		let bytes = export_tile(&reader, 1, 3, &CancellationHandle::new()).await?;
		let decoded = hips_image::decode(&TileKey::new(1, 3, Frame::Equatorial, TileEncoding::FloatImage)?, &bytes)?;
		assert_eq!(decoded.samples, vec![3.0f32; 16]);
		Ok(())
	}

	#[tokio::test]
	async fn export_map_at_order_one_fills_every_populated_cell() -> Result<()> {
		let storage = seed_pyramid();
		let reader = PyramidReader::new(HipsSource::Custom(storage))?;
		let bytes = export_map(&reader, Some(1), MapOrdering::Nested, &CancellationHandle::new()).await?;

		let records = hips_core::container::read_header_records(&bytes)?;
		let naxis2 = records.iter().find(|r| r.keyword == "NAXIS2").unwrap();
		assert_eq!(naxis2.value, KeywordValue::Int(healpix::npix(1) as i64));
		Ok(())
	}

	#[tokio::test]
	async fn export_map_ring_ordering_permutes_samples_by_nest_to_ring() -> Result<()> {
		let storage = seed_pyramid();
		let reader = PyramidReader::new(HipsSource::Custom(storage))?;
		let nested_bytes = export_map(&reader, Some(1), MapOrdering::Nested, &CancellationHandle::new()).await?;
		let ring_bytes = export_map(&reader, Some(1), MapOrdering::Ring, &CancellationHandle::new()).await?;

		let records = hips_core::container::read_header_records(&nested_bytes)?;
		let header_len = hips_core::container::padded_len((records.len() + 1) * hips_core::container::RECORD_LEN);
		let npix = healpix::npix(1) as usize;

		let nested_samples: Vec<f32> = nested_bytes[header_len..header_len + npix * 4]
			.chunks_exact(4)
			.map(|c| f32::from_be_bytes(c.try_into().unwrap()))
			.collect();
		let ring_samples: Vec<f32> = ring_bytes[header_len..header_len + npix * 4]
			.chunks_exact(4)
			.map(|c| f32::from_be_bytes(c.try_into().unwrap()))
			.collect();

		for ipix in 0..npix as u64 {
			let ring_index = healpix::nest_to_ring(1, ipix)? as usize;
			assert_eq!(ring_samples[ring_index], nested_samples[ipix as usize]);
		}
		Ok(())
	}

	#[tokio::test]
	async fn export_cutout_produces_requested_dimensions() -> Result<()> {
		let storage = seed_pyramid();
		let reader = PyramidReader::new(HipsSource::Custom(storage))?;
		let params = CutoutParams {
			width: 8,
			height: 4,
			ra: 0.0,
			dec: 0.0,
			fov: 10.0,
			projection: "TAN".to_string(),
			rotation_angle: 0.0,
			sample_mode: SampleMode::Nearest,
		};
		let bytes = export_cutout(&reader, &params, &CancellationHandle::new()).await?;
		let records = hips_core::container::read_header_records(&bytes)?;
		assert_eq!(records.iter().find(|r| r.keyword == "NAXIS1").unwrap().value, KeywordValue::Int(8));
		assert_eq!(records.iter().find(|r| r.keyword == "NAXIS2").unwrap().value, KeywordValue::Int(4));
		assert_eq!(records.iter().find(|r| r.keyword == "HIPSORD").unwrap().value, KeywordValue::Int(1));
		assert_eq!(records.iter().find(|r| r.keyword == "HIPSFWID").unwrap().value, KeywordValue::Int(4));
		Ok(())
	}

	#[tokio::test]
	async fn auto_backend_falls_back_to_local_error_without_a_configured_remote() -> Result<()> {
		let storage = StdArc::new(MemoryStorage::new());
		let reader = PyramidReader::new(HipsSource::Custom(storage))?;
		let params = CutoutParams {
			width: 2,
			height: 2,
			ra: 0.0,
			dec: 0.0,
			fov: 1.0,
			projection: "TAN".to_string(),
			rotation_angle: 0.0,
			sample_mode: SampleMode::Nearest,
		};
		let backend = ExportBackend::Auto { remote: None };
		let result = export_cutout_with_backend(&reader, &params, &backend, &CancellationHandle::new()).await;
		assert!(result.is_err());
		Ok(())
	}
}
