use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use hips::builder::{BuildOptions, Builder};
use hips::export::{CutoutParams, ExportBackend, MapOrdering, export_cutout_with_backend, export_map, export_tile};
use hips::remote_cutout::RemoteCutoutService;
use hips::reproject::SampleMode;
use hips_container::{DirectoryStorage, HipsSource, PyramidReader, lint_pyramid};
use hips_core::{CancellationHandle, TileEncoding};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Build a HiPS tile pyramid from a source FITS-like image
	Build(BuildArgs),

	/// Export an artifact from an existing pyramid
	#[command(subcommand)]
	Export(ExportCommands),

	/// Check a local pyramid's structure against its declared properties
	Lint(LintArgs),
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
struct BuildArgs {
	/// Source image file (image container codec)
	input_file: PathBuf,

	/// Destination directory the pyramid is written to
	output_dir: PathBuf,

	/// Creator identifier recorded as `creator_did`
	#[arg(long, default_value = "ivo://anonymous/hips")]
	creator_did: String,

	/// Tile edge length; must be a power of two
	#[arg(long, default_value_t = 512)]
	tile_width: usize,

	/// Tile formats to emit, in preference order (defaults to `float` alone)
	#[arg(long, value_enum, value_delimiter = ',')]
	format: Vec<TileFormatArg>,

	/// Highest HEALPix order to generate tiles at; derived from the source
	/// image when absent
	#[arg(long)]
	max_order: Option<u8>,

	/// Lowest HEALPix order tiles are aggregated down to
	#[arg(long, default_value_t = 0)]
	min_order: u8,

	/// Skip synthesizing the `Norder3/Allsky.<ext>` mosaic
	#[arg(long)]
	no_allsky: bool,

	/// Skip writing the `Moc.fits` coverage map
	#[arg(long)]
	no_moc: bool,

	/// Resampling mode used when reprojecting the source image into tiles
	#[arg(long, value_enum, default_value = "bilinear")]
	sample_mode: SampleModeArg,
}

#[derive(Subcommand, Debug)]
enum ExportCommands {
	/// Re-encode a single pyramid tile as a floatImage container
	Tile(ExportTileArgs),

	/// Export a full-sphere sampled map at a chosen order and ordering
	Map(ExportMapArgs),

	/// Sample a rectilinear cutout from a pyramid through its WCS
	Cutout(ExportCutoutArgs),
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
struct PyramidSourceArgs {
	/// Local pyramid directory, or an `http(s)://` base URL for a remote root
	pyramid: String,
}

impl PyramidSourceArgs {
	fn reader(&self) -> Result<PyramidReader> {
		let source = if self.pyramid.starts_with("http://") || self.pyramid.starts_with("https://") {
			HipsSource::RemoteRoot(self.pyramid.clone())
		} else {
			HipsSource::LocalRoot(PathBuf::from(&self.pyramid))
		};
		PyramidReader::new(source)
	}
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
struct ExportTileArgs {
	#[command(flatten)]
	pyramid: PyramidSourceArgs,

	/// HEALPix order of the tile to export
	order: u8,

	/// HEALPix NESTED pixel index of the tile to export
	ipix: u64,

	/// Destination file for the re-encoded floatImage container
	output_file: PathBuf,
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
struct ExportMapArgs {
	#[command(flatten)]
	pyramid: PyramidSourceArgs,

	/// Destination file for the binary-table map container
	output_file: PathBuf,

	/// HEALPix order of the map; defaults to the pyramid's declared `hips_order`
	#[arg(long)]
	order: Option<u8>,

	/// HEALPix cell ordering of the output vector
	#[arg(long, value_enum, default_value = "nested")]
	ordering: OrderingArg,
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
struct ExportCutoutArgs {
	#[command(flatten)]
	pyramid: PyramidSourceArgs,

	/// Destination file for the cutout image container
	output_file: PathBuf,

	#[arg(long, default_value_t = 512)]
	width: usize,

	#[arg(long, default_value_t = 512)]
	height: usize,

	/// Right ascension / longitude of the cutout centre, in degrees
	#[arg(long)]
	ra: f64,

	/// Declination / latitude of the cutout centre, in degrees
	#[arg(long)]
	dec: f64,

	/// Field of view along the cutout's longer edge, in degrees
	#[arg(long)]
	fov: f64,

	/// WCS projection token, e.g. `TAN`, `CAR`, `SIN`
	#[arg(long, default_value = "TAN")]
	projection: String,

	#[arg(long, default_value_t = 0.0)]
	rotation_angle: f64,

	#[arg(long, value_enum, default_value = "bilinear")]
	sample_mode: SampleModeArg,

	/// Remote cutout service to fall back to if the local export fails
	#[arg(long)]
	remote_cutout_url: Option<String>,

	/// Pyramid id the remote cutout service should resolve
	#[arg(long)]
	remote_hips_id: Option<String>,

	/// Always use the remote cutout service instead of the local reader
	#[arg(long)]
	remote_only: bool,
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
struct LintArgs {
	/// Local pyramid directory to walk and check
	pyramid_dir: PathBuf,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TileFormatArg {
	Float,
	Png,
	Jpeg,
}

impl From<TileFormatArg> for TileEncoding {
	fn from(value: TileFormatArg) -> Self {
		match value {
			TileFormatArg::Float => TileEncoding::FloatImage,
			TileFormatArg::Png => TileEncoding::BytePng,
			TileFormatArg::Jpeg => TileEncoding::ByteJpeg,
		}
	}
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SampleModeArg {
	Nearest,
	Bilinear,
	Bicubic,
}

impl From<SampleModeArg> for SampleMode {
	fn from(value: SampleModeArg) -> Self {
		match value {
			SampleModeArg::Nearest => SampleMode::Nearest,
			SampleModeArg::Bilinear => SampleMode::Bilinear,
			SampleModeArg::Bicubic => SampleMode::Bicubic,
		}
	}
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderingArg {
	Nested,
	Ring,
}

impl From<OrderingArg> for MapOrdering {
	fn from(value: OrderingArg) -> Self {
		match value {
			OrderingArg::Nested => MapOrdering::Nested,
			OrderingArg::Ring => MapOrdering::Ring,
		}
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("building the async runtime")?
		.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
	match cli.command {
		Commands::Build(args) => run_build(args).await,
		Commands::Export(ExportCommands::Tile(args)) => run_export_tile(args).await,
		Commands::Export(ExportCommands::Map(args)) => run_export_map(args).await,
		Commands::Export(ExportCommands::Cutout(args)) => run_export_cutout(args).await,
		Commands::Lint(args) => run_lint(&args),
	}
}

async fn run_build(args: BuildArgs) -> Result<()> {
	let source_bytes = fs::read(&args.input_file).with_context(|| format!("reading {:?}", args.input_file))?;
	let storage = Arc::new(DirectoryStorage::new(
		args.output_dir
			.canonicalize()
			.or_else(|_| std::path::absolute(&args.output_dir))
			.with_context(|| format!("resolving {:?}", args.output_dir))?,
	)?);

	let formats: Vec<TileEncoding> = if args.format.is_empty() {
		vec![TileEncoding::FloatImage]
	} else {
		args.format.into_iter().map(TileEncoding::from).collect()
	};
	let opts = BuildOptions {
		creator_did: args.creator_did,
		tile_width: args.tile_width,
		formats,
		max_order: args.max_order,
		min_order: args.min_order,
		include_allsky: !args.no_allsky,
		include_moc: !args.no_moc,
		sample_mode: args.sample_mode.into(),
	};

	let builder = Builder::new(storage, CancellationHandle::new());
	let properties = builder.build(&source_bytes, &opts).await?;
	log::info!("wrote pyramid to {:?}", args.output_dir);
	println!("{properties}");
	Ok(())
}

async fn run_export_tile(args: ExportTileArgs) -> Result<()> {
	let reader = args.pyramid.reader()?;
	let bytes = export_tile(&reader, args.order, args.ipix, &CancellationHandle::new()).await?;
	fs::write(&args.output_file, bytes).with_context(|| format!("writing {:?}", args.output_file))?;
	Ok(())
}

async fn run_export_map(args: ExportMapArgs) -> Result<()> {
	let reader = args.pyramid.reader()?;
	let bytes = export_map(&reader, args.order, args.ordering.into(), &CancellationHandle::new()).await?;
	fs::write(&args.output_file, bytes).with_context(|| format!("writing {:?}", args.output_file))?;
	Ok(())
}

async fn run_export_cutout(args: ExportCutoutArgs) -> Result<()> {
	let reader = args.pyramid.reader()?;
	let params = CutoutParams {
		width: args.width,
		height: args.height,
		ra: args.ra,
		dec: args.dec,
		fov: args.fov,
		projection: args.projection,
		rotation_angle: args.rotation_angle,
		sample_mode: args.sample_mode.into(),
	};

	let remote = match &args.remote_cutout_url {
		Some(url) => Some((RemoteCutoutService::new(url.clone(), None)?, args.remote_hips_id.clone().unwrap_or_default())),
		None => None,
	};
	let backend = if args.remote_only {
		let Some((service, hips_id)) = remote else {
			bail!("--remote-only requires --remote-cutout-url");
		};
		ExportBackend::Remote { service, hips_id }
	} else {
		ExportBackend::Auto { remote }
	};

	let bytes = export_cutout_with_backend(&reader, &params, &backend, &CancellationHandle::new()).await?;
	fs::write(&args.output_file, bytes).with_context(|| format!("writing {:?}", args.output_file))?;
	Ok(())
}

fn run_lint(args: &LintArgs) -> Result<()> {
	let issues = lint_pyramid(&args.pyramid_dir)?;
	for issue in &issues {
		let level = match issue.level {
			hips_container::LintLevel::Error => "error",
			hips_container::LintLevel::Warning => "warning",
		};
		if issue.path.is_empty() {
			println!("{level} [{}] {}", issue.code, issue.message);
		} else {
			println!("{level} [{}] {}: {}", issue.code, issue.path, issue.message);
		}
	}
	if issues.iter().any(|i| i.level == hips_container::LintLevel::Error) {
		bail!("{} lint error(s) found", issues.iter().filter(|i| i.level == hips_container::LintLevel::Error).count());
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
		Cli::try_parse_from(args)
	}

	#[test]
	fn help_mentions_the_binary_name() {
		let err = try_parse(&["hips"]).unwrap_err();
		assert!(err.to_string().contains("Usage: hips"));
	}

	#[test]
	fn build_subcommand_parses_required_positionals() {
		let cli = try_parse(&["hips", "build", "src.fits", "out_dir"]).unwrap();
		match cli.command {
			Commands::Build(args) => {
				assert_eq!(args.input_file, PathBuf::from("src.fits"));
				assert_eq!(args.output_dir, PathBuf::from("out_dir"));
				assert_eq!(args.tile_width, 512);
			}
			_ => panic!("expected Build"),
		}
	}

	#[test]
	fn export_cutout_subcommand_parses_sky_geometry() {
		let cli = try_parse(&[
			"hips",
			"export",
			"cutout",
			"pyramid_dir",
			"out.fits",
			"--ra",
			"10.5",
			"--dec",
			"-3.2",
			"--fov",
			"2.0",
		])
		.unwrap();
		match cli.command {
			Commands::Export(ExportCommands::Cutout(args)) => {
				assert_eq!(args.ra, 10.5);
				assert_eq!(args.dec, -3.2);
				assert_eq!(args.fov, 2.0);
			}
			_ => panic!("expected Export(Cutout)"),
		}
	}

	#[test]
	fn lint_subcommand_requires_a_directory() {
		assert!(try_parse(&["hips", "lint"]).is_err());
		let cli = try_parse(&["hips", "lint", "some_dir"]).unwrap();
		match cli.command {
			Commands::Lint(args) => assert_eq!(args.pyramid_dir, PathBuf::from("some_dir")),
			_ => panic!("expected Lint"),
		}
	}
}
