//! Sprite object studio CLI.
//!
//! Provides two subcommands mirroring the two conversion directions:
//! - `object`: convert a folder of `Frame-<f>-Layer-<l>.png` images into the
//!   chunk-addressed object representation.
//! - `frames`: convert an object folder back into layered frame images.
//!
//! # Usage
//!
//! ```bash
//! # Forward: frames folder -> object folder
//! chunkcel object sprites/hero
//!
//! # Forward over every subfolder, with overrides
//! chunkcel object sprites --bulk --min-density 0.25 --no-intra
//!
//! # Reverse: object folder -> frames folder
//! chunkcel frames sprites/hero/object --avoid-overlap chunk
//! ```
//!
//! Exit status is 0 on full success and 1 otherwise; failures are written to
//! stderr as `kind: message`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use walkdir::WalkDir;

use chunkcel_rs::prelude::*;

fn main() -> ExitCode {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let cli = Cli::parse();
	let result = match cli.command {
		Command::Object(opts) => run_object(opts),
		Command::Frames(opts) => run_frames(opts),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			report_error(&err);
			ExitCode::FAILURE
		}
	}
}

#[derive(Parser)]
#[command(name = "chunkcel")]
#[command(author = "chunkcel-rs project")]
#[command(version)]
#[command(about = "Convert layered sprite frames to chunked objects and back", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Generate an object folder from Frame-<f>-Layer-<l>.png images
	Object(ObjectArgs),
	/// Generate Frame-<f>-Layer-<l>.png images from an object folder
	Frames(FramesArgs),
}

#[derive(Args)]
struct ObjectArgs {
	/// Input folder (or parent folder with --bulk)
	#[arg(value_name = "INPUT")]
	input: PathBuf,

	/// Output folder (default: <INPUT>/object); ignored with --bulk
	#[arg(short, long, value_name = "DIR")]
	output: Option<PathBuf>,

	/// Process every subfolder of INPUT as its own sprite
	#[arg(short, long, default_value_t = false)]
	bulk: bool,

	/// Sprite kind, decides the palette group budget
	#[arg(short, long, value_name = "KIND", default_value = "object")]
	kind: SpriteKind,

	/// Minimum fraction of non-empty tiles per chunk row and column
	#[arg(long, value_name = "DENSITY")]
	min_density: Option<f32>,

	/// Horizontal displacement toward the engine actor center
	#[arg(long, value_name = "X", allow_hyphen_values = true)]
	displace_x: Option<i32>,

	/// Vertical displacement toward the engine actor center
	#[arg(long, value_name = "Y", allow_hyphen_values = true)]
	displace_y: Option<i32>,

	/// Disable the within-frame duplicate scan
	#[arg(long, default_value_t = false)]
	no_intra: bool,

	/// Disable the cross-frame duplicate scan
	#[arg(long, default_value_t = false)]
	no_inter: bool,

	/// Chunk sizes to scan, e.g. "32x32,16x16,8x8" (default: all twelve)
	#[arg(long, value_name = "SIZES")]
	sizes: Option<String>,

	/// Per-frame memory budget in tile units
	#[arg(long, value_name = "TILES", default_value_t = 0x3C0)]
	memory_budget: u32,

	/// Write annotated copies of the input images with chunk outlines
	#[arg(long, default_value_t = false)]
	annotate: bool,
}

#[derive(Args)]
struct FramesArgs {
	/// Object folder (or parent folder with --bulk)
	#[arg(value_name = "INPUT")]
	input: PathBuf,

	/// Output folder (default: <INPUT>/frames); ignored with --bulk
	#[arg(short, long, value_name = "DIR")]
	output: Option<PathBuf>,

	/// Process every subfolder of INPUT as its own object
	#[arg(short, long, default_value_t = false)]
	bulk: bool,

	/// Overlap policy for layer assignment: chunk, pixel, palette, none
	#[arg(short = 'a', long, value_name = "POLICY", default_value = "none")]
	avoid_overlap: OverlapPolicy,

	/// Canvas margin around the sprite bounding box, in pixels
	#[arg(long, value_name = "PIXELS", default_value_t = 8)]
	margin: u32,
}

fn run_object(args: ObjectArgs) -> Result<()> {
	if !args.input.is_dir() {
		bail!("{} is not a directory", args.input.display());
	}

	if args.bulk {
		return run_bulk(&args.input, |folder| convert_object_folder(&args, folder, None));
	}

	convert_object_folder(&args, &args.input, args.output.as_deref())
}

fn convert_object_folder(args: &ObjectArgs, folder: &Path, output: Option<&Path>) -> Result<()> {
	let mut pipeline = ObjectPipeline::from_input_folder(args.kind, folder)
		.with_context(|| format!("loading configuration for {}", folder.display()))?;
	apply_overrides(args, pipeline.config_mut())?;
	let pipeline = pipeline.with_memory_budget(args.memory_budget);

	let output_dir = match output {
		Some(dir) => dir.to_path_buf(),
		None => folder.join("object"),
	};

	let outcome = pipeline
		.run(folder, &output_dir)
		.with_context(|| format!("converting {}", folder.display()))?;
	print_object_summary(&outcome);

	if args.annotate {
		annotate_input(folder, &outcome)
			.with_context(|| format!("annotating {}", folder.display()))?;
	}

	Ok(())
}

fn apply_overrides(args: &ObjectArgs, config: &mut GeneratorConfig) -> Result<()> {
	if let Some(density) = args.min_density {
		config.min_density = density;
	}
	if let Some(x) = args.displace_x {
		config.displace_sprite[0] = x;
	}
	if let Some(y) = args.displace_y {
		config.displace_sprite[1] = y;
	}
	if args.no_intra {
		config.intra_scan = false;
	}
	if args.no_inter {
		config.inter_scan = false;
	}
	if let Some(sizes) = &args.sizes {
		config.scan_chunk_sizes = parse_sizes(sizes)?;
	}
	config.validate()?;
	Ok(())
}

/// Parses a "WxH,WxH" size list.
fn parse_sizes(text: &str) -> Result<Vec<[u32; 2]>> {
	let mut sizes = Vec::new();
	for part in text.split(',') {
		let part = part.trim();
		let (w, h) = part
			.split_once(['x', 'X'])
			.with_context(|| format!("bad chunk size {part:?}, expected WxH"))?;
		let width: u32 = w.trim().parse().with_context(|| format!("bad width in {part:?}"))?;
		let height: u32 = h.trim().parse().with_context(|| format!("bad height in {part:?}"))?;
		sizes.push([width, height]);
	}
	Ok(sizes)
}

fn print_object_summary(outcome: &ForwardOutcome) {
	println!(
		"✓ object written to {} ({} frames, {} unique chunks, canvas {}x{})",
		outcome.output_dir.display(),
		outcome.frames.len(),
		outcome.report.total_chunks,
		outcome.canvas.0,
		outcome.canvas.1
	);
	println!("  max frame memory: {} tile units", outcome.report.max_memory);
	for stats in &outcome.report.frames {
		info!(
			"Frame-{}: {} cels, {} tile units",
			stats.number, stats.cel_count, stats.memory
		);
	}
	for warning in &outcome.report.warnings {
		println!("  ⚠ {warning}");
	}
}

fn run_frames(args: FramesArgs) -> Result<()> {
	if !args.input.is_dir() {
		bail!("{} is not a directory", args.input.display());
	}

	if args.bulk {
		return run_bulk(&args.input, |folder| convert_frames_folder(&args, folder, None));
	}

	convert_frames_folder(&args, &args.input, args.output.as_deref())
}

fn convert_frames_folder(args: &FramesArgs, folder: &Path, output: Option<&Path>) -> Result<()> {
	let output_dir = match output {
		Some(dir) => dir.to_path_buf(),
		None => folder.join("frames"),
	};

	let outcome = FramesPipeline::new(args.avoid_overlap)
		.with_margin(args.margin)
		.run(folder, &output_dir)
		.with_context(|| format!("converting {}", folder.display()))?;

	println!(
		"✓ frames written to {} ({} frames, {} layer images, canvas {}x{})",
		outcome.output_dir.display(),
		outcome.frame_count,
		outcome.layers_written,
		outcome.canvas.0,
		outcome.canvas.1
	);
	Ok(())
}

/// Runs `convert` over every direct subfolder, logging failures and carrying
/// on; fails overall when any folder failed.
fn run_bulk(parent: &Path, convert: impl Fn(&Path) -> Result<()>) -> Result<()> {
	let folders: Vec<PathBuf> = WalkDir::new(parent)
		.min_depth(1)
		.max_depth(1)
		.sort_by_file_name()
		.into_iter()
		.filter_map(|entry| entry.ok())
		.filter(|entry| entry.file_type().is_dir())
		.map(|entry| entry.into_path())
		.collect();

	if folders.is_empty() {
		bail!("no subfolders found in {}", parent.display());
	}

	println!("processing {} folder(s) under {}", folders.len(), parent.display());

	let mut failed = Vec::new();
	for folder in &folders {
		if let Err(err) = convert(folder) {
			report_error(&err);
			failed.push(folder.clone());
		}
	}

	println!(
		"done: {} succeeded, {} failed",
		folders.len() - failed.len(),
		failed.len()
	);
	if !failed.is_empty() {
		for folder in &failed {
			error!("failed: {}", folder.display());
		}
		bail!("{} folder(s) failed", failed.len());
	}
	Ok(())
}

/// Writes annotated copies of the input images with one outlined rectangle
/// per cel, colored by chunk id, into `<folder>/DEBUG`.
fn annotate_input(folder: &Path, outcome: &ForwardOutcome) -> Result<()> {
	let debug_dir = folder.join("DEBUG");
	std::fs::create_dir_all(&debug_dir)?;

	let total = outcome.chunk_sizes.len().max(1);

	for frame in &outcome.frames {
		let layers: Vec<u32> = {
			let mut layers: Vec<u32> = frame.cels.iter().map(|c| c.layer).collect();
			layers.sort_unstable();
			layers.dedup();
			layers
		};

		for layer in layers {
			let name = format!("Frame-{}-Layer-{}.png", frame.number, layer);
			let source = folder.join(&name);
			if !source.is_file() {
				continue;
			}
			let mut canvas = image::open(&source)
				.with_context(|| format!("reading {}", source.display()))?
				.to_rgba8();

			for cel in frame.cels.iter().filter(|c| c.layer == layer) {
				let size = outcome.chunk_sizes[cel.chunk as usize];
				let color = chunk_color(cel.chunk as usize, total);
				draw_rect(&mut canvas, cel.x, cel.y, size.width, size.height, color);
			}

			let target = debug_dir.join(format!(
				"Frame-{}-Layer-{}-annotated.png",
				frame.number, layer
			));
			canvas.save(&target).with_context(|| format!("writing {}", target.display()))?;
		}
	}

	println!("  annotated images written to {}", debug_dir.display());
	Ok(())
}

/// Evenly spaced hues, fixed lightness and saturation.
fn chunk_color(index: usize, total: usize) -> image::Rgba<u8> {
	let hue = index as f32 / total as f32;
	let (r, g, b) = hsl_to_rgb(hue, 0.5, 0.9);
	image::Rgba([r, g, b, 255])
}

fn hsl_to_rgb(h: f32, l: f32, s: f32) -> (u8, u8, u8) {
	let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
	let h6 = h * 6.0;
	let x = c * (1.0 - (h6 % 2.0 - 1.0).abs());
	let (r, g, b) = match h6 as u32 {
		0 => (c, x, 0.0),
		1 => (x, c, 0.0),
		2 => (0.0, c, x),
		3 => (0.0, x, c),
		4 => (x, 0.0, c),
		_ => (c, 0.0, x),
	};
	let m = l - c / 2.0;
	(
		((r + m) * 255.0) as u8,
		((g + m) * 255.0) as u8,
		((b + m) * 255.0) as u8,
	)
}

fn draw_rect(
	canvas: &mut image::RgbaImage,
	x: u32,
	y: u32,
	width: u32,
	height: u32,
	color: image::Rgba<u8>,
) {
	let (cw, ch) = canvas.dimensions();
	for dx in 0..width {
		for &py in &[y, y + height - 1] {
			if x + dx < cw && py < ch {
				canvas.put_pixel(x + dx, py, color);
			}
		}
	}
	for dy in 0..height {
		for &px in &[x, x + width - 1] {
			if px < cw && y + dy < ch {
				canvas.put_pixel(px, y + dy, color);
			}
		}
	}
}

fn report_error(err: &anyhow::Error) {
	// machine-readable kind prefix for pipeline failures
	if let Some(object_err) = err.root_cause().downcast_ref::<ObjectError>() {
		eprintln!("{}: {}", object_err.kind(), object_err);
	} else {
		eprintln!("error: {err:#}");
	}
}
