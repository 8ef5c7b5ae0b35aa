//! Pipeline drivers.
//!
//! A pipeline value owns every piece of mutable state of one folder
//! conversion (palette, chunk pool, frame list) and is dropped when the
//! folder is done. There is no process-wide state; bulk conversion runs one
//! pipeline per folder.
//!
//! # Examples
//!
//! ```no_run
//! use chunkcel_types::object::pipeline::{FramesPipeline, ObjectPipeline};
//! use chunkcel_types::object::layering::OverlapPolicy;
//! use chunkcel_types::object::SpriteKind;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // forward: frames folder -> object folder
//! let pipeline = ObjectPipeline::from_input_folder(SpriteKind::Object, "walk_cycle")?;
//! let outcome = pipeline.run("walk_cycle", "walk_cycle/object")?;
//! println!("{} chunks, max memory {}", outcome.report.total_chunks, outcome.report.max_memory);
//!
//! // reverse: object folder -> frames folder
//! let pipeline = FramesPipeline::new(OverlapPolicy::Chunk);
//! pipeline.run("walk_cycle/object", "walk_cycle/object/frames")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use log::info;

use super::SpriteKind;
use super::chunk::ChunkSize;
use super::compose::{ComposeReport, DEFAULT_MEMORY_BUDGET, Frame, compose};
use super::config::GeneratorConfig;
use super::error::{ObjectError, Stage};
use super::extract::{ExtractSettings, LayerImage, extract};
use super::image::IndexedImage;
use super::layering::OverlapPolicy;
use super::palette::GlobalPalette;
use super::parse::read_object;
use super::render::{RenderSettings, render_frames, write_frames};
use super::serialize::{ObjectBundle, write_object};
use super::tile::TILE_SIZE;

/// Result of one forward run.
#[derive(Debug)]
pub struct ForwardOutcome {
	/// Where the object folder was written
	pub output_dir: PathBuf,
	/// Composition statistics and limit warnings
	pub report: ComposeReport,
	/// Input canvas size
	pub canvas: (u32, u32),
	/// Composed frames, cels in engine order (for reporting and overlays)
	pub frames: Vec<Frame>,
	/// Chunk dimensions by chunk id
	pub chunk_sizes: Vec<ChunkSize>,
}

/// Result of one reverse run.
#[derive(Debug)]
pub struct ReverseOutcome {
	/// Where the frames folder was written
	pub output_dir: PathBuf,
	/// Number of frames rendered
	pub frame_count: usize,
	/// Number of layer images written
	pub layers_written: usize,
	/// Output canvas size
	pub canvas: (u32, u32),
}

/// Forward pipeline: layered frame PNGs to an object folder.
#[derive(Debug)]
pub struct ObjectPipeline {
	kind: SpriteKind,
	config: GeneratorConfig,
	memory_budget: u32,
}

impl ObjectPipeline {
	/// Creates a pipeline with an explicit configuration.
	///
	/// # Errors
	///
	/// Returns an error if the configuration is invalid.
	pub fn new(kind: SpriteKind, config: GeneratorConfig) -> Result<Self, ObjectError> {
		config.validate()?;
		Ok(Self {
			kind,
			config,
			memory_budget: DEFAULT_MEMORY_BUDGET,
		})
	}

	/// Creates a pipeline from the input folder's `config.json`, falling back
	/// to defaults when the file is absent.
	///
	/// # Errors
	///
	/// Returns an error if a present `config.json` cannot be read or is
	/// invalid.
	pub fn from_input_folder(
		kind: SpriteKind,
		input_dir: impl AsRef<Path>,
	) -> Result<Self, ObjectError> {
		let config_path = input_dir.as_ref().join("config.json");
		let config = if config_path.is_file() {
			GeneratorConfig::open(&config_path)?
		} else {
			GeneratorConfig::default()
		};
		Self::new(kind, config)
	}

	/// Returns the configuration.
	pub fn config(&self) -> &GeneratorConfig {
		&self.config
	}

	/// Returns a mutable reference to the configuration, for CLI overrides.
	pub fn config_mut(&mut self) -> &mut GeneratorConfig {
		&mut self.config
	}

	/// Replaces the per-frame memory budget (tile units).
	pub fn with_memory_budget(mut self, budget: u32) -> Self {
		self.memory_budget = budget;
		self
	}

	/// Runs the conversion: scan, validate, extract, compose, serialize.
	///
	/// # Errors
	///
	/// Any validation failure aborts the folder; limit
	/// violations are reported as warnings in the outcome instead.
	pub fn run(
		&self,
		input_dir: impl AsRef<Path>,
		output_dir: impl AsRef<Path>,
	) -> Result<ForwardOutcome, ObjectError> {
		let input_dir = input_dir.as_ref();
		let output_dir = output_dir.as_ref();

		self.config.validate()?;

		let (layers, palette, width, height) = load_input_folder(input_dir)?;

		let groups = palette.group_count();
		if groups > self.kind.max_palette_groups() {
			return Err(ObjectError::TooManyGroups {
				stage: Stage::InputScan,
				groups,
				max: self.kind.max_palette_groups(),
			});
		}

		let settings = ExtractSettings::from_config(&self.config);
		let extracted = extract(&layers, &settings)?;

		let mut frames = extracted.frames;
		let report = compose(&mut frames, &extracted.pool, self.memory_budget);

		let bundle = ObjectBundle {
			palette: &palette,
			pool: &extracted.pool,
			frames: &frames,
			config: &self.config,
			canvas_width: width,
			canvas_height: height,
		};
		write_object(&bundle, output_dir)?;

		let chunk_sizes = extracted.pool.iter().map(|(_, chunk)| chunk.size()).collect();
		Ok(ForwardOutcome {
			output_dir: output_dir.to_path_buf(),
			report,
			canvas: (width, height),
			frames,
			chunk_sizes,
		})
	}
}

/// Reverse pipeline: object folder to layered frame PNGs.
#[derive(Debug, Default)]
pub struct FramesPipeline {
	settings: RenderSettings,
}

impl FramesPipeline {
	/// Creates a pipeline with the given overlap policy and default margin.
	pub fn new(policy: OverlapPolicy) -> Self {
		Self {
			settings: RenderSettings {
				policy,
				..RenderSettings::default()
			},
		}
	}

	/// Replaces the canvas margin (pixels on each side).
	pub fn with_margin(mut self, margin: u32) -> Self {
		self.settings.margin = margin;
		self
	}

	/// Runs the conversion: parse, resolve layers, render, write.
	///
	/// # Errors
	///
	/// Returns an error when the object folder is incomplete or malformed.
	pub fn run(
		&self,
		object_dir: impl AsRef<Path>,
		output_dir: impl AsRef<Path>,
	) -> Result<ReverseOutcome, ObjectError> {
		let output_dir = output_dir.as_ref();

		let object = read_object(object_dir)?;
		let rendered = render_frames(&object, &self.settings)?;
		let layers_written = write_frames(&rendered, &object, output_dir)?;

		Ok(ReverseOutcome {
			output_dir: output_dir.to_path_buf(),
			frame_count: rendered.frames.len(),
			layers_written,
			canvas: (rendered.canvas_width, rendered.canvas_height),
		})
	}
}

/// Scans and validates an input folder of `Frame-<f>-Layer-<l>.png` images.
///
/// Returns the layer images sorted by (frame, layer), the shared palette,
/// and the common canvas size.
pub fn load_input_folder(
	input_dir: &Path,
) -> Result<(Vec<LayerImage>, GlobalPalette, u32, u32), ObjectError> {
	let mut paths: Vec<PathBuf> = std::fs::read_dir(input_dir)?
		.filter_map(|entry| entry.ok())
		.map(|entry| entry.path())
		.filter(|path| {
			path.is_file()
				&& path
					.extension()
					.is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
		})
		.collect();
	paths.sort();

	if paths.is_empty() {
		return Err(ObjectError::missing_file(Stage::InputScan, input_dir.join("Frame-*-Layer-*.png")));
	}

	let mut layers = Vec::with_capacity(paths.len());
	let mut shared: Option<(Vec<u8>, u32, u32)> = None;

	for path in paths {
		let (frame, layer) = parse_layer_name(&path)?;
		let image = IndexedImage::open(&path)?;
		let (width, height) = (image.width(), image.height());

		if width % TILE_SIZE != 0 || height % TILE_SIZE != 0 {
			return Err(ObjectError::NotMultipleOf8 {
				stage: Stage::InputScan,
				path,
				width,
				height,
			});
		}

		match &shared {
			None => shared = Some((image.palette_bytes().to_vec(), width, height)),
			Some((palette, expected_width, expected_height)) => {
				if (width, height) != (*expected_width, *expected_height) {
					return Err(ObjectError::DimensionMismatch {
						stage: Stage::InputScan,
						path,
						width,
						height,
						expected_width: *expected_width,
						expected_height: *expected_height,
					});
				}
				if image.palette_bytes() != palette.as_slice() {
					return Err(ObjectError::PaletteMismatch {
						stage: Stage::InputScan,
						path,
					});
				}
			}
		}

		layers.push(LayerImage {
			frame,
			layer,
			image,
		});
	}

	layers.sort_by_key(|l| (l.frame, l.layer));

	let (palette_bytes, width, height) = shared.expect("at least one image was loaded");
	let palette = GlobalPalette::from_png_bytes(&palette_bytes);

	info!(
		"{}: {} layer images, canvas {}x{}, {} palette groups",
		input_dir.display(),
		layers.len(),
		width,
		height,
		palette.group_count()
	);

	Ok((layers, palette, width, height))
}

/// Parses `Frame-<f>-Layer-<l>` from a file name.
fn parse_layer_name(path: &Path) -> Result<(u32, u32), ObjectError> {
	let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
	let parts: Vec<&str> = stem.split('-').collect();

	if parts.len() == 4
		&& parts[0].eq_ignore_ascii_case("frame")
		&& parts[2].eq_ignore_ascii_case("layer")
	{
		if let (Ok(frame), Ok(layer)) = (parts[1].parse::<u32>(), parts[3].parse::<u32>()) {
			return Ok((frame, layer));
		}
	}

	Err(ObjectError::invalid_filename(Stage::InputScan, path))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layer_names_parse() {
		assert_eq!(parse_layer_name(Path::new("Frame-0-Layer-0.png")).unwrap(), (0, 0));
		assert_eq!(parse_layer_name(Path::new("frame-12-layer-3.png")).unwrap(), (12, 3));
	}

	#[test]
	fn bad_layer_names_are_fatal() {
		for name in ["Frame-0.png", "Frame-a-Layer-0.png", "Sprite-0-Layer-0.png", "Frame-0-Layer--1.png"] {
			let err = parse_layer_name(Path::new(name)).expect_err(name);
			assert_eq!(err.kind(), "InvalidFilename");
		}
	}
}
