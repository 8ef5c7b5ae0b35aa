//! Object/sprite conversion support for the `chunkcel-rs` project.
//!
//! This module converts between the two representations of a 2D animated
//! sprite used by the target engine:
//!
//! - the **frame representation**: indexed PNGs named
//!   `Frame-<f>-Layer-<l>.png` sharing one embedded palette, and
//! - the **object representation**: a palette file, a pool of chunk images,
//!   and two XML documents describing frame composition and animation
//!   timing.
//!
//! # Object Folder Layout
//!
//! ```text
//! object/
//! ├── palette.pal         JASC-PAL text palette
//! ├── imgs/NNNN.png       one indexed PNG per chunk (4-digit chunk id)
//! ├── frames.xml          <AnimData><Frames><Frame><Cel img x y pal/>
//! ├── animations.xml      <AnimData><Anims><Anim><Frame id duration/>
//! └── config.json         generator settings, round-trippable
//! ```
//!
//! # Coordinate System
//!
//! A frame's origin is the sprite's top-left corner; tiles are 8x8 pixels
//! and every chunk origin is tile-aligned. In the emitted XML, the
//! configured `displace_sprite` translation is added to every cel origin so
//! the user-chosen alignment point maps to the engine actor center at
//! (256, 512).
//!
//! # Pipeline Overview
//!
//! Forward: input folder -> palette model -> tile grid -> chunk extractor ->
//! deduplicator -> frame composer -> serializer -> object folder.
//!
//! Reverse: object folder -> parser -> overlap resolver -> frame renderer ->
//! frames folder.
//!
//! Both directions are deterministic: identical inputs and settings produce
//! byte-identical output folders.
//!
//! # Usage Examples
//!
//! ## Converting a frames folder to an object
//!
//! ```no_run
//! use chunkcel_types::object::pipeline::ObjectPipeline;
//! use chunkcel_types::object::SpriteKind;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ObjectPipeline::from_input_folder(SpriteKind::Object, "hero")?;
//! let outcome = pipeline.run("hero", "hero/object")?;
//! for warning in &outcome.report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Converting an object back to frames
//!
//! ```no_run
//! use chunkcel_types::object::pipeline::FramesPipeline;
//! use chunkcel_types::object::layering::OverlapPolicy;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let outcome = FramesPipeline::new(OverlapPolicy::Chunk)
//!     .run("hero/object", "hero/object/frames")?;
//! println!("{} layer images", outcome.layers_written);
//! # Ok(())
//! # }
//! ```

mod error;

pub mod chunk;
pub mod compose;
pub mod config;
pub mod extract;
pub mod image;
pub mod layering;
pub mod palette;
pub mod parse;
pub mod pipeline;
pub mod render;
pub mod serialize;
pub mod tile;
pub mod xml;

// Re-export error types
pub use error::{ObjectError, Stage};

// Re-export main types
pub use chunk::{CHUNK_SIZES, Chunk, ChunkId, ChunkPool, ChunkSize};
pub use compose::{Cel, ComposeReport, ComposeWarning, Frame, FrameStats};
pub use config::{AnimationConfig, AnimationStep, GeneratorConfig, MAX_ANIMATIONS};
pub use extract::{ExtractOutput, ExtractSettings, LayerImage, ScanOrder};
pub use image::IndexedImage;
pub use layering::OverlapPolicy;
pub use palette::{Color, GlobalPalette};
pub use parse::ParsedObject;
pub use pipeline::{ForwardOutcome, FramesPipeline, ObjectPipeline, ReverseOutcome};
pub use render::{RenderSettings, RenderedFrames};
pub use tile::{TILE_SIZE, TileGrid};

/// What kind of sprite an object is. The kind only parameterizes the
/// palette budget: regular objects may use up to 12 groups, effect sprites
/// are limited to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpriteKind {
	/// Regular object sprite (up to 12 palette groups)
	#[default]
	Object,
	/// Effect sprite (up to 3 palette groups)
	Effect,
}

impl SpriteKind {
	/// Maximum number of 16-color palette groups for this kind.
	pub fn max_palette_groups(&self) -> usize {
		match self {
			SpriteKind::Object => 12,
			SpriteKind::Effect => 3,
		}
	}
}

impl std::fmt::Display for SpriteKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SpriteKind::Object => write!(f, "object"),
			SpriteKind::Effect => write!(f, "effect"),
		}
	}
}

impl std::str::FromStr for SpriteKind {
	type Err = ObjectError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"object" => Ok(Self::Object),
			"effect" => Ok(Self::Effect),
			other => Err(ObjectError::invalid_config(
				Stage::Config,
				format!("unknown sprite kind {other:?} (object, effect)"),
			)),
		}
	}
}
