//! Prelude module for `chunkcel_types`.
//!
//! This module provides a convenient way to import commonly used types,
//! traits, and constants.
//!
//! # Examples
//!
//! ```no_run
//! use chunkcel_types::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ObjectPipeline::from_input_folder(SpriteKind::Object, "hero")?;
//! let outcome = pipeline.run("hero", "hero/object")?;
//! # Ok(())
//! # }
//! ```

// Object module types
#[doc(inline)]
pub use crate::object::{
	// Configuration types
	AnimationConfig,
	AnimationStep,
	// Constants
	CHUNK_SIZES,

	// Composition types
	Cel,
	// Chunk types
	Chunk,
	ChunkId,
	ChunkPool,
	ChunkSize,
	// Palette types
	Color,
	ComposeReport,
	ComposeWarning,

	// Pipeline types
	ForwardOutcome,
	Frame,
	FramesPipeline,
	GeneratorConfig,
	GlobalPalette,

	// Misc
	IndexedImage,
	LayerImage,

	// Errors
	ObjectError,
	ObjectPipeline,
	OverlapPolicy,

	ReverseOutcome,
	SpriteKind,
	Stage,
	TILE_SIZE,
	TileGrid,
};

// Re-export the object module for advanced usage
#[doc(inline)]
pub use crate::object;
