//! This crate provides the core data types and conversion pipelines for the
//! `chunkcel-rs` project.
//!
//! # Directions
//!
//! - **Forward** ([`object::pipeline::ObjectPipeline`]): decompose layered
//!   frame PNGs into the smallest set of reusable tile-aligned chunks and
//!   emit the object folder (palette, chunk images, `frames.xml`,
//!   `animations.xml`, `config.json`).
//! - **Reverse** ([`object::pipeline::FramesPipeline`]): assemble an object
//!   folder back into layered frame PNGs under a configurable overlap
//!   policy.
//!
//! # Examples
//!
//! ```no_run
//! use chunkcel_types::object::{ObjectPipeline, SpriteKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ObjectPipeline::from_input_folder(SpriteKind::Object, "hero")?;
//! let outcome = pipeline.run("hero", "hero/object")?;
//! println!("{} unique chunks", outcome.report.total_chunks);
//! # Ok(())
//! # }
//! ```

pub mod object;
pub mod prelude;

// Re-export commonly used types at crate root for convenience
pub use object::{
	ChunkPool, ChunkSize, FramesPipeline, GeneratorConfig, GlobalPalette, ObjectError,
	ObjectPipeline, OverlapPolicy, SpriteKind,
};
