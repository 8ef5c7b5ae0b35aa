//! Object folder serialization.
//!
//! Writes the complete object representation:
//!
//! ```text
//! object/
//! ├── palette.pal         JASC-PAL
//! ├── imgs/NNNN.png       one indexed PNG per chunk, id as filename
//! ├── frames.xml
//! ├── animations.xml
//! └── config.json         settings used, round-trippable
//! ```
//!
//! Everything is first written into a sibling temp directory which is renamed
//! onto the target on success, so a cancelled or failed run never leaves a
//! half-written object folder behind.
//!
//! Cel coordinates are emitted in engine space: the configured
//! `displace_sprite` translation is added to every cel origin, chosen by the
//! user so that the sprite's alignment point lands on the engine actor
//! center (256, 512).

use std::path::Path;

use log::info;

use super::chunk::ChunkPool;
use super::compose::Frame;
use super::config::{AnimationConfig, GeneratorConfig};
use super::error::{ObjectError, Stage};
use super::image::IndexedImage;
use super::palette::GlobalPalette;
use super::xml::{AnimFrameAttrs, CelAttrs, anims_to_xml, frames_to_xml};

/// X coordinate of the engine actor center
pub const CENTER_X: i32 = 256;

/// Y coordinate of the engine actor center
pub const CENTER_Y: i32 = 512;

/// Everything one forward run produced, ready for serialization.
#[derive(Debug)]
pub struct ObjectBundle<'a> {
	/// Shared palette
	pub palette: &'a GlobalPalette,
	/// Chunk pool
	pub pool: &'a ChunkPool,
	/// Composed frames, cels in engine order
	pub frames: &'a [Frame],
	/// Effective configuration (recorded into the output folder)
	pub config: &'a GeneratorConfig,
	/// Canvas width of the input frames
	pub canvas_width: u32,
	/// Canvas height of the input frames
	pub canvas_height: u32,
}

impl ObjectBundle<'_> {
	/// Builds the per-frame cel attribute lists of `frames.xml`.
	pub fn frame_cels(&self) -> Vec<Vec<CelAttrs>> {
		let [left, top] = self.config.displace_sprite;
		self.frames
			.iter()
			.map(|frame| {
				frame
					.cels
					.iter()
					.map(|cel| CelAttrs {
						img: cel.chunk,
						x: left + cel.x as i32,
						y: top + cel.y as i32,
						pal: cel.group,
					})
					.collect()
			})
			.collect()
	}

	/// Builds the per-animation step lists of `animations.xml`.
	///
	/// Animation steps reference frames by filename number; the XML stores
	/// indices into the frames.xml list instead.
	///
	/// # Errors
	///
	/// Returns an error if an animation references a frame number with no
	/// input images.
	pub fn animation_frames(
		&self,
		animations: &[AnimationConfig],
	) -> Result<Vec<Vec<AnimFrameAttrs>>, ObjectError> {
		let numbers: Vec<u32> = self.frames.iter().map(|f| f.number).collect();
		animations
			.iter()
			.map(|animation| {
				animation
					.frames
					.iter()
					.map(|step| {
						let id = numbers.iter().position(|&n| n == step.frame).ok_or_else(|| {
							ObjectError::invalid_config(
								Stage::Serializer,
								format!("animation references missing frame {}", step.frame),
							)
						})?;
						Ok(AnimFrameAttrs {
							id: id as u32,
							duration: step.duration,
						})
					})
					.collect()
			})
			.collect()
	}
}

/// Writes the object folder atomically.
///
/// # Errors
///
/// Returns an error on I/O failure or when an animation references a frame
/// that does not exist.
pub fn write_object(bundle: &ObjectBundle<'_>, output_dir: &Path) -> Result<(), ObjectError> {
	let animations = {
		let numbers: Vec<u32> = bundle.frames.iter().map(|f| f.number).collect();
		bundle.config.animations_or_default(&numbers)
	};
	let anim_frames = bundle.animation_frames(&animations)?;
	let frame_cels = bundle.frame_cels();

	let tmp_dir = temp_sibling(output_dir);
	if tmp_dir.exists() {
		std::fs::remove_dir_all(&tmp_dir)?;
	}
	std::fs::create_dir_all(tmp_dir.join("imgs"))?;

	bundle.palette.save_jasc(tmp_dir.join("palette.pal"))?;

	let palette_bytes = bundle.palette.to_png_bytes();
	for (id, chunk) in bundle.pool.iter() {
		let image = IndexedImage::from_parts(
			chunk.width(),
			chunk.height(),
			chunk.pixels().to_vec(),
			palette_bytes.clone(),
		);
		image.save(tmp_dir.join("imgs").join(format!("{id:04}.png")))?;
	}

	std::fs::write(tmp_dir.join("frames.xml"), frames_to_xml(&frame_cels))?;
	std::fs::write(tmp_dir.join("animations.xml"), anims_to_xml(&anim_frames))?;

	let mut effective = bundle.config.clone();
	effective.animations = animations;
	effective.save(tmp_dir.join("config.json"))?;

	if output_dir.exists() {
		std::fs::remove_dir_all(output_dir)?;
	}
	std::fs::rename(&tmp_dir, output_dir)?;

	info!(
		"object written to {}: {} chunks, {} frames",
		output_dir.display(),
		bundle.pool.len(),
		bundle.frames.len()
	);
	Ok(())
}

fn temp_sibling(output_dir: &Path) -> std::path::PathBuf {
	let name = output_dir.file_name().and_then(|n| n.to_str()).unwrap_or("object");
	output_dir.with_file_name(format!("{name}.tmp"))
}
