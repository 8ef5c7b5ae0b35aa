//! Frame rendering (reverse direction output).
//!
//! Each frame is rendered as one indexed PNG per resolved layer, named
//! `Frame-<f>-Layer-<l>.png` with 0-based indices. The canvas is shared by
//! all frames: the bounding box of every cel, padded by a symmetric margin
//! and rounded up to whole tiles, so a re-run of the forward pipeline over
//! the rendered frames reproduces the chunk pool.

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::config::{AnimationConfig, AnimationStep, GeneratorConfig};
use super::error::{ObjectError, Stage};
use super::image::IndexedImage;
use super::layering::{OverlapPolicy, assign_layers};
use super::palette::GROUP_SIZE;
use super::parse::ParsedObject;
use super::tile::TILE_SIZE;

/// Default symmetric canvas margin in pixels
pub const DEFAULT_MARGIN: u32 = 8;

/// Reverse rendering settings.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
	/// Overlap policy for layer assignment
	pub policy: OverlapPolicy,
	/// Symmetric margin around the cel bounding box, in pixels
	pub margin: u32,
}

impl Default for RenderSettings {
	fn default() -> Self {
		Self {
			policy: OverlapPolicy::default(),
			margin: DEFAULT_MARGIN,
		}
	}
}

/// All layer images of all frames, rendered in memory.
#[derive(Debug)]
pub struct RenderedFrames {
	/// Canvas width in pixels (multiple of 8)
	pub canvas_width: u32,
	/// Canvas height in pixels (multiple of 8)
	pub canvas_height: u32,
	/// Engine-space coordinate of the canvas top-left corner
	pub origin: (i32, i32),
	/// Per frame, per layer, in order
	pub frames: Vec<Vec<IndexedImage>>,
}

/// Renders every frame of a parsed object.
///
/// Cels are painted in document order onto the layer the resolver assigned
/// them: non-transparent pixels overwrite, transparent pixels are skipped.
/// A frame without cels still produces one blank layer.
///
/// # Errors
///
/// Returns an error when a cel references a chunk the pool does not hold.
pub fn render_frames(
	object: &ParsedObject,
	settings: &RenderSettings,
) -> Result<RenderedFrames, ObjectError> {
	let (origin, canvas_width, canvas_height) = canvas_bounds(object, settings.margin)?;
	let palette_bytes = object.palette.to_png_bytes();

	let mut frames = Vec::with_capacity(object.frames.len());
	for (frame_index, cels) in object.frames.iter().enumerate() {
		let assignment = assign_layers(cels, &object.pool, settings.policy)?;
		let layer_count = assignment.iter().map(|&l| l as usize + 1).max().unwrap_or(1);
		debug!("frame {frame_index}: {} cels over {layer_count} layers", cels.len());

		let mut layers = vec![
			IndexedImage::blank(canvas_width, canvas_height, palette_bytes.clone());
			layer_count
		];

		for (cel, &layer_no) in cels.iter().zip(&assignment) {
			let chunk = object.pool.get(cel.img).ok_or(ObjectError::UnknownChunk {
				stage: Stage::Renderer,
				chunk_id: cel.img,
			})?;
			let canvas = &mut layers[layer_no as usize];
			let base_x = cel.x - origin.0;
			let base_y = cel.y - origin.1;

			for py in 0..chunk.height() {
				for px in 0..chunk.width() {
					let local = chunk.pixel(px, py);
					if local == 0 {
						continue;
					}
					let global = cel.pal * GROUP_SIZE as u8 + local;
					canvas.set_pixel(base_x as u32 + px, base_y as u32 + py, global);
				}
			}
		}

		frames.push(layers);
	}

	Ok(RenderedFrames {
		canvas_width,
		canvas_height,
		origin,
		frames,
	})
}

/// Writes the rendered layers and a round-trippable `config.json` into
/// `output_dir`, atomically via a temp sibling.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub fn write_frames(
	rendered: &RenderedFrames,
	object: &ParsedObject,
	output_dir: &Path,
) -> Result<usize, ObjectError> {
	let tmp_dir = temp_sibling(output_dir);
	if tmp_dir.exists() {
		std::fs::remove_dir_all(&tmp_dir)?;
	}
	std::fs::create_dir_all(&tmp_dir)?;

	let mut written = 0;
	for (frame_index, layers) in rendered.frames.iter().enumerate() {
		for (layer_index, layer) in layers.iter().enumerate() {
			layer.save(tmp_dir.join(format!("Frame-{frame_index}-Layer-{layer_index}.png")))?;
			written += 1;
		}
	}

	reverse_config(object).save(tmp_dir.join("config.json"))?;

	if output_dir.exists() {
		std::fs::remove_dir_all(output_dir)?;
	}
	std::fs::rename(&tmp_dir, output_dir)?;

	info!("{} layer images written to {}", written, output_dir.display());
	Ok(written)
}

/// The configuration a forward run over the rendered frames should use:
/// animation steps reference the 0-based frame filenames directly.
pub fn reverse_config(object: &ParsedObject) -> GeneratorConfig {
	GeneratorConfig {
		animations: object
			.animations
			.iter()
			.map(|steps| AnimationConfig {
				frames: steps
					.iter()
					.map(|step| AnimationStep {
						frame: step.id,
						duration: step.duration,
					})
					.collect(),
			})
			.collect(),
		..GeneratorConfig::default()
	}
}

/// Bounding box of every cel across all frames, padded and tile-aligned.
fn canvas_bounds(object: &ParsedObject, margin: u32) -> Result<((i32, i32), u32, u32), ObjectError> {
	let mut bounds: Option<(i32, i32, i32, i32)> = None;

	for cel in object.frames.iter().flatten() {
		let chunk = object.pool.get(cel.img).ok_or(ObjectError::UnknownChunk {
			stage: Stage::Renderer,
			chunk_id: cel.img,
		})?;
		let (x1, y1) = (cel.x + chunk.width() as i32, cel.y + chunk.height() as i32);
		bounds = Some(match bounds {
			None => (cel.x, cel.y, x1, y1),
			Some((min_x, min_y, max_x, max_y)) => {
				(min_x.min(cel.x), min_y.min(cel.y), max_x.max(x1), max_y.max(y1))
			}
		});
	}

	let (min_x, min_y, max_x, max_y) =
		bounds.unwrap_or((0, 0, TILE_SIZE as i32, TILE_SIZE as i32));
	let margin = margin as i32;
	let origin = (min_x - margin, min_y - margin);
	let width = ((max_x - min_x) + 2 * margin) as u32;
	let height = ((max_y - min_y) + 2 * margin) as u32;

	Ok((origin, align_up(width), align_up(height)))
}

fn align_up(value: u32) -> u32 {
	value.div_ceil(TILE_SIZE) * TILE_SIZE
}

fn temp_sibling(output_dir: &Path) -> PathBuf {
	let name = output_dir.file_name().and_then(|n| n.to_str()).unwrap_or("frames");
	output_dir.with_file_name(format!("{name}.tmp"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::object::chunk::{Chunk, ChunkPool, ChunkSize};
	use crate::object::palette::GlobalPalette;
	use crate::object::xml::CelAttrs;

	fn object_with_one_chunk(cels: Vec<Vec<CelAttrs>>) -> ParsedObject {
		let mut pool = ChunkPool::new();
		pool.insert_unchecked(Chunk::new(ChunkSize::new(8, 8), 0, vec![1; 64]));
		ParsedObject {
			palette: GlobalPalette::from_png_bytes(&[0; 96]),
			pool,
			frames: cels,
			animations: vec![],
		}
	}

	fn cel(img: u32, x: i32, y: i32, pal: u8) -> CelAttrs {
		CelAttrs {
			img,
			x,
			y,
			pal,
		}
	}

	#[test]
	fn canvas_covers_all_cels_with_margin() {
		let object =
			object_with_one_chunk(vec![vec![cel(0, 248, 504, 0)], vec![cel(0, 264, 504, 0)]]);
		let settings = RenderSettings::default();
		let rendered = render_frames(&object, &settings).unwrap();
		// cels span x 248..272, y 504..512; margin 8 on each side
		assert_eq!(rendered.origin, (240, 496));
		assert_eq!(rendered.canvas_width, 40);
		assert_eq!(rendered.canvas_height, 24);
	}

	#[test]
	fn same_palette_cels_share_one_layer() {
		// two cels at the same position, same palette, chunk policy
		let object = object_with_one_chunk(vec![vec![cel(0, 0, 0, 0), cel(0, 0, 0, 0)]]);
		let settings = RenderSettings {
			policy: OverlapPolicy::Chunk,
			margin: 0,
		};
		let rendered = render_frames(&object, &settings).unwrap();
		assert_eq!(rendered.frames[0].len(), 1, "only Layer-0 expected");
	}

	#[test]
	fn painted_pixels_use_group_offset() {
		let object = object_with_one_chunk(vec![vec![cel(0, 0, 0, 2)]]);
		let settings = RenderSettings {
			policy: OverlapPolicy::None,
			margin: 0,
		};
		let rendered = render_frames(&object, &settings).unwrap();
		assert_eq!(rendered.frames[0][0].pixel(0, 0), 2 * 16 + 1);
	}

	#[test]
	fn empty_frame_renders_one_blank_layer() {
		let object = object_with_one_chunk(vec![vec![]]);
		let rendered = render_frames(&object, &RenderSettings::default()).unwrap();
		assert_eq!(rendered.frames[0].len(), 1);
		assert!(rendered.frames[0][0].pixels().iter().all(|&p| p == 0));
	}

	#[test]
	fn reverse_config_mirrors_animations() {
		let mut object = object_with_one_chunk(vec![vec![cel(0, 0, 0, 0)]]);
		object.animations = vec![vec![
			crate::object::xml::AnimFrameAttrs {
				id: 0,
				duration: 12,
			},
		]];
		let config = reverse_config(&object);
		assert_eq!(config.animations.len(), 1);
		assert_eq!(config.animations[0].frames[0], AnimationStep {
			frame: 0,
			duration: 12,
		});
	}
}
