//! Object folder parsing (reverse direction input).
//!
//! Reads the folder layout produced by the forward pipeline, or ripped from
//! the engine by other tools, back into memory: palette, chunk pool, cel
//! lists, and animation timing. Parsed data is read-only for the rest of the
//! reverse run.

use std::path::Path;

use log::info;

use super::chunk::{Chunk, ChunkPool, ChunkSize};
use super::error::{ObjectError, Stage};
use super::image::IndexedImage;
use super::palette::{GROUP_SIZE, GlobalPalette};
use super::xml::{AnimFrameAttrs, CelAttrs, parse_animations_xml, parse_frames_xml};

/// An object folder loaded into memory.
#[derive(Debug)]
pub struct ParsedObject {
	/// Shared palette from `palette.pal`
	pub palette: GlobalPalette,
	/// Chunk pool rebuilt from `imgs/`, ids matching the cel references
	pub pool: ChunkPool,
	/// Per-frame cel lists in document order
	pub frames: Vec<Vec<CelAttrs>>,
	/// Per-animation step lists in document order
	pub animations: Vec<Vec<AnimFrameAttrs>>,
}

/// Reads a complete object folder.
///
/// # Errors
///
/// Returns [`ObjectError::MissingFile`] when `palette.pal`, one of the XML
/// documents, or a referenced chunk image is absent, and parse errors for
/// malformed content.
pub fn read_object(dir: impl AsRef<Path>) -> Result<ParsedObject, ObjectError> {
	let dir = dir.as_ref();

	let palette_path = dir.join("palette.pal");
	if !palette_path.is_file() {
		return Err(ObjectError::missing_file(Stage::Parser, palette_path));
	}
	let palette = GlobalPalette::open_jasc(&palette_path)?;

	let frames = read_xml(dir, "frames.xml", parse_frames_xml)?;
	let animations = read_xml(dir, "animations.xml", parse_animations_xml)?;

	let pool = load_chunks(dir, &frames)?;

	info!(
		"object parsed from {}: {} chunks, {} frames, {} animations",
		dir.display(),
		pool.len(),
		frames.len(),
		animations.len()
	);

	Ok(ParsedObject {
		palette,
		pool,
		frames,
		animations,
	})
}

fn read_xml<T>(
	dir: &Path,
	name: &str,
	parse: impl Fn(&str, &Path) -> Result<T, ObjectError>,
) -> Result<T, ObjectError> {
	let path = dir.join(name);
	if !path.is_file() {
		return Err(ObjectError::missing_file(Stage::Parser, path));
	}
	let text = std::fs::read_to_string(&path)?;
	parse(&text, &path)
}

/// Loads every referenced chunk image, assigning pool ids 0..=max so cel
/// references stay valid. Ids with no referencing cel load too when the file
/// exists; a gap that is also referenced is an error.
fn load_chunks(dir: &Path, frames: &[Vec<CelAttrs>]) -> Result<ChunkPool, ObjectError> {
	let mut max_id = None;
	for cel in frames.iter().flatten() {
		max_id = Some(max_id.map_or(cel.img, |m: u32| m.max(cel.img)));
	}

	let mut pool = ChunkPool::new();
	let Some(max_id) = max_id else {
		return Ok(pool);
	};

	// First referencing cel decides the group a chunk is stored under.
	let group_of = |id: u32| {
		frames.iter().flatten().find(|cel| cel.img == id).map(|cel| cel.pal).unwrap_or(0)
	};

	for id in 0..=max_id {
		let path = dir.join("imgs").join(format!("{id:04}.png"));
		if !path.is_file() {
			if frames.iter().flatten().any(|cel| cel.img == id) {
				return Err(ObjectError::missing_file(Stage::Parser, path));
			}
			// unreferenced gap: keep ids aligned with a placeholder
			pool.insert_unchecked(Chunk::transparent());
			continue;
		}

		let image = IndexedImage::open(&path)?;
		let size = ChunkSize::new(image.width(), image.height());
		// engine-ripped images may store group-global indices
		let pixels = image.pixels().iter().map(|&p| p % GROUP_SIZE as u8).collect();
		pool.insert_unchecked(Chunk::new(size, group_of(id), pixels));
	}

	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_palette_is_reported() {
		let dir = std::env::temp_dir().join("chunkcel-parse-missing-pal");
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).unwrap();

		let err = read_object(&dir).expect_err("empty folder");
		assert_eq!(err.kind(), "MissingFile");
	}

	#[test]
	fn missing_xml_is_reported() {
		let dir = std::env::temp_dir().join("chunkcel-parse-missing-xml");
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).unwrap();
		GlobalPalette::from_png_bytes(&[0, 0, 0]).save_jasc(dir.join("palette.pal")).unwrap();

		let err = read_object(&dir).expect_err("no frames.xml");
		match err {
			ObjectError::MissingFile {
				path, ..
			} => assert!(path.ends_with("frames.xml")),
			other => panic!("unexpected error {other}"),
		}
	}

	#[test]
	fn empty_frame_list_yields_empty_pool() {
		let dir = std::env::temp_dir().join("chunkcel-parse-empty");
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).unwrap();
		GlobalPalette::from_png_bytes(&[0, 0, 0]).save_jasc(dir.join("palette.pal")).unwrap();
		std::fs::write(dir.join("frames.xml"), "<AnimData><Frames/></AnimData>").unwrap();
		std::fs::write(dir.join("animations.xml"), "<AnimData><Anims/></AnimData>").unwrap();

		let object = read_object(&dir).unwrap();
		assert!(object.pool.is_empty());
		assert!(object.frames.is_empty());
		assert!(object.animations.is_empty());
	}
}
