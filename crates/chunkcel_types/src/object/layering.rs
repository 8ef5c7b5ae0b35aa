//! Overlap resolution for the reverse direction.
//!
//! Cels parsed from `frames.xml` carry no layer information; the resolver
//! assigns one so that no two cels on the same layer conflict under the
//! selected policy. Assignment is first-fit in document order: each cel goes
//! to the lowest-numbered layer it does not conflict with, opening a new
//! layer when none fits. First-fit is deliberate: the layer numbering is
//! part of the observable output and must stay stable across runs.

use std::fmt;
use std::str::FromStr;

use super::chunk::ChunkPool;
use super::error::{ObjectError, Stage};
use super::xml::CelAttrs;

/// Conflict policy between two cels.
///
/// Under every policy except `None`, cels sharing a palette group never
/// conflict: a layer image can always express overlapping artwork of one
/// group, later cels simply paint over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
	/// Conflict iff bounding rectangles intersect and palette groups differ
	Chunk,
	/// Conflict iff some pixel position is non-transparent in both and
	/// palette groups differ
	Pixel,
	/// Conflict iff palette groups differ, positions are irrelevant
	Palette,
	/// Never conflict; everything lands on layer 0
	#[default]
	None,
}

impl FromStr for OverlapPolicy {
	type Err = ObjectError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"chunk" => Ok(Self::Chunk),
			"pixel" => Ok(Self::Pixel),
			"palette" => Ok(Self::Palette),
			"none" => Ok(Self::None),
			other => Err(ObjectError::invalid_config(
				Stage::Layering,
				format!("unknown overlap policy {other:?} (chunk, pixel, palette, none)"),
			)),
		}
	}
}

impl fmt::Display for OverlapPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Chunk => write!(f, "chunk"),
			Self::Pixel => write!(f, "pixel"),
			Self::Palette => write!(f, "palette"),
			Self::None => write!(f, "none"),
		}
	}
}

/// Assigns a layer to every cel of one frame, first-fit in input order.
///
/// # Errors
///
/// Returns [`ObjectError::UnknownChunk`] when a cel references a chunk id
/// that is not in the pool (the chunk dimensions and pixels decide
/// conflicts under the `chunk` and `pixel` policies).
pub fn assign_layers(
	cels: &[CelAttrs],
	pool: &ChunkPool,
	policy: OverlapPolicy,
) -> Result<Vec<u32>, ObjectError> {
	let mut assignment = Vec::with_capacity(cels.len());
	let mut layers: Vec<Vec<usize>> = Vec::new();

	for (index, cel) in cels.iter().enumerate() {
		let mut placed = None;
		for (layer_no, members) in layers.iter().enumerate() {
			let mut fits = true;
			for &other in members {
				if conflicts(cel, &cels[other], pool, policy)? {
					fits = false;
					break;
				}
			}
			if fits {
				placed = Some(layer_no);
				break;
			}
		}

		let layer_no = match placed {
			Some(layer_no) => layer_no,
			None => {
				layers.push(Vec::new());
				layers.len() - 1
			}
		};
		layers[layer_no].push(index);
		assignment.push(layer_no as u32);
	}

	Ok(assignment)
}

/// Decides whether two cels conflict under the policy.
fn conflicts(
	a: &CelAttrs,
	b: &CelAttrs,
	pool: &ChunkPool,
	policy: OverlapPolicy,
) -> Result<bool, ObjectError> {
	match policy {
		OverlapPolicy::None => Ok(false),
		OverlapPolicy::Palette => Ok(a.pal != b.pal),
		OverlapPolicy::Chunk => {
			if a.pal == b.pal {
				return Ok(false);
			}
			let (aw, ah) = chunk_dims(a, pool)?;
			let (bw, bh) = chunk_dims(b, pool)?;
			Ok(rects_intersect(a.x, a.y, aw, ah, b.x, b.y, bw, bh))
		}
		OverlapPolicy::Pixel => {
			if a.pal == b.pal {
				return Ok(false);
			}
			pixels_overlap(a, b, pool)
		}
	}
}

fn chunk_dims(cel: &CelAttrs, pool: &ChunkPool) -> Result<(i32, i32), ObjectError> {
	let chunk = pool.get(cel.img).ok_or(ObjectError::UnknownChunk {
		stage: Stage::Layering,
		chunk_id: cel.img,
	})?;
	Ok((chunk.width() as i32, chunk.height() as i32))
}

fn rects_intersect(ax: i32, ay: i32, aw: i32, ah: i32, bx: i32, by: i32, bw: i32, bh: i32) -> bool {
	ax < bx + bw && bx < ax + aw && ay < by + bh && by < ay + ah
}

/// True when some position is non-transparent in both cels.
fn pixels_overlap(a: &CelAttrs, b: &CelAttrs, pool: &ChunkPool) -> Result<bool, ObjectError> {
	let chunk_a = pool.get(a.img).ok_or(ObjectError::UnknownChunk {
		stage: Stage::Layering,
		chunk_id: a.img,
	})?;
	let chunk_b = pool.get(b.img).ok_or(ObjectError::UnknownChunk {
		stage: Stage::Layering,
		chunk_id: b.img,
	})?;

	let x0 = a.x.max(b.x);
	let y0 = a.y.max(b.y);
	let x1 = (a.x + chunk_a.width() as i32).min(b.x + chunk_b.width() as i32);
	let y1 = (a.y + chunk_a.height() as i32).min(b.y + chunk_b.height() as i32);

	for y in y0..y1 {
		for x in x0..x1 {
			let pa = chunk_a.pixel((x - a.x) as u32, (y - a.y) as u32);
			let pb = chunk_b.pixel((x - b.x) as u32, (y - b.y) as u32);
			if pa != 0 && pb != 0 {
				return Ok(true);
			}
		}
	}
	Ok(false)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::object::chunk::{Chunk, ChunkSize};

	fn pool_with_chunks(specs: &[(u32, u32, &[u8])]) -> ChunkPool {
		let mut pool = ChunkPool::new();
		for &(w, h, fill) in specs {
			let size = ChunkSize::new(w, h);
			let mut pixels = vec![0u8; size.area() as usize];
			pixels[..fill.len()].copy_from_slice(fill);
			pool.insert_unchecked(Chunk::new(size, 0, pixels));
		}
		pool
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
	fn same_palette_never_conflicts_under_chunk_policy() {
		// two cels at the same position sharing pal=0
		let pool = pool_with_chunks(&[(8, 8, &[1; 64])]);
		let cels = vec![cel(0, 0, 0, 0), cel(0, 0, 0, 0)];
		let layers = assign_layers(&cels, &pool, OverlapPolicy::Chunk).unwrap();
		assert_eq!(layers, vec![0, 0]);
		let layers = assign_layers(&cels, &pool, OverlapPolicy::Palette).unwrap();
		assert_eq!(layers, vec![0, 0]);
	}

	#[test]
	fn chunk_policy_splits_overlapping_groups() {
		let pool = pool_with_chunks(&[(8, 8, &[1; 64])]);
		let cels = vec![cel(0, 0, 0, 0), cel(0, 4, 4, 1), cel(0, 32, 0, 1)];
		let layers = assign_layers(&cels, &pool, OverlapPolicy::Chunk).unwrap();
		// cel 1 overlaps cel 0 with another palette; cel 2 is clear of cel 0
		// but shares a layer candidate with cel 1 (same palette, no conflict)
		assert_eq!(layers, vec![0, 1, 0]);
	}

	#[test]
	fn pixel_policy_ignores_transparent_overlap() {
		// chunk 1 is non-transparent only in its top-left pixel
		let mut top_left = vec![0u8; 64];
		top_left[0] = 1;
		let mut pool = ChunkPool::new();
		pool.insert_unchecked(Chunk::new(ChunkSize::new(8, 8), 0, vec![1; 64]));
		pool.insert_unchecked(Chunk::new(ChunkSize::new(8, 8), 0, top_left));

		// rectangles overlap, but cel 1's only opaque pixel lands outside cel 0
		let cels = vec![cel(0, 0, 0, 0), cel(1, 8, 0, 1)];
		assert_eq!(assign_layers(&cels, &pool, OverlapPolicy::Pixel).unwrap(), vec![0, 0]);

		// shifted so the opaque pixel lands inside cel 0
		let cels = vec![cel(0, 0, 0, 0), cel(1, 4, 0, 1)];
		assert_eq!(assign_layers(&cels, &pool, OverlapPolicy::Pixel).unwrap(), vec![0, 1]);
	}

	#[test]
	fn palette_policy_partitions_by_group() {
		let pool = pool_with_chunks(&[(8, 8, &[1; 64])]);
		let cels = vec![cel(0, 0, 0, 0), cel(0, 64, 0, 1), cel(0, 128, 0, 0)];
		let layers = assign_layers(&cels, &pool, OverlapPolicy::Palette).unwrap();
		assert_eq!(layers, vec![0, 1, 0]);
	}

	#[test]
	fn none_policy_uses_a_single_layer() {
		let pool = pool_with_chunks(&[(8, 8, &[1; 64])]);
		let cels = vec![cel(0, 0, 0, 0), cel(0, 0, 0, 3), cel(0, 0, 0, 7)];
		let layers = assign_layers(&cels, &pool, OverlapPolicy::None).unwrap();
		assert_eq!(layers, vec![0, 0, 0]);
	}

	#[test]
	fn unknown_chunk_is_reported() {
		let pool = ChunkPool::new();
		let cels = vec![cel(9, 0, 0, 0), cel(9, 0, 0, 1)];
		let err = assign_layers(&cels, &pool, OverlapPolicy::Chunk).expect_err("empty pool");
		assert_eq!(err.kind(), "UnknownChunk");
	}

	#[test]
	fn policy_parsing() {
		assert_eq!("chunk".parse::<OverlapPolicy>().unwrap(), OverlapPolicy::Chunk);
		assert_eq!("NONE".parse::<OverlapPolicy>().unwrap(), OverlapPolicy::None);
		assert!("stack".parse::<OverlapPolicy>().is_err());
	}
}
