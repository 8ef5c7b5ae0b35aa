//! Chunk extraction and deduplication.
//!
//! The extractor turns layered frame images into a chunk pool and per-frame
//! cel lists in three passes:
//!
//! 1. **Intra-frame scan** (optional): per frame, per enabled size, find
//!    regions that repeat within the frame and promote them to shared chunks
//!    before the greedy cover can split them up.
//! 2. **Inter-frame scan** (optional): the same sweep across the whole frame
//!    set, matching against the global pool as well.
//! 3. **Greedy cover**: walk the enabled sizes in scan order and claim every
//!    remaining non-empty tile. 8x8 is always appended as a fallback, so
//!    coverage is total regardless of the configured size list.
//!
//! A candidate is accepted only when its whole tile rectangle is still
//! unclaimed, it contains at least one non-empty tile, and every tile row and
//! column reaches the minimum density. Accepted chunks claim all their tiles,
//! so each non-empty tile ends up in exactly one chunk.
//!
//! Layers that mix palette groups are split into one derived plane per group
//! first; a single tile mixing two groups is a fatal error.

use std::collections::HashMap;

use log::{debug, info};

use super::chunk::{Chunk, ChunkId, ChunkPool, ChunkSize};
use super::compose::{Cel, Frame};
use super::config::GeneratorConfig;
use super::error::ObjectError;
use super::image::IndexedImage;
use super::palette::GlobalPalette;
use super::tile::{TILE_SIZE, TileGrid};

/// One input image: a single layer of a single frame.
#[derive(Debug, Clone)]
pub struct LayerImage {
	/// Frame number from the filename
	pub frame: u32,
	/// Layer number from the filename
	pub layer: u32,
	/// The indexed image
	pub image: IndexedImage,
}

/// Order in which the enabled sizes are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
	/// Largest area first (production behavior)
	#[default]
	LargestFirst,
	/// Smallest area first (exists so the strategy seam stays testable)
	SmallestFirst,
}

impl ScanOrder {
	/// Arranges canonical-order sizes according to this strategy.
	pub fn arrange(&self, sizes: &[ChunkSize]) -> Vec<ChunkSize> {
		let mut sizes = sizes.to_vec();
		sizes.sort_by_key(|s| s.canonical_rank());
		if *self == ScanOrder::SmallestFirst {
			sizes.reverse();
		}
		sizes
	}
}

/// Extraction settings, usually derived from a [`GeneratorConfig`].
#[derive(Debug, Clone)]
pub struct ExtractSettings {
	/// Minimum row/column density of a chunk
	pub min_density: f32,
	/// Enabled chunk sizes (canonical order not required)
	pub sizes: Vec<ChunkSize>,
	/// Run the intra-frame duplicate pre-pass
	pub intra_scan: bool,
	/// Run the inter-frame duplicate pre-pass and pool deduplication
	pub inter_scan: bool,
	/// Scan order strategy
	pub order: ScanOrder,
}

impl ExtractSettings {
	/// Builds settings from a validated configuration.
	pub fn from_config(config: &GeneratorConfig) -> Self {
		Self {
			min_density: config.min_density,
			sizes: config.enabled_sizes(),
			intra_scan: config.intra_scan,
			inter_scan: config.inter_scan,
			order: ScanOrder::LargestFirst,
		}
	}

	/// Enabled sizes in scan order.
	fn scan_sizes(&self) -> Vec<ChunkSize> {
		self.order.arrange(&self.sizes)
	}

	/// Sizes for the greedy cover: scan order plus the 8x8 fallback.
	fn cover_sizes(&self) -> Vec<ChunkSize> {
		let mut sizes = self.scan_sizes();
		let fallback = ChunkSize::new(8, 8);
		if !sizes.contains(&fallback) {
			sizes.push(fallback);
		}
		sizes
	}
}

/// Result of an extraction run.
#[derive(Debug)]
pub struct ExtractOutput {
	/// All unique chunks, ids in insertion order
	pub pool: ChunkPool,
	/// Frames in ascending frame-number order; cels not yet sorted
	pub frames: Vec<Frame>,
}

/// A single-group working plane derived from one layer image.
#[derive(Debug)]
struct Plane {
	frame: u32,
	layer: u32,
	group: u8,
	image: IndexedImage,
	grid: TileGrid,
	/// Per tile: true while no chunk has claimed it
	free: Vec<bool>,
}

impl Plane {
	fn new(frame: u32, layer: u32, group: u8, image: IndexedImage, grid: TileGrid) -> Self {
		let tiles = (grid.tiles_x() * grid.tiles_y()) as usize;
		Self {
			frame,
			layer,
			group,
			image,
			grid,
			free: vec![true; tiles],
		}
	}

	#[inline]
	fn is_free(&self, tx: u32, ty: u32) -> bool {
		self.free[(ty * self.grid.tiles_x() + tx) as usize]
	}

	fn region_free(&self, tx: u32, ty: u32, size: ChunkSize) -> bool {
		(0..size.tiles_y()).all(|dy| (0..size.tiles_x()).all(|dx| self.is_free(tx + dx, ty + dy)))
	}

	fn claim(&mut self, tx: u32, ty: u32, size: ChunkSize) {
		for dy in 0..size.tiles_y() {
			for dx in 0..size.tiles_x() {
				let index = ((ty + dy) * self.grid.tiles_x() + tx + dx) as usize;
				self.free[index] = false;
			}
		}
	}

	/// Checks every acceptance rule except pool/tracking matching.
	fn accepts(&self, tx: u32, ty: u32, size: ChunkSize, min_density: f32) -> bool {
		self.region_free(tx, ty, size)
			&& self.grid.region_has_content(tx, ty, size.tiles_x(), size.tiles_y())
			&& self.grid.region_passes_density(
				tx,
				ty,
				size.tiles_x(),
				size.tiles_y(),
				min_density,
			)
	}

	/// Cuts the candidate into a chunk with normalized local indices.
	fn cut_chunk(&self, tx: u32, ty: u32, size: ChunkSize) -> Chunk {
		let mut pixels = Vec::with_capacity(size.area() as usize);
		for py in 0..size.height {
			for px in 0..size.width {
				let index = self.image.pixel(tx * TILE_SIZE + px, ty * TILE_SIZE + py);
				pixels.push(GlobalPalette::local_index(index));
			}
		}
		Chunk::new(size, self.group, pixels)
	}

	fn cel_at(&self, tx: u32, ty: u32, chunk: ChunkId) -> Cel {
		Cel {
			chunk,
			x: tx * TILE_SIZE,
			y: ty * TILE_SIZE,
			group: self.group,
			layer: self.layer,
		}
	}
}

/// Tracking state of a repeated-region scan, per size.
enum TrackEntry {
	/// First occurrence seen, not promoted to a chunk yet
	Pending {
		plane: usize,
		tx: u32,
		ty: u32,
		chunk: Chunk,
	},
	/// Already promoted; further occurrences just reference the id
	Promoted(ChunkId),
}

/// Whether a repeat scan may also match chunks already in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolMatch {
	/// Intra pass: only occurrences seen by this scan count
	TrackingOnly,
	/// Inter pass: pool hits produce cels immediately
	TrackingAndPool,
}

/// Runs the full extraction over validated layer images.
///
/// `layers` must be sorted by (frame, layer) and share dimensions; the
/// pipeline guarantees both.
///
/// # Errors
///
/// Returns [`ObjectError::MultiGroupTile`] when a tile mixes palette groups.
pub fn extract(
	layers: &[LayerImage],
	settings: &ExtractSettings,
) -> Result<ExtractOutput, ObjectError> {
	let mut planes = build_planes(layers)?;
	let mut pool = ChunkPool::new();
	let mut cels: HashMap<u32, Vec<Cel>> = HashMap::new();

	let scan_sizes = settings.scan_sizes();

	if settings.intra_scan {
		let frames = frame_numbers(&planes);
		for &frame in &frames {
			for &size in &scan_sizes {
				if !size_fits(&planes, size) {
					continue;
				}
				debug!("intra scan: frame {frame}, size {size}");
				let mut tracking: HashMap<Vec<u8>, TrackEntry> = HashMap::new();
				let members: Vec<usize> = (0..planes.len())
					.filter(|&i| planes[i].frame == frame)
					.collect();
				for plane_index in members {
					scan_for_repeats(
						&mut planes,
						plane_index,
						size,
						settings.min_density,
						&mut tracking,
						&mut pool,
						&mut cels,
						PoolMatch::TrackingOnly,
					);
				}
			}
		}
	}

	if settings.inter_scan {
		for &size in &scan_sizes {
			if !size_fits(&planes, size) {
				continue;
			}
			debug!("inter scan: size {size}");
			let mut tracking: HashMap<Vec<u8>, TrackEntry> = HashMap::new();
			for plane_index in 0..planes.len() {
				scan_for_repeats(
					&mut planes,
					plane_index,
					size,
					settings.min_density,
					&mut tracking,
					&mut pool,
					&mut cels,
					PoolMatch::TrackingAndPool,
				);
			}
		}
	}

	// Greedy cover of everything the pre-passes left unclaimed.
	for size in settings.cover_sizes() {
		if !size_fits(&planes, size) {
			continue;
		}
		for plane in planes.iter_mut() {
			let (tiles_x, tiles_y) = (plane.grid.tiles_x(), plane.grid.tiles_y());
			for ty in 0..tiles_y.saturating_sub(size.tiles_y() - 1) {
				for tx in 0..tiles_x.saturating_sub(size.tiles_x() - 1) {
					if !plane.accepts(tx, ty, size, settings.min_density) {
						continue;
					}
					let chunk = plane.cut_chunk(tx, ty, size);
					let id = if settings.inter_scan {
						pool.insert(chunk).0
					} else {
						pool.insert_unchecked(chunk)
					};
					cels.entry(plane.frame).or_default().push(plane.cel_at(tx, ty, id));
					plane.claim(tx, ty, size);
				}
			}
		}
	}

	// A fully transparent frame still needs one cel to exist in the object.
	let frames = frame_numbers(&planes);
	for &frame in &frames {
		if !cels.get(&frame).is_some_and(|c| !c.is_empty()) {
			let (id, _) = pool.insert(Chunk::transparent());
			cels.entry(frame).or_default().push(Cel {
				chunk: id,
				x: 0,
				y: 0,
				group: 0,
				layer: 0,
			});
		}
	}

	info!("extracted {} unique chunks over {} frames", pool.len(), frames.len());

	let frames = frames
		.into_iter()
		.map(|number| Frame {
			number,
			cels: cels.remove(&number).unwrap_or_default(),
		})
		.collect();

	Ok(ExtractOutput {
		pool,
		frames,
	})
}

/// Splits the layer images into single-group planes, ordered by
/// (frame, layer, group).
fn build_planes(layers: &[LayerImage]) -> Result<Vec<Plane>, ObjectError> {
	let mut planes = Vec::new();

	for layer in layers {
		let grid = TileGrid::build(&layer.image)?;
		let groups = grid.groups_used();

		match groups.as_slice() {
			[] => {
				// fully transparent layer; kept so its frame is known
				planes.push(Plane::new(layer.frame, layer.layer, 0, layer.image.clone(), grid));
			}
			[group] => {
				planes.push(Plane::new(layer.frame, layer.layer, *group, layer.image.clone(), grid));
			}
			_ => {
				info!(
					"Frame-{}-Layer-{}: splitting into palette planes {:?}",
					layer.frame, layer.layer, groups
				);
				for &group in &groups {
					let masked = mask_to_group(&layer.image, group);
					let grid = TileGrid::build(&masked)?;
					planes.push(Plane::new(layer.frame, layer.layer, group, masked, grid));
				}
			}
		}
	}

	Ok(planes)
}

/// Clears every pixel outside the given palette group to transparent.
fn mask_to_group(image: &IndexedImage, group: u8) -> IndexedImage {
	let pixels = image
		.pixels()
		.iter()
		.map(|&index| {
			if GlobalPalette::group_of(index) == group && !GlobalPalette::is_transparent(index) {
				index
			} else {
				0
			}
		})
		.collect();
	IndexedImage::from_parts(image.width(), image.height(), pixels, image.palette_bytes().to_vec())
}

fn frame_numbers(planes: &[Plane]) -> Vec<u32> {
	let mut numbers: Vec<u32> = planes.iter().map(|p| p.frame).collect();
	numbers.sort_unstable();
	numbers.dedup();
	numbers
}

fn size_fits(planes: &[Plane], size: ChunkSize) -> bool {
	planes.first().is_some_and(|p| {
		size.tiles_x() <= p.grid.tiles_x() && size.tiles_y() <= p.grid.tiles_y()
	})
}

/// One repeated-region sweep over a single plane at a single size.
#[allow(clippy::too_many_arguments)]
fn scan_for_repeats(
	planes: &mut [Plane],
	plane_index: usize,
	size: ChunkSize,
	min_density: f32,
	tracking: &mut HashMap<Vec<u8>, TrackEntry>,
	pool: &mut ChunkPool,
	cels: &mut HashMap<u32, Vec<Cel>>,
	pool_match: PoolMatch,
) {
	let (tiles_x, tiles_y) = {
		let plane = &planes[plane_index];
		(plane.grid.tiles_x(), plane.grid.tiles_y())
	};

	for ty in 0..tiles_y.saturating_sub(size.tiles_y() - 1) {
		for tx in 0..tiles_x.saturating_sub(size.tiles_x() - 1) {
			if !planes[plane_index].accepts(tx, ty, size, min_density) {
				continue;
			}
			let chunk = planes[plane_index].cut_chunk(tx, ty, size);
			let key = chunk.canonical_key();

			if pool_match == PoolMatch::TrackingAndPool {
				if let Some(id) = pool.lookup(&chunk) {
					let plane = &mut planes[plane_index];
					cels.entry(plane.frame).or_default().push(plane.cel_at(tx, ty, id));
					plane.claim(tx, ty, size);
					continue;
				}
			}

			match tracking.get(&key) {
				None => {
					tracking.insert(
						key,
						TrackEntry::Pending {
							plane: plane_index,
							tx,
							ty,
							chunk,
						},
					);
				}
				Some(TrackEntry::Promoted(id)) => {
					let id = *id;
					let plane = &mut planes[plane_index];
					cels.entry(plane.frame).or_default().push(plane.cel_at(tx, ty, id));
					plane.claim(tx, ty, size);
				}
				Some(TrackEntry::Pending {
					plane: first_plane,
					tx: first_tx,
					ty: first_ty,
					..
				}) => {
					let (first_plane, first_tx, first_ty) = (*first_plane, *first_tx, *first_ty);

					// A region repeating into itself within one plane is not a
					// usable duplicate.
					if first_plane == plane_index
						&& regions_overlap(first_tx, first_ty, tx, ty, size)
					{
						continue;
					}

					// The first occurrence may have been consumed by a pool hit
					// in the meantime; the current candidate takes its place.
					if !planes[first_plane].region_free(first_tx, first_ty, size) {
						tracking.insert(
							key,
							TrackEntry::Pending {
								plane: plane_index,
								tx,
								ty,
								chunk,
							},
						);
						continue;
					}

					let (id, _) = pool.insert(chunk);
					tracking.insert(key, TrackEntry::Promoted(id));

					let plane = &mut planes[first_plane];
					cels.entry(plane.frame).or_default().push(plane.cel_at(first_tx, first_ty, id));
					plane.claim(first_tx, first_ty, size);

					let plane = &mut planes[plane_index];
					cels.entry(plane.frame).or_default().push(plane.cel_at(tx, ty, id));
					plane.claim(tx, ty, size);
				}
			}
		}
	}
}

fn regions_overlap(ax: u32, ay: u32, bx: u32, by: u32, size: ChunkSize) -> bool {
	ax < bx + size.tiles_x() && bx < ax + size.tiles_x() && ay < by + size.tiles_y()
		&& by < ay + size.tiles_y()
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Builds a W x H layer image from tile fill indices (0 = empty).
	fn layer(frame: u32, layer_no: u32, tiles_x: u32, tiles_y: u32, fills: &[u8]) -> LayerImage {
		assert_eq!(fills.len() as u32, tiles_x * tiles_y);
		let mut image = IndexedImage::blank(tiles_x * TILE_SIZE, tiles_y * TILE_SIZE, vec![0; 96]);
		for ty in 0..tiles_y {
			for tx in 0..tiles_x {
				let fill = fills[(ty * tiles_x + tx) as usize];
				if fill == 0 {
					continue;
				}
				for py in 0..TILE_SIZE {
					for px in 0..TILE_SIZE {
						image.set_pixel(tx * TILE_SIZE + px, ty * TILE_SIZE + py, fill);
					}
				}
			}
		}
		LayerImage {
			frame,
			layer: layer_no,
			image,
		}
	}

	fn settings(sizes: &[(u32, u32)], intra: bool, inter: bool) -> ExtractSettings {
		ExtractSettings {
			min_density: 0.5,
			sizes: sizes.iter().map(|&(w, h)| ChunkSize::new(w, h)).collect(),
			intra_scan: intra,
			inter_scan: inter,
			order: ScanOrder::LargestFirst,
		}
	}

	#[test]
	fn solid_square_becomes_one_chunk_per_frame_pool_shared() {
		// two identical 16x16 frames, 16x16 enabled, inter on
		let layers = vec![
			layer(0, 0, 2, 2, &[1, 1, 1, 1]),
			layer(1, 0, 2, 2, &[1, 1, 1, 1]),
		];
		let out = extract(&layers, &settings(&[(16, 16)], false, true)).unwrap();
		assert_eq!(out.pool.len(), 1);
		assert_eq!(out.frames.len(), 2);
		for frame in &out.frames {
			assert_eq!(frame.cels.len(), 1);
			assert_eq!(frame.cels[0].chunk, 0);
			assert_eq!((frame.cels[0].x, frame.cels[0].y), (0, 0));
		}
	}

	#[test]
	fn density_failure_falls_back_to_8x8() {
		// only tile (0,0) filled; the 16x16 candidate fails column density
		let layers = vec![layer(0, 0, 2, 2, &[1, 0, 0, 0])];
		let out = extract(&layers, &settings(&[(16, 16)], false, true)).unwrap();
		assert_eq!(out.pool.len(), 1);
		let chunk = out.pool.get(0).unwrap();
		assert_eq!(chunk.size(), ChunkSize::new(8, 8));
		assert_eq!(out.frames[0].cels.len(), 1);
	}

	#[test]
	fn inter_scan_off_duplicates_chunks() {
		let layers = vec![
			layer(0, 0, 2, 2, &[1, 1, 1, 1]),
			layer(1, 0, 2, 2, &[1, 1, 1, 1]),
		];
		let out = extract(&layers, &settings(&[(16, 16)], false, false)).unwrap();
		assert_eq!(out.pool.len(), 2, "no deduplication without the inter scan");
	}

	#[test]
	fn mixed_group_layer_is_split_per_group() {
		// tiles reference palette groups {0, 0, 1, 0}
		let layers = vec![layer(0, 0, 2, 2, &[1, 1, 17, 1])];
		let out = extract(&layers, &settings(&[(16, 16)], false, true)).unwrap();
		let mut groups: Vec<u8> = out.pool.iter().map(|(_, c)| c.group()).collect();
		groups.sort_unstable();
		groups.dedup();
		assert_eq!(groups, vec![0, 1]);
		assert!(out.pool.len() >= 2);
	}

	#[test]
	fn intra_scan_promotes_repeats_within_a_frame() {
		// Two identical 8x8 tiles far apart in one frame
		let layers = vec![layer(0, 0, 4, 1, &[5, 0, 0, 5])];
		let out = extract(&layers, &settings(&[(8, 8)], true, false)).unwrap();
		assert_eq!(out.pool.len(), 1);
		assert_eq!(out.frames[0].cels.len(), 2);
		assert!(out.frames[0].cels.iter().all(|c| c.chunk == 0));
	}

	#[test]
	fn transparent_frame_gets_a_blank_cel() {
		let layers = vec![layer(0, 0, 2, 2, &[0, 0, 0, 0])];
		let out = extract(&layers, &settings(&[(16, 16)], false, true)).unwrap();
		assert_eq!(out.pool.len(), 1);
		assert!(out.pool.get(0).unwrap().is_blank());
		assert_eq!(out.frames[0].cels.len(), 1);
	}

	#[test]
	fn coverage_is_total_and_exclusive() {
		// every non-empty tile must land in exactly one chunk
		let layers = vec![layer(0, 0, 4, 4, &[
			1, 1, 0, 2, //
			1, 1, 0, 0, //
			0, 0, 3, 3, //
			9, 0, 3, 3, //
		])];
		let out = extract(&layers, &settings(&[(16, 16), (8, 8)], false, true)).unwrap();

		let mut covered = vec![0u8; 16];
		for cel in &out.frames[0].cels {
			let chunk = out.pool.get(cel.chunk).unwrap();
			for dy in 0..chunk.height() / TILE_SIZE {
				for dx in 0..chunk.width() / TILE_SIZE {
					let tx = cel.x / TILE_SIZE + dx;
					let ty = cel.y / TILE_SIZE + dy;
					covered[(ty * 4 + tx) as usize] += 1;
				}
			}
		}

		let nonempty = [0usize, 1, 3, 4, 5, 10, 11, 12, 14, 15];
		for (index, &count) in covered.iter().enumerate() {
			if nonempty.contains(&index) {
				assert_eq!(count, 1, "tile {index} must be covered exactly once");
			} else {
				assert!(count <= 1, "tile {index} covered {count} times");
			}
		}
	}

	#[test]
	fn emitted_chunks_obey_density_and_single_group() {
		// density and single-group rules over a sparse layout
		let layers = vec![layer(0, 0, 4, 4, &[
			1, 0, 0, 0, //
			0, 1, 0, 0, //
			0, 0, 17, 0, //
			0, 0, 0, 17, //
		])];
		let out = extract(&layers, &settings(&[(32, 32), (16, 16), (8, 8)], false, true)).unwrap();
		for (_, chunk) in out.pool.iter() {
			let (tw, th) = (chunk.width() / TILE_SIZE, chunk.height() / TILE_SIZE);
			let tile_filled = |tx: u32, ty: u32| {
				(0..TILE_SIZE).any(|py| {
					(0..TILE_SIZE)
						.any(|px| chunk.pixel(tx * TILE_SIZE + px, ty * TILE_SIZE + py) != 0)
				})
			};
			for ty in 0..th {
				let filled = (0..tw).filter(|&tx| tile_filled(tx, ty)).count();
				assert!(filled as f32 / tw as f32 >= 0.5, "row {ty} of {chunk} too sparse");
			}
			for tx in 0..tw {
				let filled = (0..th).filter(|&ty| tile_filled(tx, ty)).count();
				assert!(filled as f32 / th as f32 >= 0.5, "column {tx} of {chunk} too sparse");
			}
		}
	}

	#[test]
	fn scan_order_strategies_arrange_sizes() {
		let sizes = vec![ChunkSize::new(8, 8), ChunkSize::new(64, 64)];
		assert_eq!(
			ScanOrder::LargestFirst.arrange(&sizes),
			vec![ChunkSize::new(64, 64), ChunkSize::new(8, 8)]
		);
		assert_eq!(
			ScanOrder::SmallestFirst.arrange(&sizes),
			vec![ChunkSize::new(8, 8), ChunkSize::new(64, 64)]
		);
	}

	#[test]
	fn empty_size_list_covers_with_fallback_only() {
		let layers = vec![layer(0, 0, 2, 2, &[1, 1, 1, 1])];
		let out = extract(&layers, &settings(&[], false, true)).unwrap();
		assert_eq!(out.frames[0].cels.len(), 4);
		assert!(out.pool.iter().all(|(_, c)| c.size() == ChunkSize::new(8, 8)));
	}
}
