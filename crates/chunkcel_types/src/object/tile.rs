//! Tile grid view (8x8 tiles over an indexed image).
//!
//! The grid precomputes, per tile, whether the tile is empty (every pixel
//! references a transparent color) and which palette group its non-transparent
//! pixels belong to. Chunk candidates are judged against rectangular tile
//! regions of this grid: row/column density and the single-group rule.

use super::error::{ObjectError, Stage};
use super::image::IndexedImage;
use super::palette::GlobalPalette;

/// Tile edge length in pixels
pub const TILE_SIZE: u32 = 8;

/// Palette group summary of a tile region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionGroup {
	/// Every tile in the region is empty
	Empty,
	/// All non-empty tiles share one palette group
	Single(u8),
	/// Non-empty tiles reference at least two palette groups
	Mixed(u8, u8),
}

/// Precomputed 8x8 tile metadata for one image.
#[derive(Debug, Clone)]
pub struct TileGrid {
	tiles_x: u32,
	tiles_y: u32,
	empty: Vec<bool>,
	group: Vec<Option<u8>>,
}

impl TileGrid {
	/// Builds the grid for an image whose dimensions are multiples of 8.
	///
	/// # Errors
	///
	/// Returns [`ObjectError::MultiGroupTile`] if a single tile references
	/// colors from two different palette groups.
	pub fn build(image: &IndexedImage) -> Result<Self, ObjectError> {
		debug_assert_eq!(image.width() % TILE_SIZE, 0);
		debug_assert_eq!(image.height() % TILE_SIZE, 0);

		let tiles_x = image.width() / TILE_SIZE;
		let tiles_y = image.height() / TILE_SIZE;
		let mut empty = Vec::with_capacity((tiles_x * tiles_y) as usize);
		let mut group = Vec::with_capacity((tiles_x * tiles_y) as usize);

		for ty in 0..tiles_y {
			for tx in 0..tiles_x {
				let mut tile_group: Option<u8> = None;
				for py in 0..TILE_SIZE {
					for px in 0..TILE_SIZE {
						let index = image.pixel(tx * TILE_SIZE + px, ty * TILE_SIZE + py);
						if GlobalPalette::is_transparent(index) {
							continue;
						}
						let g = GlobalPalette::group_of(index);
						match tile_group {
							None => tile_group = Some(g),
							Some(existing) if existing != g => {
								return Err(ObjectError::MultiGroupTile {
									stage: Stage::Extractor,
									tx,
									ty,
									group_a: existing,
									group_b: g,
								});
							}
							Some(_) => {}
						}
					}
				}
				empty.push(tile_group.is_none());
				group.push(tile_group);
			}
		}

		Ok(Self {
			tiles_x,
			tiles_y,
			empty,
			group,
		})
	}

	/// Returns the number of tile columns.
	pub fn tiles_x(&self) -> u32 {
		self.tiles_x
	}

	/// Returns the number of tile rows.
	pub fn tiles_y(&self) -> u32 {
		self.tiles_y
	}

	/// Returns true if the tile at (tx, ty) is empty.
	#[inline]
	pub fn is_empty(&self, tx: u32, ty: u32) -> bool {
		self.empty[(ty * self.tiles_x + tx) as usize]
	}

	/// Returns the palette group of the tile at (tx, ty), or None for empty tiles.
	#[inline]
	pub fn group(&self, tx: u32, ty: u32) -> Option<u8> {
		self.group[(ty * self.tiles_x + tx) as usize]
	}

	/// Returns the sorted list of palette groups used anywhere in the image.
	pub fn groups_used(&self) -> Vec<u8> {
		let mut groups: Vec<u8> = self.group.iter().flatten().copied().collect();
		groups.sort_unstable();
		groups.dedup();
		groups
	}

	/// Returns true if the image has no non-empty tile at all.
	pub fn is_fully_transparent(&self) -> bool {
		self.empty.iter().all(|&e| e)
	}

	/// Fraction of non-empty tiles in row `row` of the `tw` x `th` tile region
	/// anchored at (tx0, ty0).
	pub fn row_density(&self, tx0: u32, ty0: u32, tw: u32, th: u32, row: u32) -> f32 {
		debug_assert!(row < th);
		let filled = (0..tw).filter(|&dx| !self.is_empty(tx0 + dx, ty0 + row)).count();
		filled as f32 / tw as f32
	}

	/// Fraction of non-empty tiles in column `col` of the `tw` x `th` tile
	/// region anchored at (tx0, ty0).
	pub fn col_density(&self, tx0: u32, ty0: u32, tw: u32, th: u32, col: u32) -> f32 {
		debug_assert!(col < tw);
		let filled = (0..th).filter(|&dy| !self.is_empty(tx0 + col, ty0 + dy)).count();
		filled as f32 / th as f32
	}

	/// Returns true if every tile row and column of the region reaches
	/// `min_density` non-empty tiles.
	pub fn region_passes_density(
		&self,
		tx0: u32,
		ty0: u32,
		tw: u32,
		th: u32,
		min_density: f32,
	) -> bool {
		(0..th).all(|row| self.row_density(tx0, ty0, tw, th, row) >= min_density)
			&& (0..tw).all(|col| self.col_density(tx0, ty0, tw, th, col) >= min_density)
	}

	/// Returns true if the region contains at least one non-empty tile.
	pub fn region_has_content(&self, tx0: u32, ty0: u32, tw: u32, th: u32) -> bool {
		(0..th).any(|dy| (0..tw).any(|dx| !self.is_empty(tx0 + dx, ty0 + dy)))
	}

	/// Summarizes the palette groups of the non-empty tiles in the region.
	pub fn region_group(&self, tx0: u32, ty0: u32, tw: u32, th: u32) -> RegionGroup {
		let mut seen: Option<u8> = None;
		for dy in 0..th {
			for dx in 0..tw {
				if let Some(g) = self.group(tx0 + dx, ty0 + dy) {
					match seen {
						None => seen = Some(g),
						Some(existing) if existing != g => return RegionGroup::Mixed(existing, g),
						Some(_) => {}
					}
				}
			}
		}
		match seen {
			Some(g) => RegionGroup::Single(g),
			None => RegionGroup::Empty,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// 16x16 image with the tile at (tx, ty) filled with `index`.
	fn image_with_tiles(filled: &[(u32, u32, u8)]) -> IndexedImage {
		let mut img = IndexedImage::blank(16, 16, vec![0; 96]);
		for &(tx, ty, index) in filled {
			for py in 0..TILE_SIZE {
				for px in 0..TILE_SIZE {
					img.set_pixel(tx * TILE_SIZE + px, ty * TILE_SIZE + py, index);
				}
			}
		}
		img
	}

	#[test]
	fn empty_detection_uses_local_index() {
		// index 16 is the transparent color of group 1
		let img = image_with_tiles(&[(0, 0, 16)]);
		let grid = TileGrid::build(&img).unwrap();
		assert!(grid.is_empty(0, 0));
		assert!(grid.is_fully_transparent());
	}

	#[test]
	fn tile_groups_are_recorded() {
		let img = image_with_tiles(&[(0, 0, 1), (1, 1, 17)]);
		let grid = TileGrid::build(&img).unwrap();
		assert_eq!(grid.group(0, 0), Some(0));
		assert_eq!(grid.group(1, 1), Some(1));
		assert_eq!(grid.group(1, 0), None);
		assert_eq!(grid.groups_used(), vec![0, 1]);
	}

	#[test]
	fn mixed_tile_is_fatal() {
		let mut img = image_with_tiles(&[(0, 0, 1)]);
		img.set_pixel(0, 0, 17);
		let err = TileGrid::build(&img).expect_err("tile mixes groups 0 and 1");
		assert_eq!(err.kind(), "MultiGroupTile");
	}

	#[test]
	fn densities_count_nonempty_tiles() {
		let img = image_with_tiles(&[(0, 0, 1)]);
		let grid = TileGrid::build(&img).unwrap();
		assert_eq!(grid.row_density(0, 0, 2, 2, 0), 0.5);
		assert_eq!(grid.row_density(0, 0, 2, 2, 1), 0.0);
		assert_eq!(grid.col_density(0, 0, 2, 2, 0), 0.5);
		assert!(grid.region_passes_density(0, 0, 1, 1, 1.0));
		assert!(!grid.region_passes_density(0, 0, 2, 2, 0.5));
	}

	#[test]
	fn region_group_summary() {
		let img = image_with_tiles(&[(0, 0, 1), (1, 0, 17)]);
		let grid = TileGrid::build(&img).unwrap();
		assert_eq!(grid.region_group(0, 0, 1, 1), RegionGroup::Single(0));
		assert_eq!(grid.region_group(0, 1, 2, 1), RegionGroup::Empty);
		assert_eq!(grid.region_group(0, 0, 2, 1), RegionGroup::Mixed(0, 1));
	}
}
