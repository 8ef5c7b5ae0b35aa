//! Benchmark helper utilities for chunkcel-rs.
//!
//! This module generates synthetic frame sets for benchmarking the chunk
//! extractor without shipping binary fixtures. The generated artwork mixes
//! solid regions (friendly to large chunks), repeated stamps (exercising the
//! duplicate scans), and sparse speckle (forcing 8x8 fallbacks).

use chunkcel_types::object::{IndexedImage, LayerImage, TILE_SIZE};

/// Deterministic xorshift so benchmark inputs never change between runs.
struct Rng(u64);

impl Rng {
	fn next(&mut self) -> u32 {
		let mut x = self.0;
		x ^= x << 13;
		x ^= x >> 7;
		x ^= x << 17;
		self.0 = x;
		(x >> 32) as u32
	}
}

/// Generates `frames` synthetic layer images of `tiles_x` x `tiles_y` tiles.
///
/// Roughly one third of the canvas is a solid block, one third is a repeated
/// 16x16 stamp shared by all frames, and the rest is sparse noise.
pub fn generate_frames(frames: u32, tiles_x: u32, tiles_y: u32) -> Vec<LayerImage> {
	let mut rng = Rng(0x5EED_CAFE_F00D_u64);
	let palette = vec![0u8; 48];

	(0..frames)
		.map(|frame| {
			let width = tiles_x * TILE_SIZE;
			let height = tiles_y * TILE_SIZE;
			let mut image = IndexedImage::blank(width, height, palette.clone());

			// solid block in the top-left third
			for y in 0..height / 3 {
				for x in 0..width / 3 {
					image.set_pixel(x, y, 1);
				}
			}

			// repeated stamp, identical across frames
			let stamp_y = height / 2;
			for repeat in 0..tiles_x / 4 {
				let base_x = repeat * 4 * TILE_SIZE;
				for y in 0..16 {
					for x in 0..16 {
						let index = ((x / 4 + y / 4) % 3) as u8 + 1;
						image.set_pixel(base_x + x, stamp_y + y, index);
					}
				}
			}

			// sparse speckle in the remaining rows
			for _ in 0..(tiles_x * tiles_y) / 8 {
				let x = rng.next() % width;
				let y = height * 3 / 4 + rng.next() % (height / 4);
				image.set_pixel(x, y, (rng.next() % 15) as u8 + 1);
			}

			LayerImage {
				frame,
				layer: 0,
				image,
			}
		})
		.collect()
}

/// Common benchmark canvas sizes, in tiles.
pub mod sizes {
	/// Small sprite: 32x32 pixels
	pub const SMALL: (u32, u32) = (4, 4);
	/// Typical object: 128x128 pixels
	pub const MEDIUM: (u32, u32) = (16, 16);
	/// Large screen-effect sprite: 256x256 pixels
	pub const LARGE: (u32, u32) = (32, 32);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generation_is_deterministic() {
		let a = generate_frames(2, 8, 8);
		let b = generate_frames(2, 8, 8);
		assert_eq!(a.len(), b.len());
		for (left, right) in a.iter().zip(&b) {
			assert_eq!(left.image.pixels(), right.image.pixels());
		}
	}

	#[test]
	fn generated_frames_have_content() {
		let frames = generate_frames(1, 8, 8);
		assert!(frames[0].image.pixels().iter().any(|&p| p != 0));
	}
}
