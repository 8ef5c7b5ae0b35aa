//! Frame composition and memory accounting.
//!
//! The composer takes the cels the extractor emitted, orders them the way the
//! engine consumes them, and checks each frame against the engine's render
//! and VRAM limits. Limit violations are warnings, not errors: the object is
//! still written, the caller decides what to do with the report.

use std::collections::HashSet;
use std::fmt;

use log::warn;

use super::chunk::{ChunkId, ChunkPool};

/// Hard per-frame cel limit of the engine renderer
pub const MAX_CELS_PER_FRAME: usize = 108;

/// Cel count above which base-game data never goes
pub const SOFT_CELS_PER_FRAME: usize = 80;

/// Default per-animation VRAM budget in tile units (0x3C0)
pub const DEFAULT_MEMORY_BUDGET: u32 = 0x3C0;

/// Memory use above which base-game objects never go, in tile units
pub const SOFT_MEMORY_LIMIT: u32 = 552;

/// A chunk placement inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cel {
	/// Referenced chunk
	pub chunk: ChunkId,
	/// X origin in pixels, sprite-local (multiple of 8)
	pub x: u32,
	/// Y origin in pixels, sprite-local (multiple of 8)
	pub y: u32,
	/// Palette group
	pub group: u8,
	/// Source layer index from the input filename
	pub layer: u32,
}

/// One frame: an ordered list of cels.
#[derive(Debug, Clone, Default)]
pub struct Frame {
	/// Frame number from the input filenames
	pub number: u32,
	/// Cels in composition order
	pub cels: Vec<Cel>,
}

impl Frame {
	/// Creates an empty frame.
	pub fn new(number: u32) -> Self {
		Self {
			number,
			cels: Vec::new(),
		}
	}

	/// Distinct chunk ids referenced by this frame.
	pub fn distinct_chunks(&self) -> Vec<ChunkId> {
		let mut seen = HashSet::new();
		let mut ids = Vec::new();
		for cel in &self.cels {
			if seen.insert(cel.chunk) {
				ids.push(cel.chunk);
			}
		}
		ids
	}

	/// VRAM cost in tile units: distinct chunks only, duplicates within the
	/// frame are uploaded once.
	pub fn memory_cost(&self, pool: &ChunkPool) -> u32 {
		self.distinct_chunks()
			.iter()
			.filter_map(|&id| pool.get(id))
			.map(|chunk| chunk.memory_cost())
			.sum()
	}

	/// Sorts the cels into engine order: layer, then y, then x.
	pub fn sort_cels(&mut self) {
		self.cels.sort_by_key(|cel| (cel.layer, cel.y, cel.x));
	}
}

impl fmt::Display for Frame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Frame-{} ({} cels)", self.number, self.cels.len())
	}
}

/// A limit violation noticed while composing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeWarning {
	/// A frame exceeds the hard per-frame cel limit
	ChunkLimitExceeded {
		/// Offending frame number
		frame: u32,
		/// Cel count of the frame
		count: usize,
	},
	/// A frame uses more cels than any base-game frame
	HighChunkCount {
		/// Offending frame number
		frame: u32,
		/// Cel count of the frame
		count: usize,
	},
	/// A frame exceeds the VRAM budget
	MemoryLimitExceeded {
		/// Offending frame number
		frame: u32,
		/// Memory use in tile units
		memory: u32,
		/// Budget in tile units
		budget: u32,
	},
	/// A frame uses more memory than any base-game object
	HighMemoryUse {
		/// Offending frame number
		frame: u32,
		/// Memory use in tile units
		memory: u32,
	},
}

impl fmt::Display for ComposeWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ChunkLimitExceeded {
				frame,
				count,
			} => write!(
				f,
				"Frame-{frame} uses {count} cels, exceeding the render limit of {MAX_CELS_PER_FRAME}"
			),
			Self::HighChunkCount {
				frame,
				count,
			} => write!(
				f,
				"Frame-{frame} uses {count} cels; base-game frames stay at or below {SOFT_CELS_PER_FRAME}"
			),
			Self::MemoryLimitExceeded {
				frame,
				memory,
				budget,
			} => write!(
				f,
				"Frame-{frame} uses {memory} tile units, exceeding the budget of {budget}"
			),
			Self::HighMemoryUse {
				frame,
				memory,
			} => write!(
				f,
				"Frame-{frame} uses {memory} tile units; base-game objects stay at or below {SOFT_MEMORY_LIMIT}"
			),
		}
	}
}

/// Per-frame accounting result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
	/// Frame number
	pub number: u32,
	/// Number of cels
	pub cel_count: usize,
	/// VRAM cost in tile units
	pub memory: u32,
}

/// Result of composing a frame set.
#[derive(Debug, Clone, Default)]
pub struct ComposeReport {
	/// Per-frame statistics, in frame order
	pub frames: Vec<FrameStats>,
	/// Highest per-frame memory use
	pub max_memory: u32,
	/// Unique chunks across the whole object
	pub total_chunks: usize,
	/// Limit violations, in frame order
	pub warnings: Vec<ComposeWarning>,
}

impl ComposeReport {
	/// Returns true if a hard limit was crossed.
	pub fn has_hard_violation(&self) -> bool {
		self.warnings.iter().any(|w| {
			matches!(
				w,
				ComposeWarning::ChunkLimitExceeded { .. } | ComposeWarning::MemoryLimitExceeded { .. }
			)
		})
	}
}

/// Sorts every frame's cels and computes the accounting report.
///
/// Warnings are logged through `log::warn!` and collected in the report.
pub fn compose(frames: &mut [Frame], pool: &ChunkPool, memory_budget: u32) -> ComposeReport {
	let mut report = ComposeReport {
		total_chunks: pool.len(),
		..ComposeReport::default()
	};

	for frame in frames.iter_mut() {
		frame.sort_cels();

		let cel_count = frame.cels.len();
		let memory = frame.memory_cost(pool);
		report.frames.push(FrameStats {
			number: frame.number,
			cel_count,
			memory,
		});
		report.max_memory = report.max_memory.max(memory);

		if cel_count > MAX_CELS_PER_FRAME {
			report.warnings.push(ComposeWarning::ChunkLimitExceeded {
				frame: frame.number,
				count: cel_count,
			});
		} else if cel_count > SOFT_CELS_PER_FRAME {
			report.warnings.push(ComposeWarning::HighChunkCount {
				frame: frame.number,
				count: cel_count,
			});
		}

		if memory > memory_budget {
			report.warnings.push(ComposeWarning::MemoryLimitExceeded {
				frame: frame.number,
				memory,
				budget: memory_budget,
			});
		} else if memory > SOFT_MEMORY_LIMIT {
			report.warnings.push(ComposeWarning::HighMemoryUse {
				frame: frame.number,
				memory,
			});
		}
	}

	for warning in &report.warnings {
		warn!("{warning}");
	}

	report
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::object::chunk::{Chunk, ChunkSize};

	fn pool_with_sizes(sizes: &[ChunkSize]) -> ChunkPool {
		let mut pool = ChunkPool::new();
		for (i, &size) in sizes.iter().enumerate() {
			// vary one pixel so every chunk is unique
			let mut pixels = vec![1; size.area() as usize];
			pixels[0] = (i % 15) as u8 + 1;
			pool.insert(Chunk::new(size, 0, pixels));
		}
		pool
	}

	fn cel(chunk: ChunkId, x: u32, y: u32, layer: u32) -> Cel {
		Cel {
			chunk,
			x,
			y,
			group: 0,
			layer,
		}
	}

	#[test]
	fn cels_sort_by_layer_then_y_then_x() {
		let mut frame = Frame::new(0);
		frame.cels = vec![cel(0, 8, 0, 1), cel(1, 0, 8, 0), cel(2, 8, 0, 0), cel(3, 0, 0, 0)];
		frame.sort_cels();
		let order: Vec<ChunkId> = frame.cels.iter().map(|c| c.chunk).collect();
		assert_eq!(order, vec![3, 2, 1, 0]);
	}

	#[test]
	fn memory_counts_distinct_chunks_once() {
		let pool = pool_with_sizes(&[ChunkSize::new(32, 32), ChunkSize::new(8, 8)]);
		let mut frame = Frame::new(0);
		frame.cels = vec![cel(0, 0, 0, 0), cel(0, 32, 0, 0), cel(1, 64, 0, 0)];
		// 32x32 = 16 tiles, duplicate placement free, 8x8 rounds to 4
		assert_eq!(frame.memory_cost(&pool), 20);
	}

	#[test]
	fn report_flags_memory_budget() {
		let pool = pool_with_sizes(&[ChunkSize::new(64, 64)]);
		let mut frames = vec![Frame::new(0)];
		frames[0].cels = vec![cel(0, 0, 0, 0)];
		let report = compose(&mut frames, &pool, 32);
		assert_eq!(report.max_memory, 64);
		assert!(report.has_hard_violation());
		assert!(matches!(report.warnings[0], ComposeWarning::MemoryLimitExceeded { .. }));
	}

	#[test]
	fn report_flags_cel_count() {
		let pool = pool_with_sizes(&[ChunkSize::new(8, 8)]);
		let mut frames = vec![Frame::new(3)];
		frames[0].cels = (0..MAX_CELS_PER_FRAME as u32 + 1).map(|i| cel(0, i * 8, 0, 0)).collect();
		let report = compose(&mut frames, &pool, DEFAULT_MEMORY_BUDGET);
		assert!(report
			.warnings
			.iter()
			.any(|w| matches!(w, ComposeWarning::ChunkLimitExceeded { frame: 3, .. })));
	}

	#[test]
	fn within_limits_yields_no_warnings() {
		let pool = pool_with_sizes(&[ChunkSize::new(16, 16)]);
		let mut frames = vec![Frame::new(0)];
		frames[0].cels = vec![cel(0, 0, 0, 0)];
		let report = compose(&mut frames, &pool, DEFAULT_MEMORY_BUDGET);
		assert!(report.warnings.is_empty());
		assert!(!report.has_hard_violation());
		assert_eq!(report.frames[0].memory, 4);
	}
}
