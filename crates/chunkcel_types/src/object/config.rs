//! Generator configuration (`config.json`).
//!
//! The configuration is round-trippable: the forward pipeline reads it from
//! the input folder, records the settings it actually used in the output
//! folder, and the reverse pipeline writes one describing the animations it
//! parsed, so a reversed object can be fed straight back into the forward
//! pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::chunk::{CHUNK_SIZES, ChunkSize};
use super::error::{ObjectError, Stage};

/// Maximum number of animations an object holds
pub const MAX_ANIMATIONS: usize = 8;

/// Default frame duration in ticks (1/60 s) for synthesized animations
pub const DEFAULT_FRAME_DURATION: u32 = 10;

/// One `(frame, duration)` step of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationStep {
	/// Frame number as used in the input filenames
	pub frame: u32,
	/// Display duration in ticks (1/60 s), at least 1
	pub duration: u32,
}

/// An ordered sequence of animation steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationConfig {
	/// Steps played in order
	pub frames: Vec<AnimationStep>,
}

/// Settings of one forward run, as stored in `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
	/// Minimum fraction of non-empty tiles per chunk row and column
	#[serde(default = "default_min_density")]
	pub min_density: f32,

	/// Translation added to every cel so the chosen alignment point maps to
	/// the engine actor center (256, 512)
	#[serde(default)]
	pub displace_sprite: [i32; 2],

	/// Enable the within-frame duplicate pre-pass
	#[serde(default = "default_true")]
	pub intra_scan: bool,

	/// Enable the cross-frame duplicate pre-pass and pool deduplication
	#[serde(default = "default_true")]
	pub inter_scan: bool,

	/// Chunk sizes the scanner may emit, `[width, height]` pairs
	#[serde(default = "default_scan_sizes")]
	pub scan_chunk_sizes: Vec<[u32; 2]>,

	/// Animations of the object (at most 8); empty means "synthesize one
	/// animation over all available frames"
	#[serde(default)]
	pub animations: Vec<AnimationConfig>,
}

fn default_min_density() -> f32 {
	0.5
}

fn default_true() -> bool {
	true
}

fn default_scan_sizes() -> Vec<[u32; 2]> {
	CHUNK_SIZES.iter().map(|s| [s.width, s.height]).collect()
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			min_density: default_min_density(),
			displace_sprite: [0, 0],
			intra_scan: true,
			inter_scan: true,
			scan_chunk_sizes: default_scan_sizes(),
			animations: Vec::new(),
		}
	}
}

impl GeneratorConfig {
	/// Validates the configuration.
	///
	/// # Errors
	///
	/// Returns an error when the density is outside `0.0..=1.0`, a scan size
	/// is not one of the twelve allowed dimensions, more than 8 animations
	/// are declared, or an animation step has duration 0.
	pub fn validate(&self) -> Result<(), ObjectError> {
		if !(0.0..=1.0).contains(&self.min_density) {
			return Err(ObjectError::invalid_config(
				Stage::Config,
				format!("min_density {} outside 0.0..=1.0", self.min_density),
			));
		}

		for &[width, height] in &self.scan_chunk_sizes {
			if ChunkSize::from_dims(width, height).is_none() {
				return Err(ObjectError::InvalidChunkSize {
					stage: Stage::Config,
					width,
					height,
				});
			}
		}

		if self.animations.len() > MAX_ANIMATIONS {
			return Err(ObjectError::TooManyAnimations {
				stage: Stage::Config,
				count: self.animations.len(),
				max: MAX_ANIMATIONS,
			});
		}

		for (index, animation) in self.animations.iter().enumerate() {
			if animation.frames.is_empty() {
				return Err(ObjectError::invalid_config(
					Stage::Config,
					format!("animation {index} has no frames"),
				));
			}
			for step in &animation.frames {
				if step.duration == 0 {
					return Err(ObjectError::invalid_config(
						Stage::Config,
						format!("animation {index} contains a zero-duration frame"),
					));
				}
			}
		}

		Ok(())
	}

	/// Returns the enabled chunk sizes in canonical scan order, deduplicated.
	///
	/// An empty `scan_chunk_sizes` list yields an empty result; the extractor
	/// still applies its implicit 8x8 fallback, so coverage stays total.
	pub fn enabled_sizes(&self) -> Vec<ChunkSize> {
		let mut sizes: Vec<ChunkSize> = self
			.scan_chunk_sizes
			.iter()
			.filter_map(|&[w, h]| ChunkSize::from_dims(w, h))
			.collect();
		sizes.sort_by_key(|s| s.canonical_rank());
		sizes.dedup();
		sizes
	}

	/// Returns the configured animations, or one synthesized animation over
	/// `available_frames` with the default duration when none are configured.
	pub fn animations_or_default(&self, available_frames: &[u32]) -> Vec<AnimationConfig> {
		if !self.animations.is_empty() {
			return self.animations.clone();
		}
		vec![AnimationConfig {
			frames: available_frames
				.iter()
				.map(|&frame| AnimationStep {
					frame,
					duration: DEFAULT_FRAME_DURATION,
				})
				.collect(),
		}]
	}

	/// Loads the configuration from a JSON file.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be read, parsed, or validated.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, ObjectError> {
		let text = std::fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&text)?;
		config.validate()?;
		Ok(config)
	}

	/// Saves the configuration as pretty-printed JSON.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be written.
	pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ObjectError> {
		let mut text = serde_json::to_string_pretty(self)?;
		text.push('\n');
		std::fs::write(path, text)?;
		Ok(())
	}
}
