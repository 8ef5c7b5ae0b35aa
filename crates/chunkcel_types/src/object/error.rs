//! Error types for object and frame pipeline operations.
//!
//! This module provides a unified error handling system using [`ObjectError`]
//! for both conversion directions supported by chunkcel-rs.
//!
//! # Examples
//!
//! ```no_run
//! use chunkcel_types::object::{ObjectError, Stage};
//! use chunkcel_types::object::palette::GlobalPalette;
//!
//! fn load_palette(path: &str) -> Result<GlobalPalette, ObjectError> {
//!     GlobalPalette::open_jasc(path)
//! }
//!
//! fn handle_error(err: ObjectError) {
//!     match err.stage() {
//!         Some(Stage::Palette) => println!("palette error: {}", err),
//!         Some(Stage::Extractor) => println!("extractor error: {}", err),
//!         _ => println!("error: {}", err),
//!     }
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for all pipeline operations
#[derive(Debug, Error)]
pub enum ObjectError {
	/// A PNG in the input folder does not follow the `Frame-<f>-Layer-<l>.png` scheme
	#[error("{stage} error: Invalid file name {path:?} (expected Frame-<f>-Layer-<l>.png)")]
	InvalidFilename {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Offending file
		path: PathBuf,
	},

	/// An input image carries different palette bytes than the first one
	#[error("{stage} error: Palette of {path:?} differs from the shared palette")]
	PaletteMismatch {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Offending file
		path: PathBuf,
	},

	/// An input image is not indexed, or exceeds the color budget
	#[error("{stage} error: Wrong pixel format for {path:?}: {message}")]
	WrongPixelFormat {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Offending file
		path: PathBuf,
		/// What exactly is wrong
		message: String,
	},

	/// An input image has a different size than the first one
	#[error(
		"{stage} error: {path:?} is {width}x{height}, expected {expected_width}x{expected_height}"
	)]
	DimensionMismatch {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Offending file
		path: PathBuf,
		/// Actual width
		width: u32,
		/// Actual height
		height: u32,
		/// Expected width
		expected_width: u32,
		/// Expected height
		expected_height: u32,
	},

	/// Image dimensions are not multiples of the 8-pixel tile size
	#[error("{stage} error: {path:?} is {width}x{height}, which is not a multiple of 8")]
	NotMultipleOf8 {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Offending file
		path: PathBuf,
		/// Actual width
		width: u32,
		/// Actual height
		height: u32,
	},

	/// A single 8x8 tile references colors from more than one palette group
	#[error(
		"{stage} error: Tile ({tx}, {ty}) references palette groups {group_a} and {group_b} at once"
	)]
	MultiGroupTile {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Tile column
		tx: u32,
		/// Tile row
		ty: u32,
		/// First group seen in the tile
		group_a: u8,
		/// Second group seen in the tile
		group_b: u8,
	},

	/// The palette uses more groups than the sprite kind allows
	#[error("{stage} error: Palette uses {groups} groups (maximum for this sprite kind: {max})")]
	TooManyGroups {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Number of 16-color groups in use
		groups: usize,
		/// Maximum allowed by the sprite kind
		max: usize,
	},

	/// The configuration declares more animations than the object format holds
	#[error("{stage} error: {count} animations configured (maximum: {max})")]
	TooManyAnimations {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Configured animation count
		count: usize,
		/// Maximum allowed
		max: usize,
	},

	/// A configured scan chunk size is not one of the twelve allowed sizes
	#[error("{stage} error: {width}x{height} is not an allowed chunk size")]
	InvalidChunkSize {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Configured width
		width: u32,
		/// Configured height
		height: u32,
	},

	/// A configured value is outside its valid range
	#[error("{stage} error: Invalid configuration: {message}")]
	InvalidConfig {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// What exactly is wrong
		message: String,
	},

	/// A required file of the object folder is absent
	#[error("{stage} error: Missing file {path:?}")]
	MissingFile {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Path that was expected to exist
		path: PathBuf,
	},

	/// An XML document could not be parsed
	#[error("{stage} error: Cannot parse {path:?}: {message}")]
	XmlParse {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Offending file
		path: PathBuf,
		/// Parser message, including position information when available
		message: String,
	},

	/// A cel references a chunk id that is not present in the pool
	#[error("{stage} error: Cel references unknown chunk id {chunk_id}")]
	UnknownChunk {
		/// Pipeline stage that encountered the error
		stage: Stage,
		/// Referenced chunk id
		chunk_id: u32,
	},

	/// PNG decoding error
	#[error("PNG decode error: {0}")]
	PngDecode(#[from] png::DecodingError),

	/// PNG encoding error
	#[error("PNG encode error: {0}")]
	PngEncode(#[from] png::EncodingError),

	/// JSON error
	#[error(transparent)]
	Json(#[from] serde_json::Error),

	/// IO error
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl ObjectError {
	/// Returns the pipeline stage associated with this error
	pub fn stage(&self) -> Option<Stage> {
		match self {
			Self::InvalidFilename {
				stage, ..
			}
			| Self::PaletteMismatch {
				stage, ..
			}
			| Self::WrongPixelFormat {
				stage, ..
			}
			| Self::DimensionMismatch {
				stage, ..
			}
			| Self::NotMultipleOf8 {
				stage, ..
			}
			| Self::MultiGroupTile {
				stage, ..
			}
			| Self::TooManyGroups {
				stage, ..
			}
			| Self::TooManyAnimations {
				stage, ..
			}
			| Self::InvalidChunkSize {
				stage, ..
			}
			| Self::InvalidConfig {
				stage, ..
			}
			| Self::MissingFile {
				stage, ..
			}
			| Self::XmlParse {
				stage, ..
			}
			| Self::UnknownChunk {
				stage, ..
			} => Some(*stage),
			_ => None,
		}
	}

	/// Returns the machine-readable kind tag written to stderr by the CLI
	pub fn kind(&self) -> &'static str {
		match self {
			Self::InvalidFilename { .. } => "InvalidFilename",
			Self::PaletteMismatch { .. } => "PaletteMismatch",
			Self::WrongPixelFormat { .. } => "WrongPixelFormat",
			Self::DimensionMismatch { .. } => "DimensionMismatch",
			Self::NotMultipleOf8 { .. } => "NotMultipleOf8",
			Self::MultiGroupTile { .. } => "MultiGroupTile",
			Self::TooManyGroups { .. } => "TooManyGroups",
			Self::TooManyAnimations { .. } => "TooManyAnimations",
			Self::InvalidChunkSize { .. } => "InvalidChunkSize",
			Self::InvalidConfig { .. } => "InvalidConfig",
			Self::MissingFile { .. } => "MissingFile",
			Self::XmlParse { .. } => "XMLParseError",
			Self::UnknownChunk { .. } => "UnknownChunk",
			Self::PngDecode(_) => "PngDecode",
			Self::PngEncode(_) => "PngEncode",
			Self::Json(_) => "Json",
			Self::Io(_) => "Io",
		}
	}

	/// Returns true if this is an I/O error
	pub fn is_io_error(&self) -> bool {
		matches!(self, Self::Io(_))
	}

	/// Returns true if this error concerns input validation rather than processing
	pub fn is_validation_error(&self) -> bool {
		matches!(
			self,
			Self::InvalidFilename { .. }
				| Self::PaletteMismatch { .. }
				| Self::WrongPixelFormat { .. }
				| Self::DimensionMismatch { .. }
				| Self::NotMultipleOf8 { .. }
				| Self::TooManyGroups { .. }
				| Self::TooManyAnimations { .. }
				| Self::InvalidChunkSize { .. }
				| Self::InvalidConfig { .. }
		)
	}

	/// Create an invalid filename error
	pub fn invalid_filename(stage: Stage, path: impl Into<PathBuf>) -> Self {
		Self::InvalidFilename {
			stage,
			path: path.into(),
		}
	}

	/// Create a wrong pixel format error
	pub fn wrong_pixel_format(
		stage: Stage,
		path: impl Into<PathBuf>,
		message: impl Into<String>,
	) -> Self {
		Self::WrongPixelFormat {
			stage,
			path: path.into(),
			message: message.into(),
		}
	}

	/// Create a missing file error
	pub fn missing_file(stage: Stage, path: impl Into<PathBuf>) -> Self {
		Self::MissingFile {
			stage,
			path: path.into(),
		}
	}

	/// Create an XML parse error
	pub fn xml_parse(stage: Stage, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
		Self::XmlParse {
			stage,
			path: path.into(),
			message: message.into(),
		}
	}

	/// Create an invalid configuration error
	pub fn invalid_config(stage: Stage, message: impl Into<String>) -> Self {
		Self::InvalidConfig {
			stage,
			message: message.into(),
		}
	}
}

/// Pipeline stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Input folder scan and validation
	InputScan,
	/// Palette model
	Palette,
	/// Tile grid
	TileGrid,
	/// Chunk extractor
	Extractor,
	/// Frame composer
	Composer,
	/// Output serializer
	Serializer,
	/// Object folder parser (reverse)
	Parser,
	/// Overlap resolver (reverse)
	Layering,
	/// Frame renderer (reverse)
	Renderer,
	/// Configuration handling
	Config,
}

impl Stage {
	/// Returns a human-readable description of this stage
	pub fn description(&self) -> &'static str {
		match self {
			Stage::InputScan => "Input folder scan",
			Stage::Palette => "Palette model",
			Stage::TileGrid => "Tile grid",
			Stage::Extractor => "Chunk extractor",
			Stage::Composer => "Frame composer",
			Stage::Serializer => "Serializer",
			Stage::Parser => "Object parser",
			Stage::Layering => "Overlap resolver",
			Stage::Renderer => "Frame renderer",
			Stage::Config => "Configuration",
		}
	}
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Stage::InputScan => write!(f, "InputScan"),
			Stage::Palette => write!(f, "Palette"),
			Stage::TileGrid => write!(f, "TileGrid"),
			Stage::Extractor => write!(f, "Extractor"),
			Stage::Composer => write!(f, "Composer"),
			Stage::Serializer => write!(f, "Serializer"),
			Stage::Parser => write!(f, "Parser"),
			Stage::Layering => write!(f, "Layering"),
			Stage::Renderer => write!(f, "Renderer"),
			Stage::Config => write!(f, "Config"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stage_tag_is_preserved() {
		let err = ObjectError::invalid_filename(Stage::InputScan, "Frame-a-Layer-0.png");
		assert_eq!(err.stage(), Some(Stage::InputScan));
		assert_eq!(err.kind(), "InvalidFilename");
		assert!(err.is_validation_error());
	}

	#[test]
	fn io_errors_have_no_stage() {
		let err = ObjectError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
		assert_eq!(err.stage(), None);
		assert!(err.is_io_error());
	}

	#[test]
	fn xml_kind_matches_taxonomy() {
		let err = ObjectError::xml_parse(Stage::Parser, "frames.xml", "unexpected eof at 3:17");
		assert_eq!(err.kind(), "XMLParseError");
	}
}
