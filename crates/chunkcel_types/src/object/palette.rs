//! Palette model.
//!
//! The global palette is an ordered sequence of 16-color groups. Color 0 of
//! every group is the transparent color, and the first group's transparent
//! color is the canonical transparent for cross-group comparisons. A pixel's
//! palette group is its color index divided by 16, its local index the
//! remainder.
//!
//! On disk the palette is stored as a JASC-PAL text file:
//!
//! ```text
//! JASC-PAL
//! 0100
//! <count>
//! R G B        (one line per color)
//! ```
//!
//! # Examples
//!
//! ```
//! use chunkcel_types::object::palette::{Color, GlobalPalette};
//!
//! let mut palette = GlobalPalette::new();
//! palette.push(Color::rgb(0, 0, 0));
//! palette.push(Color::rgb(255, 0, 0));
//!
//! assert_eq!(GlobalPalette::group_of(17), 1);
//! assert_eq!(GlobalPalette::local_index(17), 1);
//! assert!(GlobalPalette::is_transparent(16));
//! ```

use std::fmt;
use std::path::Path;

use super::error::{ObjectError, Stage};

/// Number of colors in one palette group
pub const GROUP_SIZE: usize = 16;

/// Maximum number of colors an indexed input image may carry
pub const MAX_COLORS: usize = 256;

/// RGB color representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
	/// Red component (0-255)
	pub r: u8,
	/// Green component (0-255)
	pub g: u8,
	/// Blue component (0-255)
	pub b: u8,
}

impl Color {
	/// Creates a new RGB color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self {
			r,
			g,
			b,
		}
	}

	/// Creates a black color.
	pub const fn black() -> Self {
		Self::rgb(0, 0, 0)
	}
}

impl Default for Color {
	fn default() -> Self {
		Self::black()
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
	}
}

/// The shared palette of one object: an ordered sequence of colors,
/// partitioned into groups of 16.
///
/// The color sequence is preserved exactly as loaded; the serializer never
/// reorders entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalPalette {
	colors: Vec<Color>,
}

impl GlobalPalette {
	/// Creates a new empty palette.
	pub fn new() -> Self {
		Self {
			colors: Vec::new(),
		}
	}

	/// Creates a palette from a list of colors.
	pub fn from_colors(colors: Vec<Color>) -> Self {
		Self {
			colors,
		}
	}

	/// Creates a palette from flat `[R, G, B, R, G, B, ...]` bytes as stored
	/// in a PNG `PLTE` chunk. Trailing partial triples are ignored.
	pub fn from_png_bytes(bytes: &[u8]) -> Self {
		let colors = bytes.chunks_exact(3).map(|c| Color::rgb(c[0], c[1], c[2])).collect();
		Self {
			colors,
		}
	}

	/// Appends a color to the palette.
	pub fn push(&mut self, color: Color) {
		self.colors.push(color);
	}

	/// Returns the number of colors.
	pub fn len(&self) -> usize {
		self.colors.len()
	}

	/// Returns true if the palette has no colors.
	pub fn is_empty(&self) -> bool {
		self.colors.is_empty()
	}

	/// Returns the number of 16-color groups the palette spans.
	pub fn group_count(&self) -> usize {
		self.colors.len().div_ceil(GROUP_SIZE)
	}

	/// Returns the color at the given index, if present.
	pub fn get(&self, index: u8) -> Option<Color> {
		self.colors.get(index as usize).copied()
	}

	/// Returns a reference to the color list.
	pub fn colors(&self) -> &[Color] {
		&self.colors
	}

	/// Returns the palette group of a color index.
	#[inline]
	pub fn group_of(index: u8) -> u8 {
		index / GROUP_SIZE as u8
	}

	/// Returns the intra-group index (0-15) of a color index.
	#[inline]
	pub fn local_index(index: u8) -> u8 {
		index % GROUP_SIZE as u8
	}

	/// Returns true if the color index references a transparent color.
	///
	/// Color 0 of every group is transparent.
	#[inline]
	pub fn is_transparent(index: u8) -> bool {
		Self::local_index(index) == 0
	}

	/// Returns the palette as flat `[R, G, B, ...]` bytes for PNG embedding.
	pub fn to_png_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(self.colors.len() * 3);
		for color in &self.colors {
			bytes.push(color.r);
			bytes.push(color.g);
			bytes.push(color.b);
		}
		bytes
	}

	/// Serializes the palette to JASC-PAL text.
	pub fn to_jasc_string(&self) -> String {
		let mut out = String::with_capacity(16 + self.colors.len() * 12);
		out.push_str("JASC-PAL\n0100\n");
		out.push_str(&self.colors.len().to_string());
		out.push('\n');
		for color in &self.colors {
			out.push_str(&format!("{} {} {}\n", color.r, color.g, color.b));
		}
		out
	}

	/// Parses a palette from JASC-PAL text.
	///
	/// # Errors
	///
	/// Returns an error if the header is wrong, the count line does not match
	/// the number of color lines, or a color line is malformed.
	pub fn from_jasc_str(text: &str, path: &Path) -> Result<Self, ObjectError> {
		let mut lines = text.lines();

		let magic = lines.next().unwrap_or_default().trim();
		if magic != "JASC-PAL" {
			return Err(ObjectError::wrong_pixel_format(
				Stage::Palette,
				path,
				format!("bad JASC-PAL magic {magic:?}"),
			));
		}

		let version = lines.next().unwrap_or_default().trim();
		if version != "0100" {
			return Err(ObjectError::wrong_pixel_format(
				Stage::Palette,
				path,
				format!("unsupported JASC-PAL version {version:?}"),
			));
		}

		let count: usize = lines.next().unwrap_or_default().trim().parse().map_err(|_| {
			ObjectError::wrong_pixel_format(Stage::Palette, path, "bad color count line")
		})?;
		if count > MAX_COLORS {
			return Err(ObjectError::wrong_pixel_format(
				Stage::Palette,
				path,
				format!("{count} colors exceed the {MAX_COLORS} color limit"),
			));
		}

		let mut colors = Vec::with_capacity(count);
		for index in 0..count {
			let line = lines.next().ok_or_else(|| {
				ObjectError::wrong_pixel_format(
					Stage::Palette,
					path,
					format!("expected {count} color lines, got {index}"),
				)
			})?;
			let mut parts = line.split_whitespace().map(str::parse::<u8>);
			match (parts.next(), parts.next(), parts.next()) {
				(Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => colors.push(Color::rgb(r, g, b)),
				_ => {
					return Err(ObjectError::wrong_pixel_format(
						Stage::Palette,
						path,
						format!("malformed color line {:?}", line),
					));
				}
			}
		}

		Ok(Self {
			colors,
		})
	}

	/// Saves the palette as a JASC-PAL file.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be written.
	pub fn save_jasc(&self, path: impl AsRef<Path>) -> Result<(), ObjectError> {
		std::fs::write(path, self.to_jasc_string())?;
		Ok(())
	}

	/// Loads a palette from a JASC-PAL file.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be read or parsed.
	pub fn open_jasc(path: impl AsRef<Path>) -> Result<Self, ObjectError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path)?;
		Self::from_jasc_str(&text, path)
	}
}

impl Default for GlobalPalette {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for GlobalPalette {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "GlobalPalette({} colors, {} groups)", self.colors.len(), self.group_count())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn group_and_local_index() {
		assert_eq!(GlobalPalette::group_of(0), 0);
		assert_eq!(GlobalPalette::group_of(15), 0);
		assert_eq!(GlobalPalette::group_of(16), 1);
		assert_eq!(GlobalPalette::group_of(191), 11);
		assert_eq!(GlobalPalette::local_index(16), 0);
		assert_eq!(GlobalPalette::local_index(31), 15);
	}

	#[test]
	fn transparency_is_local_index_zero() {
		assert!(GlobalPalette::is_transparent(0));
		assert!(GlobalPalette::is_transparent(32));
		assert!(!GlobalPalette::is_transparent(1));
		assert!(!GlobalPalette::is_transparent(33));
	}

	#[test]
	fn group_count_rounds_up() {
		let palette = GlobalPalette::from_png_bytes(&[0u8; 3 * 17]);
		assert_eq!(palette.len(), 17);
		assert_eq!(palette.group_count(), 2);
	}

	#[test]
	fn jasc_roundtrip_preserves_order() {
		let mut palette = GlobalPalette::new();
		palette.push(Color::rgb(0, 0, 0));
		palette.push(Color::rgb(255, 0, 0));
		palette.push(Color::rgb(0, 255, 0));

		let text = palette.to_jasc_string();
		assert!(text.starts_with("JASC-PAL\n0100\n3\n"));

		let parsed = GlobalPalette::from_jasc_str(&text, Path::new("palette.pal")).unwrap();
		assert_eq!(parsed, palette);
	}

	#[test]
	fn jasc_rejects_bad_magic() {
		let err = GlobalPalette::from_jasc_str("RIFF\n0100\n0\n", Path::new("palette.pal"))
			.expect_err("parse should fail");
		assert_eq!(err.kind(), "WrongPixelFormat");
	}

	#[test]
	fn jasc_rejects_truncated_colors() {
		let err = GlobalPalette::from_jasc_str(
			"JASC-PAL\n0100\n2\n1 2 3\n",
			Path::new("palette.pal"),
		)
		.expect_err("parse should fail");
		assert_eq!(err.kind(), "WrongPixelFormat");
	}

	#[test]
	fn png_bytes_roundtrip() {
		let palette = GlobalPalette::from_png_bytes(&[1, 2, 3, 4, 5, 6]);
		assert_eq!(palette.len(), 2);
		assert_eq!(palette.to_png_bytes(), vec![1, 2, 3, 4, 5, 6]);
	}
}
