//! Indexed image carrier.
//!
//! All pipeline stages operate on [`IndexedImage`]: a width x height grid of
//! 8-bit palette indices plus the raw palette bytes the image was loaded
//! with. PNG decoding preserves the indices exactly (1/2/4-bit files are
//! unpacked to one byte per pixel); encoding embeds the palette and marks
//! color 0 transparent via the `tRNS` chunk.

use std::fs::File as FsFile;
use std::io::BufWriter;
use std::path::Path;

use super::error::{ObjectError, Stage};
use super::palette::MAX_COLORS;

/// An 8-bit indexed image together with its raw palette bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
	width: u32,
	height: u32,
	pixels: Vec<u8>,
	palette: Vec<u8>,
}

impl IndexedImage {
	/// Creates a blank image filled with index 0.
	pub fn blank(width: u32, height: u32, palette: Vec<u8>) -> Self {
		Self {
			width,
			height,
			pixels: vec![0; (width * height) as usize],
			palette,
		}
	}

	/// Creates an image from raw parts.
	///
	/// `pixels` must hold exactly `width * height` entries.
	pub fn from_parts(width: u32, height: u32, pixels: Vec<u8>, palette: Vec<u8>) -> Self {
		debug_assert_eq!(pixels.len(), (width * height) as usize);
		Self {
			width,
			height,
			pixels,
			palette,
		}
	}

	/// Returns the image width in pixels.
	pub fn width(&self) -> u32 {
		self.width
	}

	/// Returns the image height in pixels.
	pub fn height(&self) -> u32 {
		self.height
	}

	/// Returns the pixel buffer, row-major, one index per byte.
	pub fn pixels(&self) -> &[u8] {
		&self.pixels
	}

	/// Returns the raw palette bytes (`[R, G, B, ...]`).
	pub fn palette_bytes(&self) -> &[u8] {
		&self.palette
	}

	/// Returns the palette index at (x, y).
	#[inline]
	pub fn pixel(&self, x: u32, y: u32) -> u8 {
		self.pixels[(y * self.width + x) as usize]
	}

	/// Sets the palette index at (x, y).
	#[inline]
	pub fn set_pixel(&mut self, x: u32, y: u32, index: u8) {
		self.pixels[(y * self.width + x) as usize] = index;
	}

	/// Copies the 8x8 tile at tile coordinates (tx, ty), row-major.
	pub fn tile_at(&self, tx: u32, ty: u32) -> [u8; 64] {
		let mut tile = [0u8; 64];
		for py in 0..8 {
			let row = ((ty * 8 + py) * self.width + tx * 8) as usize;
			tile[(py * 8) as usize..(py * 8 + 8) as usize]
				.copy_from_slice(&self.pixels[row..row + 8]);
		}
		tile
	}

	/// Opens an indexed PNG, preserving palette indices.
	///
	/// # Errors
	///
	/// Returns [`ObjectError::WrongPixelFormat`] if the PNG is not
	/// palette-based or carries more than 256 colors, and decoding errors
	/// for malformed files.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, ObjectError> {
		let path = path.as_ref();
		let mut decoder = png::Decoder::new(FsFile::open(path)?);
		decoder.set_transformations(png::Transformations::IDENTITY);
		let mut reader = decoder.read_info()?;

		let mut buf = vec![0; reader.output_buffer_size()];
		let frame = reader.next_frame(&mut buf)?;
		let info = reader.info();

		if frame.color_type != png::ColorType::Indexed {
			return Err(ObjectError::wrong_pixel_format(
				Stage::InputScan,
				path,
				format!("not an indexed image ({:?})", frame.color_type),
			));
		}

		let palette = info
			.palette
			.as_ref()
			.map(|p| p.to_vec())
			.ok_or_else(|| {
				ObjectError::wrong_pixel_format(Stage::InputScan, path, "missing PLTE chunk")
			})?;
		if palette.len() / 3 > MAX_COLORS {
			return Err(ObjectError::wrong_pixel_format(
				Stage::InputScan,
				path,
				format!("{} colors exceed the {} color limit", palette.len() / 3, MAX_COLORS),
			));
		}

		let width = frame.width;
		let height = frame.height;
		let pixels = unpack_indices(&buf[..frame.buffer_size()], width, height, frame.bit_depth);

		Ok(Self {
			width,
			height,
			pixels,
			palette,
		})
	}

	/// Saves the image as an 8-bit indexed PNG with the embedded palette.
	///
	/// Palette entry 0 is marked fully transparent via `tRNS`.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be created or encoded.
	pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ObjectError> {
		let file = FsFile::create(path)?;
		let writer = BufWriter::new(file);

		let mut encoder = png::Encoder::new(writer, self.width, self.height);
		encoder.set_color(png::ColorType::Indexed);
		encoder.set_depth(png::BitDepth::Eight);
		encoder.set_palette(self.palette.clone());
		encoder.set_trns(vec![0u8]);

		let mut writer = encoder.write_header()?;
		writer.write_image_data(&self.pixels)?;
		Ok(())
	}
}

/// Unpacks a possibly sub-byte-depth index buffer to one byte per pixel.
///
/// PNG scanlines are padded to byte boundaries, so rows are unpacked
/// independently.
fn unpack_indices(data: &[u8], width: u32, height: u32, depth: png::BitDepth) -> Vec<u8> {
	let bits = depth as usize;
	if bits == 8 {
		return data.to_vec();
	}

	let row_bytes = (width as usize * bits).div_ceil(8);
	let mask = (1u16 << bits) as u8 - 1;
	let mut pixels = Vec::with_capacity((width * height) as usize);

	for y in 0..height as usize {
		let row = &data[y * row_bytes..(y + 1) * row_bytes];
		for x in 0..width as usize {
			let bit_offset = x * bits;
			let byte = row[bit_offset / 8];
			let shift = 8 - bits - (bit_offset % 8);
			pixels.push((byte >> shift) & mask);
		}
	}

	pixels
}
