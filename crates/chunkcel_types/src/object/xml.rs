//! The two XML documents of an object folder.
//!
//! `frames.xml` describes frame composition:
//!
//! ```text
//! <AnimData>
//!     <Frames>
//!         <Frame>
//!             <Cel img="12" x="248" y="504" pal="3"/>
//!         </Frame>
//!     </Frames>
//! </AnimData>
//! ```
//!
//! `animations.xml` describes timing:
//!
//! ```text
//! <AnimData>
//!     <Anims>
//!         <Anim>
//!             <Frame id="2" duration="15"/>
//!         </Anim>
//!     </Anims>
//! </AnimData>
//! ```
//!
//! Parsing goes through `serde-xml-rs` derive structs. Emission is a small
//! deterministic writer: two identical runs must produce byte-identical
//! documents, so the output format is fixed here rather than delegated.

use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;

use super::error::{ObjectError, Stage};

/// Attributes of one `<Cel>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CelAttrs {
	/// Chunk id (`imgs/NNNN.png`)
	pub img: u32,
	/// X offset in pixels, displacement included
	pub x: i32,
	/// Y offset in pixels, displacement included
	pub y: i32,
	/// Palette group
	pub pal: u8,
}

/// Attributes of one `<Frame>` element inside `<Anim>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AnimFrameAttrs {
	/// Index into the frames.xml frame list
	pub id: u32,
	/// Duration in ticks (1/60 s)
	pub duration: u32,
}

#[derive(Debug, Default, Deserialize)]
struct FramesDoc {
	#[serde(rename = "Frames", default)]
	frames: FramesNode,
}

#[derive(Debug, Default, Deserialize)]
struct FramesNode {
	#[serde(rename = "Frame", default)]
	frames: Vec<FrameNode>,
}

#[derive(Debug, Default, Deserialize)]
struct FrameNode {
	#[serde(rename = "Cel", default)]
	cels: Vec<CelAttrs>,
}

#[derive(Debug, Default, Deserialize)]
struct AnimsDoc {
	#[serde(rename = "Anims", default)]
	anims: AnimsNode,
}

#[derive(Debug, Default, Deserialize)]
struct AnimsNode {
	#[serde(rename = "Anim", default)]
	anims: Vec<AnimNode>,
}

#[derive(Debug, Default, Deserialize)]
struct AnimNode {
	#[serde(rename = "Frame", default)]
	frames: Vec<AnimFrameAttrs>,
}

/// Parses `frames.xml` into per-frame cel lists, preserving document order.
///
/// # Errors
///
/// Returns [`ObjectError::XmlParse`] with the parser's message on malformed
/// input.
pub fn parse_frames_xml(text: &str, path: &Path) -> Result<Vec<Vec<CelAttrs>>, ObjectError> {
	let doc: FramesDoc = serde_xml_rs::from_str(text)
		.map_err(|e| ObjectError::xml_parse(Stage::Parser, path, e.to_string()))?;
	Ok(doc.frames.frames.into_iter().map(|f| f.cels).collect())
}

/// Parses `animations.xml` into per-animation step lists.
///
/// # Errors
///
/// Returns [`ObjectError::XmlParse`] with the parser's message on malformed
/// input.
pub fn parse_animations_xml(
	text: &str,
	path: &Path,
) -> Result<Vec<Vec<AnimFrameAttrs>>, ObjectError> {
	let doc: AnimsDoc = serde_xml_rs::from_str(text)
		.map_err(|e| ObjectError::xml_parse(Stage::Parser, path, e.to_string()))?;
	Ok(doc.anims.anims.into_iter().map(|a| a.frames).collect())
}

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// Serializes per-frame cel lists to the canonical `frames.xml` text.
pub fn frames_to_xml(frames: &[Vec<CelAttrs>]) -> String {
	let mut out = String::from(XML_HEADER);
	out.push_str("<AnimData>\n    <Frames>\n");
	for cels in frames {
		if cels.is_empty() {
			out.push_str("        <Frame/>\n");
			continue;
		}
		out.push_str("        <Frame>\n");
		for cel in cels {
			let _ = writeln!(
				out,
				"            <Cel img=\"{}\" x=\"{}\" y=\"{}\" pal=\"{}\"/>",
				cel.img, cel.x, cel.y, cel.pal
			);
		}
		out.push_str("        </Frame>\n");
	}
	out.push_str("    </Frames>\n</AnimData>\n");
	out
}

/// Serializes per-animation step lists to the canonical `animations.xml` text.
pub fn anims_to_xml(anims: &[Vec<AnimFrameAttrs>]) -> String {
	let mut out = String::from(XML_HEADER);
	out.push_str("<AnimData>\n    <Anims>\n");
	for frames in anims {
		if frames.is_empty() {
			out.push_str("        <Anim/>\n");
			continue;
		}
		out.push_str("        <Anim>\n");
		for frame in frames {
			let _ = writeln!(
				out,
				"            <Frame id=\"{}\" duration=\"{}\"/>",
				frame.id, frame.duration
			);
		}
		out.push_str("        </Anim>\n");
	}
	out.push_str("    </Anims>\n</AnimData>\n");
	out
}
