//! `chunkcel-rs` converts 2D animated sprites between layered frame PNGs and
//! the tile-chunked object representation of a handheld game engine, in both
//! directions.
//!
//! This crate is a thin facade; all functionality lives in
//! [`chunkcel_types`].

pub use chunkcel_types::*;
