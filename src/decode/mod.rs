//! GIF container parsing and LZW expansion.
//!
//! Parsing produces a [`container::GifContainer`] whose frames still hold compressed image data;
//! indices are expanded per frame, on demand, by [`lzw::decompress`].

/// Parsed container model: header, palettes, raw frames.
pub mod container;
/// Variable-width LZW decompressor.
pub mod lzw;
pub(crate) mod parser;
