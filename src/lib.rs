//! animgif decodes animated GIFs into composited, time-indexed frame timelines and drives their
//! playback.
//!
//! The pipeline, leaves first:
//!
//! - Parse a byte stream into a [`GifContainer`] (header, palettes, raw frames, loop count)
//! - Expand each frame's LZW data with [`decompress`]
//! - Composite frames lazily, honoring disposal, into a [`Timeline`]
//! - Share timelines per source through a reference-counted [`DecodeCache`]
//! - Drive "what to show now" with a [`PlaybackController`], usually via an [`AnimationHandle`]
//!   obtained from [`DecodeCache::attach`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Reference-counted decode cache.
pub mod cache;
/// Frame rendering and raster helpers.
pub mod compose;
/// GIF container parsing and LZW expansion.
pub mod decode;
/// Playback state machine.
pub mod playback;
/// Attach/detach API.
pub mod session;
/// Composited frame timeline.
pub mod timeline;


pub use crate::foundation::core::{Canvas, FrameRect};
pub use crate::foundation::error::{AnimError, AnimResult};

pub use crate::cache::source::{GifSource, SourceKey};
pub use crate::cache::store::{CacheOpts, DecodeCache};
pub use crate::compose::compositor::render_frame;
pub use crate::decode::container::{
    ColorTable, CompressedImageData, DisposalMethod, FrameDescriptor, GifContainer,
    GraphicControl, Header, RawFrame,
};
pub use crate::decode::lzw::decompress;
pub use crate::playback::controller::{PlaybackController, PlaybackState, RepeatBehavior};
pub use crate::session::handle::{AnimationHandle, AttachOptions};
pub use crate::timeline::frames::{CompositedFrame, Timeline};

/// Parse a complete GIF stream without decompressing any frame.
pub fn parse(bytes: &[u8]) -> AnimResult<GifContainer> {
    crate::decode::parser::parse_container(bytes)
}
