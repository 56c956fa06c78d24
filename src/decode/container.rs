use std::time::Duration;

use crate::foundation::core::{Canvas, FrameRect};

/// Delay substituted for frames whose graphic control block says `0`.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Logical screen header of a GIF stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Three-byte version tag following `GIF` (`87a` or `89a`).
    pub version: [u8; 3],
    /// Logical screen size.
    pub canvas: Canvas,
    /// Whether a global color table follows the header.
    pub has_global_color_table: bool,
    /// Entry count of the global color table (`2^(size+1)`), 0 when absent.
    pub global_color_table_len: usize,
    /// Color resolution bits per primary, as declared.
    pub color_resolution: u8,
    /// Background color index into the global table.
    pub background_index: u8,
    /// Raw pixel aspect ratio byte.
    pub pixel_aspect_ratio: u8,
}

/// Immutable palette of RGB triples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<[u8; 3]>,
}

impl ColorTable {
    /// Build a table from RGB triples.
    pub fn new(entries: Vec<[u8; 3]>) -> Self {
        Self { entries }
    }

    /// Build a table from packed `r, g, b` bytes; a trailing partial triple is ignored.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        Self {
            entries: bytes.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup the color at `index`.
    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.entries.get(usize::from(index)).copied()
    }
}

/// How a frame's drawing affects the canvas handed to the next frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisposalMethod {
    /// No disposal specified; the drawing stays.
    #[default]
    None,
    /// Keep the drawing.
    DoNotDispose,
    /// Clear the frame rect back to transparent.
    RestoreBackground,
    /// Restore the canvas as it was before the frame was drawn.
    RestorePrevious,
}

impl DisposalMethod {
    /// Decode the 3-bit disposal field; reserved values map to [`DisposalMethod::None`].
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            1 => Self::DoNotDispose,
            2 => Self::RestoreBackground,
            3 => Self::RestorePrevious,
            _ => Self::None,
        }
    }
}

/// Image descriptor of one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Position and size on the logical screen.
    pub rect: FrameRect,
    /// Rows are stored in 4-pass interlaced order.
    pub interlaced: bool,
    /// Frame-local palette, overriding the global one.
    pub local_color_table: Option<ColorTable>,
}

/// Graphic control extension values applying to the next image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphicControl {
    /// Raw delay in hundredths of a second.
    pub delay_cs: u16,
    /// Disposal applied after this frame is shown.
    pub disposal: DisposalMethod,
    /// Palette index rendered as transparent, when set.
    pub transparent_index: Option<u8>,
}

impl Default for GraphicControl {
    fn default() -> Self {
        Self {
            delay_cs: 0,
            disposal: DisposalMethod::None,
            transparent_index: None,
        }
    }
}

impl GraphicControl {
    /// Display time of the frame; a zero delay is replaced by [`DEFAULT_FRAME_DELAY`].
    pub fn delay(&self) -> Duration {
        if self.delay_cs == 0 {
            DEFAULT_FRAME_DELAY
        } else {
            Duration::from_millis(u64::from(self.delay_cs) * 10)
        }
    }
}

/// LZW-compressed pixel indices of one frame, sub-blocks already concatenated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedImageData {
    /// LZW minimum code size byte.
    pub min_code_size: u8,
    /// Concatenated sub-block payloads.
    pub bytes: Vec<u8>,
}

/// A frame exactly as stored in the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// Image descriptor.
    pub descriptor: FrameDescriptor,
    /// Graphic control values, defaults applied when the extension was absent.
    pub control: GraphicControl,
    /// Compressed indices.
    pub data: CompressedImageData,
}

/// Structured description of a whole GIF stream.
#[derive(Clone, Debug)]
pub struct GifContainer {
    /// Logical screen header.
    pub header: Header,
    /// Global palette, if present.
    pub global_color_table: Option<ColorTable>,
    /// Frames in stream order.
    pub frames: Vec<RawFrame>,
    /// Loop count: `0` loops forever, `N` plays `N` times. `1` when no loop extension exists.
    pub repeat_count: u16,
    /// Text of comment extensions, in stream order.
    pub comments: Vec<String>,
}

impl GifContainer {
    /// Logical screen size.
    pub fn canvas(&self) -> Canvas {
        self.header.canvas
    }

    /// Palette applying to `frame`: its local table, else the global one.
    pub fn color_table_for<'a>(&'a self, frame: &'a RawFrame) -> Option<&'a ColorTable> {
        frame
            .descriptor
            .local_color_table
            .as_ref()
            .or(self.global_color_table.as_ref())
    }
}
