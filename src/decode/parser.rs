use crate::{
    decode::container::{
        ColorTable, CompressedImageData, DisposalMethod, FrameDescriptor, GifContainer,
        GraphicControl, Header, RawFrame,
    },
    foundation::core::{Canvas, FrameRect},
    foundation::error::{AnimError, AnimResult},
};

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const COMMENT_LABEL: u8 = 0xFE;
const APPLICATION_LABEL: u8 = 0xFF;

const LOOP_APPLICATION_ID: &[u8; 11] = b"NETSCAPE2.0";

/// Parse a complete GIF stream into header, palettes, raw frames and loop metadata.
///
/// Image data stays compressed; see [`crate::decompress`].
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse_container(bytes: &[u8]) -> AnimResult<GifContainer> {
    let mut r = ByteReader::new(bytes);

    let signature = r.take(6, "signature")?;
    if &signature[..3] != b"GIF" {
        return Err(AnimError::decode("missing GIF signature"));
    }
    let version = [signature[3], signature[4], signature[5]];
    if &version != b"87a" && &version != b"89a" {
        return Err(AnimError::decode(format!(
            "unsupported GIF version '{}'",
            String::from_utf8_lossy(&version)
        )));
    }

    let width = r.u16_le("logical screen width")?;
    let height = r.u16_le("logical screen height")?;
    let packed = r.u8("logical screen flags")?;
    let background_index = r.u8("background color index")?;
    let pixel_aspect_ratio = r.u8("pixel aspect ratio")?;

    let has_global_color_table = packed & 0x80 != 0;
    let global_color_table_len = if has_global_color_table {
        table_len(packed)
    } else {
        0
    };
    let header = Header {
        version,
        canvas: Canvas {
            width: u32::from(width),
            height: u32::from(height),
        },
        has_global_color_table,
        global_color_table_len,
        color_resolution: ((packed >> 4) & 0x07) + 1,
        background_index,
        pixel_aspect_ratio,
    };

    let global_color_table = if has_global_color_table {
        Some(read_color_table(&mut r, global_color_table_len, "global color table")?)
    } else {
        None
    };

    let mut frames = Vec::new();
    let mut comments = Vec::new();
    let mut repeat_count: Option<u16> = None;
    let mut pending_control: Option<GraphicControl> = None;

    loop {
        let Some(introducer) = r.next_byte() else {
            tracing::warn!(frames = frames.len(), "gif stream ended without trailer");
            break;
        };

        match introducer {
            TRAILER => break,
            EXTENSION_INTRODUCER => {
                let label = r.u8("extension label")?;
                let payload = r.sub_blocks("extension data")?;
                match label {
                    GRAPHIC_CONTROL_LABEL => {
                        pending_control = Some(parse_graphic_control(&payload)?);
                    }
                    APPLICATION_LABEL => {
                        if let Some(n) = parse_loop_count(&payload) {
                            repeat_count = Some(n);
                        }
                    }
                    COMMENT_LABEL => {
                        comments.push(String::from_utf8_lossy(&payload).into_owned());
                    }
                    other => {
                        tracing::debug!(label = other, "skipping unknown gif extension");
                    }
                }
            }
            IMAGE_SEPARATOR => {
                let control = pending_control.take().unwrap_or_default();
                frames.push(parse_image(&mut r, control)?);
            }
            other => {
                return Err(AnimError::decode(format!(
                    "unknown block introducer 0x{other:02X} at offset {}",
                    r.pos - 1
                )));
            }
        }
    }

    let container = GifContainer {
        header,
        global_color_table,
        frames,
        repeat_count: repeat_count.unwrap_or(1),
        comments,
    };

    if container.frames.is_empty() {
        return Err(AnimError::decode("gif stream contains no image frames"));
    }
    for (i, frame) in container.frames.iter().enumerate() {
        if container.color_table_for(frame).is_none() {
            return Err(AnimError::decode(format!(
                "frame {i} has neither a local nor a global color table"
            )));
        }
    }

    Ok(container)
}

fn parse_graphic_control(payload: &[u8]) -> AnimResult<GraphicControl> {
    if payload.len() < 4 {
        return Err(AnimError::decode(format!(
            "graphic control extension needs 4 bytes, got {}",
            payload.len()
        )));
    }
    let packed = payload[0];
    Ok(GraphicControl {
        delay_cs: u16::from_le_bytes([payload[1], payload[2]]),
        disposal: DisposalMethod::from_bits(packed >> 2),
        transparent_index: (packed & 0x01 != 0).then_some(payload[3]),
    })
}

/// Loop count from a `NETSCAPE2.0` application extension.
///
/// `payload` is the identifier followed by the concatenated data sub-blocks; the count is the
/// little-endian `u16` after the `0x01` sub-block id.
fn parse_loop_count(payload: &[u8]) -> Option<u16> {
    let (id, data) = payload.split_at_checked(LOOP_APPLICATION_ID.len())?;
    if id != LOOP_APPLICATION_ID || data.len() < 3 || data[0] != 1 {
        return None;
    }
    Some(u16::from_le_bytes([data[1], data[2]]))
}

fn parse_image(r: &mut ByteReader<'_>, control: GraphicControl) -> AnimResult<RawFrame> {
    let left = r.u16_le("image left")?;
    let top = r.u16_le("image top")?;
    let width = r.u16_le("image width")?;
    let height = r.u16_le("image height")?;
    let packed = r.u8("image flags")?;

    let local_color_table = if packed & 0x80 != 0 {
        Some(read_color_table(r, table_len(packed), "local color table")?)
    } else {
        None
    };

    let min_code_size = r.u8("LZW minimum code size")?;
    let bytes = r.sub_blocks("image data")?;

    Ok(RawFrame {
        descriptor: FrameDescriptor {
            rect: FrameRect {
                left: u32::from(left),
                top: u32::from(top),
                width: u32::from(width),
                height: u32::from(height),
            },
            interlaced: packed & 0x40 != 0,
            local_color_table,
        },
        control,
        data: CompressedImageData {
            min_code_size,
            bytes,
        },
    })
}

fn table_len(packed: u8) -> usize {
    1usize << ((packed & 0x07) + 1)
}

fn read_color_table(r: &mut ByteReader<'_>, len: usize, what: &str) -> AnimResult<ColorTable> {
    let bytes = r.take(len * 3, what)?;
    Ok(ColorTable::from_rgb_bytes(bytes))
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn take(&mut self, n: usize, what: &str) -> AnimResult<&'a [u8]> {
        let end = self.pos.saturating_add(n);
        let Some(slice) = self.data.get(self.pos..end) else {
            return Err(AnimError::decode(format!(
                "truncated {what}: need {n} bytes at offset {}, {} available",
                self.pos,
                self.data.len().saturating_sub(self.pos)
            )));
        };
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> AnimResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u16_le(&mut self, what: &str) -> AnimResult<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Concatenate length-prefixed sub-blocks up to and including the zero terminator.
    fn sub_blocks(&mut self, what: &str) -> AnimResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let len = usize::from(self.u8(what)?);
            if len == 0 {
                return Ok(out);
            }
            out.extend_from_slice(self.take(len, what)?);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/parser.rs"]
mod tests;
