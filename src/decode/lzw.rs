//! Variable-width LZW expansion as used by GIF image data.
//!
//! Codes are packed LSB-first. The code width starts at `min_code_size + 1`, grows by one bit
//! whenever the next free table slot reaches a power of two (`(available & code_mask) == 0`),
//! and is capped at 12 bits / 4096 table entries. A clear code resets width and table; the end
//! code stops decoding. Streams that run out before every pixel is produced are zero-filled.

use crate::foundation::error::{AnimError, AnimResult};

/// Table size ceiling (12-bit codes).
pub const MAX_TABLE_SIZE: usize = 4096;

/// Largest accepted `min_code_size`.
pub const MAX_MIN_CODE_SIZE: u8 = 11;

const MAX_CODE_WIDTH: u32 = 12;

const PREALLOC_CAP: usize = 1 << 20;

/// Expand `data` into exactly `pixel_count` palette indices.
pub fn decompress(min_code_size: u8, data: &[u8], pixel_count: usize) -> AnimResult<Vec<u8>> {
    let mut out = decompress_prefix(min_code_size, data, pixel_count)?;
    out.resize(pixel_count, 0);
    Ok(out)
}

/// Expand at most `limit` palette indices from `data`.
///
/// Unlike [`decompress`] a short stream is not zero-filled, so memory follows what the stream
/// actually produces rather than what the caller asks for.
pub fn decompress_prefix(min_code_size: u8, data: &[u8], limit: usize) -> AnimResult<Vec<u8>> {
    if min_code_size == 0 || min_code_size > MAX_MIN_CODE_SIZE {
        return Err(AnimError::corrupt(format!(
            "LZW minimum code size {min_code_size} outside 1..={MAX_MIN_CODE_SIZE}"
        )));
    }

    let clear = 1usize << min_code_size;
    let end = clear + 1;
    let initial_width = u32::from(min_code_size) + 1;

    let mut out = Vec::with_capacity(limit.min(PREALLOC_CAP));
    let mut table = CodeTable::new(clear);
    let mut reader = CodeReader::new(data);
    let mut stack: Vec<u8> = Vec::with_capacity(MAX_TABLE_SIZE);

    let mut width = initial_width;
    let mut code_mask = (1usize << width) - 1;
    let mut available = clear + 2;
    let mut prev: Option<usize> = None;
    let mut first = 0u8;

    while out.len() < limit {
        let Some(code) = reader.next_code(width) else {
            break;
        };

        if code == end {
            break;
        }
        if code == clear {
            width = initial_width;
            code_mask = (1usize << width) - 1;
            available = clear + 2;
            prev = None;
            continue;
        }

        let Some(prev_code) = prev else {
            if code > clear {
                return Err(AnimError::corrupt(format!(
                    "code {code} references the table before any entry exists"
                )));
            }
            first = table.suffix[code];
            out.push(first);
            prev = Some(code);
            continue;
        };

        let in_code = code;
        let mut cur = code;
        if code >= available {
            if code > available {
                return Err(AnimError::corrupt(format!(
                    "code {code} is past the next table slot {available}"
                )));
            }
            stack.push(first);
            cur = prev_code;
        }

        while cur > clear {
            if stack.len() >= MAX_TABLE_SIZE {
                return Err(AnimError::corrupt("LZW pixel stack overflow"));
            }
            let parent = usize::from(table.prefix[cur]);
            if parent == cur {
                return Err(AnimError::corrupt(format!("code {cur} references itself")));
            }
            stack.push(table.suffix[cur]);
            cur = parent;
        }
        first = table.suffix[cur];
        stack.push(first);

        if available < MAX_TABLE_SIZE {
            table.prefix[available] = prev_code as u16;
            table.suffix[available] = first;
            available += 1;
            if available & code_mask == 0 && available < MAX_TABLE_SIZE {
                width = (width + 1).min(MAX_CODE_WIDTH);
                code_mask += available;
            }
        }
        prev = Some(in_code);

        let room = limit - out.len();
        out.extend(stack.drain(..).rev().take(room));
    }

    Ok(out)
}

struct CodeTable {
    prefix: Box<[u16; MAX_TABLE_SIZE]>,
    suffix: Box<[u8; MAX_TABLE_SIZE]>,
}

impl CodeTable {
    fn new(clear: usize) -> Self {
        let prefix = Box::new([0u16; MAX_TABLE_SIZE]);
        let mut suffix = Box::new([0u8; MAX_TABLE_SIZE]);
        for (code, s) in suffix.iter_mut().enumerate().take(clear) {
            *s = code as u8;
        }
        Self { prefix, suffix }
    }
}

/// LSB-first bit reader over the concatenated sub-block payload.
struct CodeReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    bits: u32,
}

impl<'a> CodeReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            bits: 0,
        }
    }

    fn next_code(&mut self, width: u32) -> Option<usize> {
        while self.bits < width {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.acc |= u32::from(byte) << self.bits;
            self.bits += 8;
        }
        let code = self.acc & ((1u32 << width) - 1);
        self.acc >>= width;
        self.bits -= width;
        Some(code as usize)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/lzw.rs"]
mod tests;
