#![allow(dead_code)]

use std::collections::HashMap;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Deterministic pseudo-random bytes below `modulus`.
pub fn noise(seed: u64, len: usize, modulus: u16) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % u64::from(modulus)) as u8
        })
        .collect()
}

#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    bits: u32,
}

impl BitWriter {
    fn put(&mut self, code: u16, width: u32) {
        self.acc |= u64::from(code) << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

/// GIF-convention LZW encoder. `min_code_size` must be in `2..=8`.
pub fn lzw_encode(min_code_size: u8, indices: &[u8]) -> Vec<u8> {
    const MAX_CODES: u16 = 4096;

    let clear: u16 = 1 << min_code_size;
    let end = clear + 1;
    let initial_width = u32::from(min_code_size) + 1;

    let mut w = BitWriter::default();
    let mut dict: HashMap<(u16, u8), u16> = HashMap::new();
    let mut width = initial_width;
    let mut next = clear + 2;
    let mut first_after_clear = true;

    w.put(clear, width);
    let Some((&head, rest)) = indices.split_first() else {
        w.put(end, width);
        return w.finish();
    };

    let mut prefix = u16::from(head);
    for &k in rest {
        if let Some(&code) = dict.get(&(prefix, k)) {
            prefix = code;
            continue;
        }
        w.put(prefix, width);
        if next < MAX_CODES {
            dict.insert((prefix, k), next);
            next += 1;
            if next > (1 << width) && width < 12 {
                width += 1;
            }
            first_after_clear = false;
        } else {
            w.put(clear, width);
            dict.clear();
            next = clear + 2;
            width = initial_width;
            first_after_clear = true;
        }
        prefix = u16::from(k);
    }
    w.put(prefix, width);

    // The decoder adds one more entry on the final code (unless it follows a clear).
    if !first_after_clear && next < MAX_CODES && next + 1 > (1 << width) && width < 12 {
        width += 1;
    }
    w.put(end, width);
    w.finish()
}

pub fn sub_blocks(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in payload.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Smallest `n` with `2^(n+1) >= len`.
fn table_size_bits(len: usize) -> u8 {
    let mut n = 0u8;
    while (1usize << (n + 1)) < len && n < 7 {
        n += 1;
    }
    n
}

/// Disposal field values of the graphic control block.
pub mod disposal {
    pub const NONE: u8 = 0;
    pub const KEEP: u8 = 1;
    pub const BACKGROUND: u8 = 2;
    pub const PREVIOUS: u8 = 3;
}

pub struct Frame<'a> {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub indices: &'a [u8],
    pub delay_cs: u16,
    pub disposal: u8,
    pub transparent: Option<u8>,
}

impl<'a> Frame<'a> {
    pub fn full(width: u16, height: u16, indices: &'a [u8]) -> Self {
        Self::at(0, 0, width, height, indices)
    }

    pub fn at(left: u16, top: u16, width: u16, height: u16, indices: &'a [u8]) -> Self {
        Self {
            left,
            top,
            width,
            height,
            indices,
            delay_cs: 10,
            disposal: disposal::NONE,
            transparent: None,
        }
    }

    pub fn delay_cs(mut self, delay_cs: u16) -> Self {
        self.delay_cs = delay_cs;
        self
    }

    pub fn disposal(mut self, disposal: u8) -> Self {
        self.disposal = disposal;
        self
    }

    pub fn transparent(mut self, index: u8) -> Self {
        self.transparent = Some(index);
        self
    }
}

/// GIF89a stream with a global palette, optional loop extension and LZW-compressed frames.
pub fn gif(
    width: u16,
    height: u16,
    palette: &[[u8; 3]],
    loops: Option<u16>,
    frames: &[Frame<'_>],
) -> Vec<u8> {
    let size_bits = table_size_bits(palette.len());
    let entries = 1usize << (size_bits + 1);

    let mut buf = b"GIF89a".to_vec();
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&[0xF0 | size_bits, 0, 0]);
    for i in 0..entries {
        buf.extend_from_slice(&palette.get(i).copied().unwrap_or([0, 0, 0]));
    }

    if let Some(n) = loops {
        buf.extend_from_slice(&[0x21, 0xFF, 11]);
        buf.extend_from_slice(b"NETSCAPE2.0");
        let [lo, hi] = n.to_le_bytes();
        buf.extend_from_slice(&[3, 1, lo, hi, 0]);
    }

    let min_code_size = (size_bits + 1).max(2);
    for f in frames {
        let [dlo, dhi] = f.delay_cs.to_le_bytes();
        let packed = ((f.disposal & 0x07) << 2) | u8::from(f.transparent.is_some());
        let transparent = f.transparent.unwrap_or(0);
        buf.extend_from_slice(&[0x21, 0xF9, 4, packed, dlo, dhi, transparent, 0]);

        buf.push(0x2C);
        for v in [f.left, f.top, f.width, f.height] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.push(0);
        buf.push(min_code_size);
        buf.extend_from_slice(&sub_blocks(&lzw_encode(min_code_size, f.indices)));
    }

    buf.push(0x3B);
    buf
}
