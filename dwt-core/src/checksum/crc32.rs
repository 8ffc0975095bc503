//! CRC-32 (ISO-HDLC / PKZIP), reflected polynomial `0xEDB88320`.

pub const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Lookup table, evaluated at compile time and shared by every caller.
pub static TABLE: [u32; 256] = build_table();

pub const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// Incremental hasher; `crc32` is the one-shot form.
#[derive(Clone, Copy, Debug)]
pub struct Crc32 {
    acc: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self { acc: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let mut acc = self.acc;
        for &b in bytes {
            acc = TABLE[((acc ^ b as u32) & 0xFF) as usize] ^ (acc >> 8);
        }
        self.acc = acc;
    }

    pub fn finalize(self) -> u32 {
        !self.acc
    }
}

pub fn crc32(bytes: &[u8]) -> u32 {
    let mut h = Crc32::new();
    h.update(bytes);
    h.finalize()
}
