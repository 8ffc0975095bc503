use std::io::{Read, Write};

use crate::codec::le::{read_u16le, read_u32le, u16le, u32le};

pub const LOCAL_HEADER_SIG: u32 = 0x0403_4B50;
pub const CENTRAL_HEADER_SIG: u32 = 0x0201_4B50;
pub const EOCD_SIG: u32 = 0x0605_4B50;

/// 2.0: the lowest version that knows about stored entries with CRCs.
pub const VERSION_NEEDED: u16 = 20;
pub const VERSION_MADE_BY: u16 = 20;
pub const METHOD_STORED: u16 = 0;

pub const LOCAL_HEADER_LEN: usize = 30;
pub const CENTRAL_HEADER_LEN: usize = 46;
pub const EOCD_LEN: usize = 22;

pub const ZIP_MIME_TYPE: &str = "application/zip";

fn bad_sig(what: &str, got: u32) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("bad {what} signature 0x{got:08x}"),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalFileHeader {
    /// Stored entry, no timestamp, no extra field.
    pub fn stored(crc32: u32, size: u32, name_len: u16) -> Self {
        Self {
            version_needed: VERSION_NEEDED,
            flags: 0,
            method: METHOD_STORED,
            mod_time: 0,
            mod_date: 0,
            crc32,
            compressed_size: size,
            uncompressed_size: size,
            name_len,
            extra_len: 0,
        }
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(&u32le(LOCAL_HEADER_SIG))?;
        w.write_all(&u16le(self.version_needed))?;
        w.write_all(&u16le(self.flags))?;
        w.write_all(&u16le(self.method))?;
        w.write_all(&u16le(self.mod_time))?;
        w.write_all(&u16le(self.mod_date))?;
        w.write_all(&u32le(self.crc32))?;
        w.write_all(&u32le(self.compressed_size))?;
        w.write_all(&u32le(self.uncompressed_size))?;
        w.write_all(&u16le(self.name_len))?;
        w.write_all(&u16le(self.extra_len))?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut b = [0u8; LOCAL_HEADER_LEN];
        r.read_exact(&mut b)?;
        let sig = read_u32le(&b[0..4]);
        if sig != LOCAL_HEADER_SIG {
            return Err(bad_sig("local header", sig));
        }
        Ok(Self {
            version_needed: read_u16le(&b[4..6]),
            flags: read_u16le(&b[6..8]),
            method: read_u16le(&b[8..10]),
            mod_time: read_u16le(&b[10..12]),
            mod_date: read_u16le(&b[12..14]),
            crc32: read_u32le(&b[14..18]),
            compressed_size: read_u32le(&b[18..22]),
            uncompressed_size: read_u32le(&b[22..26]),
            name_len: read_u16le(&b[26..28]),
            extra_len: read_u16le(&b[28..30]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub comment_len: u16,
    pub disk_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    /// Absolute offset of the entry's local header.
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub fn stored(crc32: u32, size: u32, name_len: u16, local_header_offset: u32) -> Self {
        Self {
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_NEEDED,
            flags: 0,
            method: METHOD_STORED,
            mod_time: 0,
            mod_date: 0,
            crc32,
            compressed_size: size,
            uncompressed_size: size,
            name_len,
            extra_len: 0,
            comment_len: 0,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_header_offset,
        }
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(&u32le(CENTRAL_HEADER_SIG))?;
        w.write_all(&u16le(self.version_made_by))?;
        w.write_all(&u16le(self.version_needed))?;
        w.write_all(&u16le(self.flags))?;
        w.write_all(&u16le(self.method))?;
        w.write_all(&u16le(self.mod_time))?;
        w.write_all(&u16le(self.mod_date))?;
        w.write_all(&u32le(self.crc32))?;
        w.write_all(&u32le(self.compressed_size))?;
        w.write_all(&u32le(self.uncompressed_size))?;
        w.write_all(&u16le(self.name_len))?;
        w.write_all(&u16le(self.extra_len))?;
        w.write_all(&u16le(self.comment_len))?;
        w.write_all(&u16le(self.disk_start))?;
        w.write_all(&u16le(self.internal_attrs))?;
        w.write_all(&u32le(self.external_attrs))?;
        w.write_all(&u32le(self.local_header_offset))?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut b = [0u8; CENTRAL_HEADER_LEN];
        r.read_exact(&mut b)?;
        let sig = read_u32le(&b[0..4]);
        if sig != CENTRAL_HEADER_SIG {
            return Err(bad_sig("central directory", sig));
        }
        Ok(Self {
            version_made_by: read_u16le(&b[4..6]),
            version_needed: read_u16le(&b[6..8]),
            flags: read_u16le(&b[8..10]),
            method: read_u16le(&b[10..12]),
            mod_time: read_u16le(&b[12..14]),
            mod_date: read_u16le(&b[14..16]),
            crc32: read_u32le(&b[16..20]),
            compressed_size: read_u32le(&b[20..24]),
            uncompressed_size: read_u32le(&b[24..28]),
            name_len: read_u16le(&b[28..30]),
            extra_len: read_u16le(&b[30..32]),
            comment_len: read_u16le(&b[32..34]),
            disk_start: read_u16le(&b[34..36]),
            internal_attrs: read_u16le(&b[36..38]),
            external_attrs: read_u32le(&b[38..42]),
            local_header_offset: read_u32le(&b[42..46]),
        })
    }
}

/// End-of-central-directory record. Always single-disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub cd_disk: u16,
    pub entries_on_disk: u16,
    pub entries_total: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub fn single_disk(entries: u16, cd_size: u32, cd_offset: u32) -> Self {
        Self {
            entries_on_disk: entries,
            entries_total: entries,
            cd_size,
            cd_offset,
            ..Default::default()
        }
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(&u32le(EOCD_SIG))?;
        w.write_all(&u16le(self.disk_number))?;
        w.write_all(&u16le(self.cd_disk))?;
        w.write_all(&u16le(self.entries_on_disk))?;
        w.write_all(&u16le(self.entries_total))?;
        w.write_all(&u32le(self.cd_size))?;
        w.write_all(&u32le(self.cd_offset))?;
        w.write_all(&u16le(self.comment_len))?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut b = [0u8; EOCD_LEN];
        r.read_exact(&mut b)?;
        let sig = read_u32le(&b[0..4]);
        if sig != EOCD_SIG {
            return Err(bad_sig("end of central directory", sig));
        }
        Ok(Self {
            disk_number: read_u16le(&b[4..6]),
            cd_disk: read_u16le(&b[6..8]),
            entries_on_disk: read_u16le(&b[8..10]),
            entries_total: read_u16le(&b[10..12]),
            cd_size: read_u32le(&b[12..16]),
            cd_offset: read_u32le(&b[16..20]),
            comment_len: read_u16le(&b[20..22]),
        })
    }
}
