use std::path::Path;

use crate::checksum::crc32;
use crate::container::zip::{
    CENTRAL_HEADER_LEN, CentralDirectoryHeader, EOCD_LEN, EOCD_SIG, EndOfCentralDirectory,
    LOCAL_HEADER_LEN, LocalFileHeader, METHOD_STORED,
};
use crate::codec::le::read_u32le;
use crate::error::{DwtError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub size: u32,
    pub crc32: u32,
    pub method: u16,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub name: String,
    pub crc32: u32,
    pub data: Vec<u8>,
}

fn fmt_err(what: &str, e: impl std::fmt::Display) -> DwtError {
    DwtError::Format(format!("{what}: {e}"))
}

fn slice<'a>(bytes: &'a [u8], start: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = start
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| DwtError::Format(format!("{what} out of bounds at offset {start}")))?;
    Ok(&bytes[start..end])
}

/// Scan backwards for the trailer; it may be followed by a comment of up to 64 KiB.
fn find_eocd(bytes: &[u8]) -> Result<(usize, EndOfCentralDirectory)> {
    if bytes.len() < EOCD_LEN {
        return Err(DwtError::Format("file too small for a zip trailer".into()));
    }
    let last = bytes.len() - EOCD_LEN;
    let first = last.saturating_sub(u16::MAX as usize);
    for pos in (first..=last).rev() {
        if read_u32le(&bytes[pos..pos + 4]) != EOCD_SIG {
            continue;
        }
        let eocd = EndOfCentralDirectory::read_from(&bytes[pos..])
            .map_err(|e| fmt_err("end of central directory", e))?;
        if pos + EOCD_LEN + eocd.comment_len as usize == bytes.len() {
            return Ok((pos, eocd));
        }
    }
    Err(DwtError::Format("end of central directory not found".into()))
}

/// Walk the central directory without touching entry data.
pub fn list_archive(bytes: &[u8]) -> Result<Vec<ListedEntry>> {
    let (eocd_pos, eocd) = find_eocd(bytes)?;
    if eocd.disk_number != 0 || eocd.cd_disk != 0 || eocd.entries_on_disk != eocd.entries_total
    {
        return Err(DwtError::Format("multi-disk archives are not supported".into()));
    }
    let cd_start = eocd.cd_offset as usize;
    let cd_end = cd_start + eocd.cd_size as usize;
    if cd_end > eocd_pos {
        return Err(DwtError::Format(format!(
            "central directory [{cd_start}, {cd_end}) overlaps the trailer at {eocd_pos}"
        )));
    }

    let mut out = Vec::with_capacity(eocd.entries_total as usize);
    let mut cursor = cd_start;
    for i in 0..eocd.entries_total {
        let rec = slice(bytes, cursor, CENTRAL_HEADER_LEN, "central directory record")?;
        let h = CentralDirectoryHeader::read_from(rec)
            .map_err(|e| fmt_err(&format!("central directory record {i}"), e))?;
        let name_bytes = slice(
            bytes,
            cursor + CENTRAL_HEADER_LEN,
            h.name_len as usize,
            "entry name",
        )?;
        let name = String::from_utf8(name_bytes.to_vec())
            .map_err(|e| fmt_err(&format!("entry name {i}"), e))?;
        if h.compressed_size != h.uncompressed_size && h.method == METHOD_STORED {
            return Err(DwtError::Format(format!(
                "stored entry {name} has mismatched sizes"
            )));
        }
        out.push(ListedEntry {
            name,
            size: h.uncompressed_size,
            crc32: h.crc32,
            method: h.method,
            offset: h.local_header_offset,
        });
        cursor += CENTRAL_HEADER_LEN
            + h.name_len as usize
            + h.extra_len as usize
            + h.comment_len as usize;
    }
    if cursor != cd_end {
        return Err(DwtError::Format(format!(
            "central directory size mismatch: walked {} bytes, trailer says {}",
            cursor - cd_start,
            eocd.cd_size
        )));
    }
    Ok(out)
}

/// Read every entry back and check it against its local header and CRC-32.
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ExtractedEntry>> {
    let listed = list_archive(bytes)?;
    let mut out = Vec::with_capacity(listed.len());
    for le in listed {
        if le.method != METHOD_STORED {
            return Err(DwtError::Format(format!(
                "{}: unsupported compression method {}",
                le.name, le.method
            )));
        }
        let at = le.offset as usize;
        let hdr = slice(bytes, at, LOCAL_HEADER_LEN, "local header")?;
        let lh = LocalFileHeader::read_from(hdr).map_err(|e| fmt_err(&le.name, e))?;
        let local_name = slice(bytes, at + LOCAL_HEADER_LEN, lh.name_len as usize, "entry name")?;
        if local_name != le.name.as_bytes() {
            return Err(DwtError::Format(format!(
                "{}: local header names a different entry",
                le.name
            )));
        }
        if lh.crc32 != le.crc32 || lh.uncompressed_size != le.size {
            return Err(DwtError::Format(format!(
                "{}: local header disagrees with central directory",
                le.name
            )));
        }
        let data_start = at + LOCAL_HEADER_LEN + lh.name_len as usize + lh.extra_len as usize;
        let data = slice(bytes, data_start, le.size as usize, "entry data")?;
        let actual = crc32(data);
        if actual != le.crc32 {
            return Err(DwtError::Format(format!(
                "{}: crc32 mismatch (stored {:08x}, computed {:08x})",
                le.name, le.crc32, actual
            )));
        }
        out.push(ExtractedEntry {
            name: le.name,
            crc32: actual,
            data: data.to_vec(),
        });
    }
    Ok(out)
}

pub fn read_archive_file(path: &Path) -> Result<Vec<ExtractedEntry>> {
    let bytes = std::fs::read(path)?;
    read_archive(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::writer::{NamedPayload, create_archive};

    fn sample() -> Vec<u8> {
        create_archive(&[
            NamedPayload::new("a.txt", "alpha"),
            NamedPayload::new("b.bin", vec![0u8, 1, 2, 3]),
        ])
        .unwrap()
    }

    #[test]
    fn lists_in_emission_order() {
        let rows = list_archive(&sample()).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b.bin"]);
        assert_eq!(rows[0].offset, 0);
        assert_eq!(rows[1].size, 4);
    }

    #[test]
    fn detects_flipped_data_byte() {
        let mut bytes = sample();
        let data_at = LOCAL_HEADER_LEN + "a.txt".len();
        bytes[data_at] ^= 0xFF;
        match read_archive(&bytes) {
            Err(DwtError::Format(msg)) => assert!(msg.contains("crc32 mismatch"), "{msg}"),
            other => panic!("expected crc failure, got {other:?}"),
        }
    }

    #[test]
    fn detects_truncation() {
        let bytes = sample();
        assert!(read_archive(&bytes[..bytes.len() - 1]).is_err());
        assert!(read_archive(&bytes[..10]).is_err());
    }

    #[test]
    fn tolerates_trailing_comment() {
        let mut bytes = sample();
        let n = bytes.len();
        // comment length lives in the last two bytes of the trailer
        bytes[n - 2] = 3;
        bytes.extend_from_slice(b"hey");
        assert_eq!(read_archive(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn slice_borrows_from_input_and_checks_bounds() {
        let bytes = sample();
        let head = slice(&bytes, 0, 4, "signature").unwrap();
        assert_eq!(head, b"PK\x03\x04");
        assert!(matches!(slice(&bytes, bytes.len() - 1, 2, "tail"), Err(DwtError::Format(_))));
        assert!(matches!(slice(&bytes, usize::MAX, 1, "overflow"), Err(DwtError::Format(_))));
    }
}
