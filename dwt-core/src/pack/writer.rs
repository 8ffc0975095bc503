use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::checksum::crc32;
use crate::codec::le::{field_u16, field_u32};
use crate::container::zip::{
    CENTRAL_HEADER_LEN, CentralDirectoryHeader, EOCD_LEN, EndOfCentralDirectory, LOCAL_HEADER_LEN,
    LocalFileHeader,
};
use crate::error::{DwtError, Result};
use crate::util::atomic::write_atomic;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadData {
    /// Written as UTF-8.
    Text(String),
    Bytes(Vec<u8>),
}

impl PayloadData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PayloadData::Text(s) => s.as_bytes(),
            PayloadData::Bytes(b) => b,
        }
    }
}

impl From<String> for PayloadData {
    fn from(s: String) -> Self {
        PayloadData::Text(s)
    }
}

impl From<&str> for PayloadData {
    fn from(s: &str) -> Self {
        PayloadData::Text(s.to_string())
    }
}

impl From<Vec<u8>> for PayloadData {
    fn from(b: Vec<u8>) -> Self {
        PayloadData::Bytes(b)
    }
}

impl From<&[u8]> for PayloadData {
    fn from(b: &[u8]) -> Self {
        PayloadData::Bytes(b.to_vec())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedPayload {
    pub name: String,
    pub data: PayloadData,
}

impl NamedPayload {
    pub fn new(name: impl Into<String>, data: impl Into<PayloadData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateNames {
    /// Fail with `DuplicateEntryName`.
    #[default]
    Reject,
    /// Emit every payload, even when names collide. Legal ZIP, but most
    /// extractors keep only one of the entries.
    Allow,
}

#[derive(Clone, Debug, Default)]
pub struct ArchiveOptions {
    pub duplicates: DuplicateNames,
}

/// One stored entry, planned before anything is written.
struct ArchiveEntry<'a> {
    name: &'a str,
    data: &'a [u8],
    crc32: u32,
    size: u32,
    name_len: u16,
    /// Cumulative length of every earlier local header + name + data block.
    offset: u32,
}

fn check_names(payloads: &[NamedPayload], opts: &ArchiveOptions) -> Result<()> {
    let mut seen = HashSet::with_capacity(payloads.len());
    for p in payloads {
        if p.name.is_empty() {
            return Err(DwtError::InvalidInput(
                "archive entry name must not be empty".into(),
            ));
        }
        if !seen.insert(p.name.as_str()) {
            match opts.duplicates {
                DuplicateNames::Reject => return Err(DwtError::DuplicateEntryName(p.name.clone())),
                DuplicateNames::Allow => warn!(name = %p.name, "duplicate archive entry name"),
            }
        }
    }
    Ok(())
}

/// Layout pass: CRCs, field widths and local header offsets.
fn plan(payloads: &[NamedPayload]) -> Result<(Vec<ArchiveEntry<'_>>, usize)> {
    let mut entries = Vec::with_capacity(payloads.len());
    let mut cursor = 0usize;
    for p in payloads {
        let data = p.data.as_bytes();
        let name_len = field_u16(p.name.len(), "entry name length")?;
        let e = ArchiveEntry {
            name: &p.name,
            data,
            crc32: crc32(data),
            size: field_u32(data.len(), "entry size")?,
            name_len,
            offset: field_u32(cursor, "local header offset")?,
        };
        cursor += LOCAL_HEADER_LEN + p.name.len() + data.len();
        entries.push(e);
    }
    Ok((entries, cursor))
}

/// Build a complete stored (uncompressed) ZIP archive in memory, rejecting
/// duplicate entry names.
pub fn create_archive(payloads: &[NamedPayload]) -> Result<Vec<u8>> {
    create_archive_with(payloads, &ArchiveOptions::default())
}

pub fn create_archive_with(payloads: &[NamedPayload], opts: &ArchiveOptions) -> Result<Vec<u8>> {
    check_names(payloads, opts)?;
    let count = field_u16(payloads.len(), "entry count")?;
    let (entries, locals_len) = plan(payloads)?;

    let names_len: usize = entries.iter().map(|e| e.name.len()).sum();
    let cd_len = entries.len() * CENTRAL_HEADER_LEN + names_len;
    let cd_offset = field_u32(locals_len, "central directory offset")?;
    let cd_size = field_u32(cd_len, "central directory size")?;

    let mut out = Vec::with_capacity(locals_len + cd_len + EOCD_LEN);

    // local headers + data
    for e in &entries {
        debug!(
            name = e.name,
            offset = e.offset,
            size = e.size,
            crc32 = e.crc32,
            "local entry"
        );
        LocalFileHeader::stored(e.crc32, e.size, e.name_len).write_to(&mut out)?;
        out.extend_from_slice(e.name.as_bytes());
        out.extend_from_slice(e.data);
    }
    debug_assert_eq!(out.len(), locals_len);

    // central directory
    for e in &entries {
        CentralDirectoryHeader::stored(e.crc32, e.size, e.name_len, e.offset).write_to(&mut out)?;
        out.extend_from_slice(e.name.as_bytes());
    }

    EndOfCentralDirectory::single_disk(count, cd_size, cd_offset).write_to(&mut out)?;
    Ok(out)
}

/// Build the archive and write it to `out` atomically. Returns the archive length.
pub fn write_archive(out: &Path, payloads: &[NamedPayload], opts: &ArchiveOptions) -> Result<u64> {
    let bytes = create_archive_with(payloads, opts)?;
    write_atomic(out, &bytes)?;
    info!(path = %out.display(), entries = payloads.len(), bytes = bytes.len(), "wrote archive");
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::le::{read_u16le, read_u32le};
    use proptest::prelude::*;

    fn eocd(bytes: &[u8]) -> &[u8] {
        &bytes[bytes.len() - EOCD_LEN..]
    }

    #[test]
    fn empty_input_is_just_the_trailer() {
        let bytes = create_archive(&[]).unwrap();
        assert_eq!(bytes.len(), EOCD_LEN);
        assert_eq!(&bytes[0..4], b"PK\x05\x06");
    }

    #[test]
    fn layout_of_two_entries() {
        let payloads = vec![
            NamedPayload::new("dogs.json", "[]"),
            NamedPayload::new("entries.json", "[]"),
        ];
        let bytes = create_archive(&payloads).unwrap();

        let first = LOCAL_HEADER_LEN + "dogs.json".len() + 2;
        let second = LOCAL_HEADER_LEN + "entries.json".len() + 2;
        let cd = 2 * CENTRAL_HEADER_LEN + "dogs.json".len() + "entries.json".len();
        assert_eq!(bytes.len(), first + second + cd + EOCD_LEN);

        // second local header starts right after the first block
        assert_eq!(&bytes[first..first + 4], b"PK\x03\x04");
        // central directory starts after both blocks
        assert_eq!(&bytes[first + second..first + second + 4], b"PK\x01\x02");

        let t = eocd(&bytes);
        assert_eq!(read_u16le(&t[8..10]), 2);
        assert_eq!(read_u16le(&t[10..12]), 2);
        assert_eq!(read_u32le(&t[12..16]) as usize, cd);
        assert_eq!(read_u32le(&t[16..20]) as usize, first + second);

        // second central record points at the second local header
        let cd2 = first + second + CENTRAL_HEADER_LEN + "dogs.json".len();
        assert_eq!(read_u32le(&bytes[cd2 + 42..cd2 + 46]) as usize, first);
        assert_eq!(read_u32le(&bytes[cd2 + 16..cd2 + 20]), crc32(b"[]"));
    }

    #[test]
    fn zero_length_payload() {
        let bytes = create_archive(&[NamedPayload::new("empty.txt", Vec::new())]).unwrap();
        // crc, compressed size, uncompressed size all zero
        assert_eq!(&bytes[14..26], &[0u8; 12]);
        assert_eq!(read_u16le(&eocd(&bytes)[10..12]), 1);
    }

    #[test]
    fn text_is_utf8_encoded() {
        let bytes = create_archive(&[NamedPayload::new("n.txt", "Füße")]).unwrap();
        let start = LOCAL_HEADER_LEN + "n.txt".len();
        assert_eq!(&bytes[start..start + 6], "Füße".as_bytes());
        assert_eq!(read_u32le(&bytes[22..26]), 6);
    }

    #[test]
    fn duplicate_names_rejected_by_default() {
        let payloads = vec![NamedPayload::new("a.txt", "1"), NamedPayload::new("a.txt", "2")];
        match create_archive(&payloads) {
            Err(DwtError::DuplicateEntryName(n)) => assert_eq!(n, "a.txt"),
            other => panic!("expected DuplicateEntryName, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_allowed_when_asked() {
        let payloads = vec![NamedPayload::new("a.txt", "1"), NamedPayload::new("a.txt", "2")];
        let opts = ArchiveOptions {
            duplicates: DuplicateNames::Allow,
        };
        let bytes = create_archive_with(&payloads, &opts).unwrap();
        assert_eq!(read_u16le(&eocd(&bytes)[10..12]), 2);
    }

    #[test]
    fn empty_name_rejected() {
        let err = create_archive(&[NamedPayload::new("", "x")]).unwrap_err();
        assert!(matches!(err, DwtError::InvalidInput(_)));
    }

    #[test]
    fn write_archive_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("export.zip");
        let payloads = vec![NamedPayload::new("a.txt", "hello")];
        let n = write_archive(&out, &payloads, &ArchiveOptions::default()).unwrap();
        let on_disk = std::fs::read(&out).unwrap();
        assert_eq!(on_disk.len() as u64, n);
        assert_eq!(on_disk, create_archive(&payloads).unwrap());
    }

    proptest! {
        #[test]
        fn deterministic_and_counts_match(
            datas in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..8)
        ) {
            let payloads: Vec<_> = datas
                .into_iter()
                .enumerate()
                .map(|(i, d)| NamedPayload::new(format!("f{i}.bin"), d))
                .collect();
            let a = create_archive(&payloads).unwrap();
            let b = create_archive(&payloads).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(read_u16le(&eocd(&a)[10..12]) as usize, payloads.len());
        }
    }
}
