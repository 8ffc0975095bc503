use dwt_core::checksum::crc32;
use dwt_core::pack::writer::{ArchiveOptions, DuplicateNames, NamedPayload, create_archive, create_archive_with};
use dwt_core::read::zip::{list_archive, read_archive, read_archive_file};
use dwt_core::pack::writer::write_archive;

#[test]
fn empty_collections_round_trip() {
    let payloads = [
        NamedPayload::new("dogs.json", "[]"),
        NamedPayload::new("entries.json", "[]"),
    ];
    let bytes = create_archive(&payloads).unwrap();

    let listed = list_archive(&bytes).unwrap();
    assert_eq!(listed.len(), 2);
    for e in &listed {
        assert_eq!(e.crc32, crc32(b"[]"));
        assert_eq!(e.size, 2);
        assert_eq!(e.method, 0);
    }

    let files = read_archive(&bytes).unwrap();
    assert_eq!(files[0].name, "dogs.json");
    assert_eq!(files[1].name, "entries.json");
    assert!(files.iter().all(|f| f.data == b"[]"));
}

#[test]
fn binary_payloads_survive() {
    let blob: Vec<u8> = (0..=255u8).collect();
    let payloads = [NamedPayload::new("blob.bin", blob.clone())];
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("blob.zip");
    write_archive(&out, &payloads, &ArchiveOptions::default()).unwrap();
    let files = read_archive_file(&out).unwrap();
    assert_eq!(files[0].data, blob);
    assert_eq!(files[0].crc32, crc32(&blob));
}

#[test]
fn allowed_duplicates_are_all_stored() {
    let payloads = [NamedPayload::new("a.txt", "1"), NamedPayload::new("a.txt", "2")];
    assert!(create_archive(&payloads).is_err());

    let opts = ArchiveOptions {
        duplicates: DuplicateNames::Allow,
    };
    let bytes = create_archive_with(&payloads, &opts).unwrap();
    let files = read_archive(&bytes).unwrap();
    let data: Vec<_> = files.iter().map(|f| f.data.as_slice()).collect();
    assert_eq!(data, [b"1".as_slice(), b"2".as_slice()]);
}

#[test]
fn zip_crate_reads_the_archive() {
    use std::io::Read;

    let blob: Vec<u8> = (0..=255u8).collect();
    let payloads = [
        NamedPayload::new("dogs.json", "[]"),
        NamedPayload::new("entries.json", "[]"),
        NamedPayload::new("blob.bin", blob.clone()),
    ];
    let bytes = create_archive(&payloads).unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 3);
    let expected: [(&str, &[u8]); 3] = [
        ("dogs.json", b"[]"),
        ("entries.json", b"[]"),
        ("blob.bin", &blob),
    ];
    for (i, (name, data)) in expected.iter().enumerate() {
        let mut file = archive.by_index(i).unwrap();
        assert_eq!(file.name(), *name);
        assert_eq!(file.compression(), zip::CompressionMethod::Stored);
        assert_eq!(file.size(), data.len() as u64);
        assert_eq!(file.crc32(), crc32(data));
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        assert_eq!(out, *data);
    }
    assert_eq!(archive.by_name("entries.json").unwrap().crc32(), crc32(b"[]"));
}
