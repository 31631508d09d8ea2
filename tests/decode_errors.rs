use std::fs;
use std::path::{Path, PathBuf};

use upg::checksum::md5_of;
use upg::error::{DecodeError, EntryError, ImageWarning};
use upg::format::{Canonical, Format, Legacy};
use upg::header::{record_crc, ImageHeader};
use upg::{decode, encode, ExtractOptions, Extractor, PackEntry, Role};

const HEADER: usize = 0x180;
const TABLE: usize = HEADER;

fn build(dir: &Path) -> PathBuf {
    let a = dir.join("a");
    let b = dir.join("b");
    fs::write(&a, [0xAA; 10]).unwrap();
    fs::write(&b, [0xBB; 40]).unwrap();
    let image = dir.join("fw.upg");
    encode(
        Canonical,
        &image,
        &[PackEntry::new(Role::Kernel, a), PackEntry::new(Role::Rootfs, b)],
    )
    .unwrap();
    image
}

fn set_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Rewrites the header CRC so only the intended corruption is visible.
fn reseal(bytes: &mut [u8]) {
    let crc = record_crc(&bytes[..HEADER]);
    set_u32(bytes, HEADER - 4, crc);
}

#[test]
fn truncated_header() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let bytes = fs::read(&image).unwrap();
    fs::write(&image, &bytes[..HEADER - 1]).unwrap();

    let err = decode(Canonical, &image, &dir.path().join("out")).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Truncated { actual, expected: 0x180, .. } if actual == 0x17F
    ));

    fs::write(&image, b"").unwrap();
    let err = decode(Canonical, &image, &dir.path().join("out")).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { actual: 0, .. }));
}

#[test]
fn files_count_past_end_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let mut bytes = fs::read(&image).unwrap();
    set_u32(&mut bytes, 0x34, u32::MAX);
    reseal(&mut bytes);
    fs::write(&image, &bytes).unwrap();

    let out = dir.path().join("out");
    let err = decode(Canonical, &image, &out).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::TableOutOfBounds { files_count: u32::MAX, .. }
    ));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn legacy_capacity_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("k");
    fs::write(&path, b"kernel").unwrap();
    let image = dir.path().join("legacy.upg");
    encode(Legacy, &image, &[PackEntry::new(Role::Kernel, path)]).unwrap();

    let mut bytes = fs::read(&image).unwrap();
    set_u32(&mut bytes, 0x34, 7);
    fs::write(&image, &bytes).unwrap();

    let err = decode(Legacy, &image, &dir.path().join("out")).unwrap_err();
    assert!(matches!(err, DecodeError::TooManyFiles { capacity: 6, files_count: 7, .. }));
}

#[test]
fn entry_past_end_of_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let mut bytes = fs::read(&image).unwrap();
    // first entry: size field at table + 4
    set_u32(&mut bytes, TABLE + 4, 0x10_0000);
    fs::write(&image, &bytes).unwrap();

    let manifest = decode(Canonical, &image, &dir.path().join("out")).unwrap();
    assert!(matches!(
        manifest.entries[0].error,
        Some(EntryError::OutOfBounds { index: 0, size: 0x10_0000, .. })
    ));
    assert!(manifest.entries[0].path.is_none());

    // the second entry is still extracted
    let second = &manifest.entries[1];
    assert!(second.error.is_none());
    assert_eq!(fs::read(second.path.as_ref().unwrap()).unwrap(), [0xBB; 40]);
    assert_eq!(manifest.extracted(), 1);

    // the table changed without the header being updated
    assert!(manifest
        .warnings
        .iter()
        .any(|w| matches!(w, ImageWarning::PayloadMd5 { .. })));
    assert!(!manifest
        .warnings
        .iter()
        .any(|w| matches!(w, ImageWarning::HeaderCrc { .. })));
}

#[test]
fn payload_corruption_is_reported_per_entry() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let mut bytes = fs::read(&image).unwrap();
    let header = ImageHeader::parse(&bytes, Canonical.header_size()).unwrap();
    let first_payload = header.data_offset as usize;
    bytes[first_payload] ^= 0xFF;
    fs::write(&image, &bytes).unwrap();

    let manifest = decode(Canonical, &image, &dir.path().join("out")).unwrap();
    match &manifest.entries[0].error {
        Some(EntryError::Integrity { index: 0, expected, actual }) => {
            assert_eq!(*expected, md5_of(&[0xAA; 10]));
            assert_ne!(expected, actual);
        }
        other => panic!("unexpected {other:?}"),
    }
    // written anyway, verbatim
    let written = fs::read(manifest.entries[0].path.as_ref().unwrap()).unwrap();
    assert_eq!(written[0], 0x55);
    assert!(manifest.entries[1].error.is_none());
    assert_eq!(manifest.failures().count(), 1);

    let unverified = Extractor::new(Canonical)
        .with_options(ExtractOptions { verify: false })
        .extract(&image, &dir.path().join("unverified"))
        .unwrap();
    assert_eq!(unverified.failures().count(), 0);
    assert_eq!(unverified.extracted(), 2);
}

#[test]
fn header_damage_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let mut bytes = fs::read(&image).unwrap();
    bytes[0] = b'X';
    set_u32(&mut bytes, 0x38, 0x1000);
    bytes.extend_from_slice(&[0; 32]);
    fs::write(&image, &bytes).unwrap();

    let manifest = decode(Canonical, &image, &dir.path().join("out")).unwrap();
    assert_eq!(manifest.extracted(), 2);
    let warnings = &manifest.warnings;
    assert!(warnings.contains(&ImageWarning::Magic { found: *b"XFWB" }));
    assert!(warnings.iter().any(|w| matches!(w, ImageWarning::HeaderCrc { .. })));
    assert!(warnings.contains(&ImageWarning::DataOffset {
        declared: 0x1000,
        expected: 0x180 + 64,
    }));
    assert!(warnings.iter().any(|w| matches!(
        w,
        ImageWarning::DataSize { declared, actual } if actual - declared == 32
    )));
    // declared region is intact, so its digest still matches
    assert!(!warnings.iter().any(|w| matches!(w, ImageWarning::PayloadMd5 { .. })));
}

#[test]
fn output_directory_must_be_creatable() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, b"").unwrap();

    let err = decode(Canonical, &image, &blocker.join("out")).unwrap_err();
    assert!(matches!(err, DecodeError::Directory { .. }));
}

#[test]
fn existing_output_directory_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    let image = build(dir.path());
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    assert_eq!(decode(Canonical, &image, &out).unwrap().extracted(), 2);
}
