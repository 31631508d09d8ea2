//! On-disk records.
//!
//! The header and file table are plain little-endian structures. They are read and
//! written through `object::pod` views so that every field has a fixed offset and no
//! manual byte shuffling is needed.

use object::endian::{LittleEndian as LE, U32Bytes};
use object::pod::{self, Pod};

use crate::checksum::{crc32, Md5Digest};

/// Size of one file table entry.
pub const FILE_ENTRY_SIZE: usize = 28;

/// Bytes of the header covered by named fields before the reserved area.
const HEADER_PREFIX_SIZE: usize = 0x3C;

fn u32(v: u32) -> U32Bytes<LE> {
    U32Bytes::new(LE, v)
}

#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct RawHeaderPrefix {
    magic: [u8; 4],
    version_major: U32Bytes<LE>,
    version_minor: U32Bytes<LE>,
    reserved: [u8; 20],
    data_size: U32Bytes<LE>,
    payload_md5: [u8; 16],
    files_count: U32Bytes<LE>,
    data_offset: U32Bytes<LE>,
}

// SAFETY: repr(C), only byte arrays and unaligned integers, no padding.
unsafe impl Pod for RawHeaderPrefix {}

#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct RawFileEntry {
    id: U32Bytes<LE>,
    size: U32Bytes<LE>,
    offset: U32Bytes<LE>,
    md5: [u8; 16],
}

// SAFETY: repr(C), only byte arrays and unaligned integers, no padding.
unsafe impl Pod for RawFileEntry {}

/// The image header.
///
/// Fields sit at the same offsets in every variant; the variants differ only in the
/// size of the reserved area, so the CRC is always in the last four bytes of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub magic: [u8; 4],
    pub version_major: u32,
    pub version_minor: u32,
    /// Length of everything after the header: file table plus padded payloads.
    pub data_size: u32,
    /// MD5 over the `data_size` bytes after the header.
    pub payload_md5: Md5Digest,
    pub files_count: u32,
    /// Absolute offset of the first payload.
    pub data_offset: u32,
    /// CRC-32 of the header record with this field zeroed.
    pub header_crc32: u32,
}

impl ImageHeader {
    /// Serializes the header into a record of `header_size` bytes.
    pub fn to_bytes(&self, header_size: u64) -> Vec<u8> {
        let header_size = header_size as usize;
        assert!(header_size >= HEADER_PREFIX_SIZE + 4);

        let prefix = RawHeaderPrefix {
            magic: self.magic,
            version_major: u32(self.version_major),
            version_minor: u32(self.version_minor),
            reserved: [0; 20],
            data_size: u32(self.data_size),
            payload_md5: self.payload_md5.0,
            files_count: u32(self.files_count),
            data_offset: u32(self.data_offset),
        };

        let mut buffer = Vec::with_capacity(header_size);
        buffer.extend_from_slice(pod::bytes_of(&prefix));
        buffer.resize(header_size - 4, 0);
        buffer.extend_from_slice(&self.header_crc32.to_le_bytes());
        buffer
    }

    /// Parses a header from the start of `data`. Returns `None` if `data` is shorter
    /// than `header_size`.
    pub fn parse(data: &[u8], header_size: u64) -> Option<Self> {
        let header_size = usize::try_from(header_size).ok()?;
        if header_size < HEADER_PREFIX_SIZE + 4 || data.len() < header_size {
            return None;
        }
        let (prefix, _) = pod::from_bytes::<RawHeaderPrefix>(data).ok()?;
        let crc_bytes: [u8; 4] = data[header_size - 4..header_size].try_into().ok()?;

        Some(Self {
            magic: prefix.magic,
            version_major: prefix.version_major.get(LE),
            version_minor: prefix.version_minor.get(LE),
            data_size: prefix.data_size.get(LE),
            payload_md5: Md5Digest(prefix.payload_md5),
            files_count: prefix.files_count.get(LE),
            data_offset: prefix.data_offset.get(LE),
            header_crc32: u32::from_le_bytes(crc_bytes),
        })
    }

    /// Finalizes the header: computes the CRC over the record with the CRC field zeroed
    /// and stores it. Must run after every other field is set.
    pub fn seal(&mut self, header_size: u64) {
        self.header_crc32 = 0;
        self.header_crc32 = record_crc(&self.to_bytes(header_size));
    }
}

/// CRC-32 of a raw header record, computed as if its trailing CRC field were zero.
pub fn record_crc(record: &[u8]) -> u32 {
    let mut scratch = record.to_vec();
    let len = scratch.len();
    scratch[len.saturating_sub(4)..].fill(0);
    crc32(&scratch)
}

/// One file table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub role_id: u32,
    /// Unpadded payload size.
    pub size: u32,
    /// Absolute payload offset within the image.
    pub offset: u32,
    /// MD5 of the unpadded payload.
    pub md5: Md5Digest,
}

impl FileEntry {
    /// One past the last payload byte.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// Serializes a file table, zero filled up to `table_size`.
pub fn encode_table(entries: &[FileEntry], table_size: u64) -> Vec<u8> {
    let raw: Vec<RawFileEntry> = entries
        .iter()
        .map(|e| RawFileEntry {
            id: u32(e.role_id),
            size: u32(e.size),
            offset: u32(e.offset),
            md5: e.md5.0,
        })
        .collect();

    let mut buffer = pod::bytes_of_slice(&raw).to_vec();
    if (buffer.len() as u64) < table_size {
        buffer.resize(table_size as usize, 0);
    }
    buffer
}

/// Parses `count` entries from the start of `data`. Returns `None` if `data` is too short.
pub fn parse_table(data: &[u8], count: usize) -> Option<Vec<FileEntry>> {
    let (raw, _) = pod::slice_from_bytes::<RawFileEntry>(data, count).ok()?;
    Some(
        raw.iter()
            .map(|r| FileEntry {
                role_id: r.id.get(LE),
                size: r.size.get(LE),
                offset: r.offset.get(LE),
                md5: Md5Digest(r.md5),
            })
            .collect(),
    )
}
