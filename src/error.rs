//! Error types for packing and extracting images.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::checksum::Md5Digest;
use crate::role::Role;

/// Failure while building an image. Any of these aborts the whole operation.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("no input files given")]
    NoFiles,

    #[error("{format} images hold at most {capacity} files, got {count}")]
    TooManyFiles {
        format: &'static str,
        capacity: usize,
        count: usize,
    },

    #[error("role `{role}` is not defined for {format} images")]
    UnsupportedRole { role: Role, format: &'static str },

    #[error("cannot read {role} source {}: {source}", .path.display())]
    SourceFile {
        role: Role,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{role} source {} is empty", .path.display())]
    EmptySource { role: Role, path: PathBuf },

    #[error("image would be {size} bytes, larger than a 32-bit offset can address")]
    ImageTooLarge { size: u64 },

    #[error("failed to write image {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure that prevents extracting anything from an image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot create output directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read image {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image {} is {actual} bytes, shorter than the {expected} byte header", .path.display())]
    Truncated {
        path: PathBuf,
        actual: u64,
        expected: u64,
    },

    #[error(
        "file table with {files_count} entries ends at {table_end:#x}, \
         past the end of the image ({file_len:#x})"
    )]
    TableOutOfBounds {
        files_count: u32,
        table_end: u64,
        file_len: u64,
    },

    #[error("{format} images hold at most {capacity} files, header declares {files_count}")]
    TooManyFiles {
        format: &'static str,
        capacity: usize,
        files_count: u32,
    },
}

/// Failure of a single table entry. Other entries are still extracted.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry {index}: {size} bytes at {offset:#x} exceed image length {file_len:#x}")]
    OutOfBounds {
        index: usize,
        offset: u64,
        size: u64,
        file_len: u64,
    },

    #[error("entry {index}: MD5 mismatch, table says {expected}, payload hashes to {actual}")]
    Integrity {
        index: usize,
        expected: Md5Digest,
        actual: Md5Digest,
    },

    #[error("entry {index}: cannot write {}: {source}", .path.display())]
    Write {
        index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Inconsistency in the image as a whole. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageWarning {
    #[error("unexpected magic {found:02X?}")]
    Magic { found: [u8; 4] },

    #[error("header CRC is {stored:#010x}, computed {computed:#010x}")]
    HeaderCrc { stored: u32, computed: u32 },

    #[error("header declares {declared} data bytes, image has {actual}")]
    DataSize { declared: u64, actual: u64 },

    #[error("payload MD5 is {stored}, computed {computed}")]
    PayloadMd5 { stored: Md5Digest, computed: Md5Digest },

    #[error("header declares data offset {declared:#x}, layout implies {expected:#x}")]
    DataOffset { declared: u64, expected: u64 },
}
