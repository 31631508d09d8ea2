//! Layout management.
//!
//! This module computes where things live inside an image: the fixed header, the
//! file table that follows it, and the 32 byte aligned payload slots after that.
//!
//! Rounding rule: every region is rounded up to the next multiple of [`ALIGN`], by zero
//! bytes when it is already aligned. The historical layout is expressed through its
//! fixed table size rather than an extra pad block.

use crate::format::Format;
use crate::utils::align_up;

/// Alignment of the file table and of every payload.
pub const ALIGN: u64 = 32;

/// Sizes and offsets of the fixed regions at the start of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Number of file table entries.
    pub file_count: usize,
    /// Size of the header record.
    pub header_size: u64,
    /// Size of the file table region, trailing padding included.
    pub table_size: u64,
    /// Absolute offset of the first payload (`header_size + table_size`).
    pub data_offset: u64,
}

/// Where a single payload is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Absolute offset of the payload within the image.
    pub offset: u64,
    /// Unpadded payload size.
    pub size: u64,
    /// Zero bytes written after the payload.
    pub padding: u64,
}

impl Layout {
    /// Computes the layout for `file_count` entries in the given format.
    pub fn compute<F: Format + ?Sized>(format: &F, file_count: usize) -> Self {
        let header_size = format.header_size();
        let table_size = format.table_size(file_count);
        Self {
            file_count,
            header_size,
            table_size,
            data_offset: header_size + table_size,
        }
    }

    /// Offset of the slot following a payload of `size` bytes at `offset`.
    pub fn next_offset(offset: u64, size: u64) -> u64 {
        align_up(offset + size, ALIGN)
    }

    /// Places payloads of the given sizes back to back, starting at `data_offset`.
    pub fn place(&self, sizes: &[u64]) -> Vec<Placement> {
        let mut cursor = self.data_offset;
        sizes
            .iter()
            .map(|&size| {
                let next = Self::next_offset(cursor, size);
                let placement = Placement {
                    offset: cursor,
                    size,
                    padding: next - cursor - size,
                };
                cursor = next;
                placement
            })
            .collect()
    }

    /// Total image length for payloads of the given sizes.
    pub fn image_len(&self, sizes: &[u64]) -> u64 {
        self.place(sizes)
            .last()
            .map(|p| p.offset + p.size + p.padding)
            .unwrap_or(self.data_offset)
    }
}
