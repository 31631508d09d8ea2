//! Image decoder.
//!
//! Every length and offset read from the image is checked against the real file size
//! before it is used to slice the mapping. A bad header or file table stops extraction;
//! a bad entry is recorded in the manifest and the remaining entries are still written.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::checksum::{md5_of, Md5Digest};
use crate::error::{DecodeError, EntryError, ImageWarning};
use crate::format::Format;
use crate::header::{parse_table, record_crc, FileEntry, ImageHeader, FILE_ENTRY_SIZE};
use crate::layout::Layout;
use crate::role::Role;

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Re-hash every extracted payload and compare it with the table.
    pub verify: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Outcome for one file table entry.
#[derive(Debug)]
pub struct ExtractedEntry {
    /// Position in the file table.
    pub index: usize,
    pub role_id: u32,
    /// `None` when the id is not part of the format's enumeration.
    pub role: Option<Role>,
    pub offset: u64,
    pub size: u64,
    pub declared_md5: Md5Digest,
    /// Where the payload was written, if it was.
    pub path: Option<PathBuf>,
    pub error: Option<EntryError>,
}

/// Result of decoding an image.
#[derive(Debug)]
pub struct Manifest {
    pub header: ImageHeader,
    pub entries: Vec<ExtractedEntry>,
    pub warnings: Vec<ImageWarning>,
}

impl Manifest {
    /// Number of payloads written to disk.
    pub fn extracted(&self) -> usize {
        self.entries.iter().filter(|e| e.path.is_some()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExtractedEntry> {
        self.entries.iter().filter(|e| e.error.is_some())
    }
}

/// Extracts the payloads of an image.
pub struct Extractor<F: Format> {
    format: F,
    options: ExtractOptions,
}

impl<F: Format> Extractor<F> {
    pub fn new(format: F) -> Self {
        Self {
            format,
            options: ExtractOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Extracts every entry of `input` into `output_dir`, creating the directory if needed.
    pub fn extract(&self, input: &Path, output_dir: &Path) -> Result<Manifest, DecodeError> {
        fs::create_dir_all(output_dir).map_err(|source| DecodeError::Directory {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let input_err = |source| DecodeError::Input {
            path: input.to_path_buf(),
            source,
        };
        let file = File::open(input).map_err(input_err)?;
        let file_len = file.metadata().map_err(input_err)?.len();
        let header_size = self.format.header_size();
        if file_len < header_size {
            return Err(DecodeError::Truncated {
                path: input.to_path_buf(),
                actual: file_len,
                expected: header_size,
            });
        }

        // SAFETY: the mapping is read-only and the image is not modified while we hold it.
        let mmap = unsafe { Mmap::map(&file) }.map_err(input_err)?;
        let data = &mmap[..];
        let file_len = data.len() as u64;

        let header = ImageHeader::parse(data, header_size).ok_or(DecodeError::Truncated {
            path: input.to_path_buf(),
            actual: file_len,
            expected: header_size,
        })?;
        tracing::info!("{} files found in {}", header.files_count, input.display());

        let table = self.read_table(data, &header)?;
        let warnings = self.check_image(data, &header);
        for warning in &warnings {
            tracing::warn!("{}: {}", input.display(), warning);
        }

        let entries = table
            .iter()
            .enumerate()
            .map(|(index, entry)| self.extract_entry(data, index, entry, output_dir))
            .collect();

        Ok(Manifest {
            header,
            entries,
            warnings,
        })
    }

    /// Reads the file table after validating `files_count` against the image length.
    fn read_table(
        &self,
        data: &[u8],
        header: &ImageHeader,
    ) -> Result<Vec<FileEntry>, DecodeError> {
        if let Some(capacity) = self.format.capacity() {
            if header.files_count as usize > capacity {
                return Err(DecodeError::TooManyFiles {
                    format: self.format.name(),
                    capacity,
                    files_count: header.files_count,
                });
            }
        }

        let file_len = data.len() as u64;
        let header_size = self.format.header_size();
        let table_end = header_size + u64::from(header.files_count) * FILE_ENTRY_SIZE as u64;
        let out_of_bounds = DecodeError::TableOutOfBounds {
            files_count: header.files_count,
            table_end,
            file_len,
        };
        if table_end > file_len {
            return Err(out_of_bounds);
        }
        parse_table(&data[header_size as usize..], header.files_count as usize)
            .ok_or(out_of_bounds)
    }

    /// Whole-image consistency checks. None of these stop extraction.
    fn check_image(&self, data: &[u8], header: &ImageHeader) -> Vec<ImageWarning> {
        let mut warnings = Vec::new();
        let header_size = self.format.header_size();

        if header.magic != self.format.magic() {
            warnings.push(ImageWarning::Magic {
                found: header.magic,
            });
        }

        let computed = record_crc(&data[..header_size as usize]);
        if computed != header.header_crc32 {
            warnings.push(ImageWarning::HeaderCrc {
                stored: header.header_crc32,
                computed,
            });
        }

        let actual = data.len() as u64 - header_size;
        let declared = u64::from(header.data_size);
        if declared != actual {
            warnings.push(ImageWarning::DataSize { declared, actual });
        }
        if declared <= actual {
            let region = &data[header_size as usize..(header_size + declared) as usize];
            let computed = md5_of(region);
            if computed != header.payload_md5 {
                warnings.push(ImageWarning::PayloadMd5 {
                    stored: header.payload_md5,
                    computed,
                });
            }
        }

        let expected = Layout::compute(&self.format, header.files_count as usize).data_offset;
        if u64::from(header.data_offset) != expected {
            warnings.push(ImageWarning::DataOffset {
                declared: u64::from(header.data_offset),
                expected,
            });
        }

        warnings
    }

    fn extract_entry(
        &self,
        data: &[u8],
        index: usize,
        entry: &FileEntry,
        output_dir: &Path,
    ) -> ExtractedEntry {
        let role = self.format.role_of(entry.role_id);
        let mut extracted = ExtractedEntry {
            index,
            role_id: entry.role_id,
            role,
            offset: u64::from(entry.offset),
            size: u64::from(entry.size),
            declared_md5: entry.md5,
            path: None,
            error: None,
        };

        let file_len = data.len() as u64;
        if entry.end() > file_len {
            let error = EntryError::OutOfBounds {
                index,
                offset: extracted.offset,
                size: extracted.size,
                file_len,
            };
            tracing::warn!("{}", error);
            extracted.error = Some(error);
            return extracted;
        }

        let payload = &data[entry.offset as usize..entry.end() as usize];
        let path = output_dir.join(output_name(role, entry));
        tracing::debug!(
            "Extracting {} ({} bytes at {:#x}, md5 {})",
            path.display(),
            entry.size,
            entry.offset,
            entry.md5
        );

        if let Err(source) = fs::write(&path, payload) {
            let error = EntryError::Write {
                index,
                path,
                source,
            };
            tracing::warn!("{}", error);
            extracted.error = Some(error);
            return extracted;
        }
        extracted.path = Some(path);

        if self.options.verify {
            let actual = md5_of(payload);
            if actual != entry.md5 {
                let error = EntryError::Integrity {
                    index,
                    expected: entry.md5,
                    actual,
                };
                tracing::warn!("{}", error);
                extracted.error = Some(error);
            }
        }
        extracted
    }
}

/// File name for an extracted payload: role name and payload offset.
pub fn output_name(role: Option<Role>, entry: &FileEntry) -> String {
    match role {
        Some(role) => format!("{}_{:X}.bin", role, entry.offset),
        None => format!("role{}_{:X}.bin", entry.role_id, entry.offset),
    }
}

/// Extracts `input` into `output_dir` with default options.
pub fn decode<F: Format>(
    format: F,
    input: &Path,
    output_dir: &Path,
) -> Result<Manifest, DecodeError> {
    Extractor::new(format).extract(input, output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::md5_of;

    #[test]
    fn names_use_role_and_offset() {
        let entry = FileEntry {
            role_id: 2,
            size: 10,
            offset: 0x1C0,
            md5: md5_of(b""),
        };
        assert_eq!(output_name(Some(Role::Kernel), &entry), "kernel_1C0.bin");
        assert_eq!(output_name(None, &entry), "role2_1C0.bin");
    }

    #[test]
    fn verification_is_on_by_default() {
        assert!(ExtractOptions::default().verify);
    }
}
