//! Image encoder.
//!
//! The header and file table sit in front of the payloads but depend on them, so an
//! image is written in several passes:
//! 1. Reserve `data_offset` zero bytes for header and table.
//! 2. Append each payload, padded to 32 bytes, recording its size, offset and MD5.
//! 3. Go back and write the file table.
//! 4. Hash everything after the header and fill in the header.
//! 5. Seal the header CRC and write the header at offset zero.
//!
//! The image is built in a temporary file next to the destination and renamed into place
//! only once the header is sealed, so a failed run never leaves a half-written image behind.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::checksum::{md5_of, Md5Hasher};
use crate::error::EncodeError;
use crate::format::Format;
use crate::header::{encode_table, FileEntry, ImageHeader};
use crate::layout::{Layout, ALIGN};
use crate::role::Role;

/// A source artifact to bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    pub role: Role,
    pub path: PathBuf,
}

impl PackEntry {
    pub fn new(role: Role, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            path: path.into(),
        }
    }
}

/// What was written.
#[derive(Debug, Clone)]
pub struct PackSummary {
    pub layout: Layout,
    pub header: ImageHeader,
    /// Table entries in image order, with the role each was packed as.
    pub entries: Vec<(Role, FileEntry)>,
    /// Total image length in bytes.
    pub image_len: u64,
}

/// Builds an image from an ordered list of artifacts.
pub struct Packer<F: Format> {
    format: F,
    entries: Vec<PackEntry>,
}

impl<F: Format> Packer<F> {
    pub fn new(format: F) -> Self {
        Self {
            format,
            entries: Vec::new(),
        }
    }

    /// Appends an artifact. Payloads are placed in the order they are added.
    pub fn add(&mut self, role: Role, path: impl Into<PathBuf>) -> &mut Self {
        self.entries.push(PackEntry::new(role, path));
        self
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = PackEntry>) -> &mut Self {
        self.entries.extend(entries);
        self
    }

    pub fn entries(&self) -> &[PackEntry] {
        &self.entries
    }

    /// Resolves role ids and checks the entry count against the format.
    fn role_ids(&self) -> Result<Vec<u32>, EncodeError> {
        if self.entries.is_empty() {
            return Err(EncodeError::NoFiles);
        }
        if let Some(capacity) = self.format.capacity() {
            if self.entries.len() > capacity {
                return Err(EncodeError::TooManyFiles {
                    format: self.format.name(),
                    capacity,
                    count: self.entries.len(),
                });
            }
        }
        self.entries
            .iter()
            .map(|entry| {
                self.format
                    .role_id(entry.role)
                    .ok_or(EncodeError::UnsupportedRole {
                        role: entry.role,
                        format: self.format.name(),
                    })
            })
            .collect()
    }

    /// Writes the image to `output`, replacing any existing file only on success.
    pub fn pack(&self, output: &Path) -> Result<PackSummary, EncodeError> {
        let role_ids = self.role_ids()?;
        let output_err = |source: io::Error| EncodeError::Output {
            path: output.to_path_buf(),
            source,
        };

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = temp_image(dir).map_err(output_err)?;

        let summary = self.write_image(temp.as_file_mut(), &role_ids, output)?;
        temp.as_file().sync_all().map_err(output_err)?;
        temp.persist(output).map_err(|e| output_err(e.error))?;

        tracing::info!(
            "Packed {} files into {} ({} bytes, {} layout)",
            summary.entries.len(),
            output.display(),
            summary.image_len,
            self.format.name()
        );
        Ok(summary)
    }

    /// Runs the multi-pass write against any seekable stream.
    fn write_image<W: Read + Write + Seek>(
        &self,
        out: &mut W,
        role_ids: &[u32],
        output: &Path,
    ) -> Result<PackSummary, EncodeError> {
        let output_err = |source: io::Error| EncodeError::Output {
            path: output.to_path_buf(),
            source,
        };
        let layout = Layout::compute(&self.format, self.entries.len());
        tracing::debug!(
            "Layout: header {:#x}, table {:#x}, data offset {:#x}",
            layout.header_size,
            layout.table_size,
            layout.data_offset
        );

        // Placeholder for header and table.
        out.seek(SeekFrom::Start(0)).map_err(output_err)?;
        io::copy(&mut io::repeat(0).take(layout.data_offset), out).map_err(output_err)?;

        let mut table = Vec::with_capacity(self.entries.len());
        let mut cursor = layout.data_offset;
        for (entry, &role_id) in self.entries.iter().zip(role_ids) {
            let data = read_source(entry)?;
            let size = data.len() as u64;
            let next = Layout::next_offset(cursor, size);
            if next > u64::from(u32::MAX) {
                return Err(EncodeError::ImageTooLarge { size: next });
            }

            let file_entry = FileEntry {
                role_id,
                size: size as u32,
                offset: cursor as u32,
                md5: md5_of(&data),
            };
            tracing::debug!(
                "{} ({}): {} bytes at {:#x}, md5 {}",
                entry.role,
                entry.path.display(),
                size,
                cursor,
                file_entry.md5
            );

            out.write_all(&data).map_err(output_err)?;
            let padding = (next - cursor - size) as usize;
            out.write_all(&[0u8; ALIGN as usize][..padding])
                .map_err(output_err)?;

            table.push((entry.role, file_entry));
            cursor = next;
        }

        let raw_entries: Vec<FileEntry> = table.iter().map(|(_, e)| *e).collect();
        out.seek(SeekFrom::Start(layout.header_size))
            .map_err(output_err)?;
        out.write_all(&encode_table(&raw_entries, layout.table_size))
            .map_err(output_err)?;

        let image_len = out.seek(SeekFrom::End(0)).map_err(output_err)?;
        let data_size = image_len - layout.header_size;

        out.seek(SeekFrom::Start(layout.header_size))
            .map_err(output_err)?;
        let mut hasher = Md5Hasher::new();
        let hashed = io::copy(&mut (&mut *out).take(data_size), &mut hasher).map_err(output_err)?;
        if hashed != data_size {
            return Err(output_err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read back {hashed} of {data_size} data bytes"),
            )));
        }

        let (version_major, version_minor) = self.format.version();
        let mut header = ImageHeader {
            magic: self.format.magic(),
            version_major,
            version_minor,
            data_size: data_size as u32,
            payload_md5: hasher.finalize(),
            files_count: raw_entries.len() as u32,
            data_offset: layout.data_offset as u32,
            header_crc32: 0,
        };
        header.seal(layout.header_size);

        out.seek(SeekFrom::Start(0)).map_err(output_err)?;
        out.write_all(&header.to_bytes(layout.header_size))
            .map_err(output_err)?;
        out.flush().map_err(output_err)?;

        Ok(PackSummary {
            layout,
            header,
            entries: table,
            image_len,
        })
    }
}

/// Scratch file for the image. On unix it is created with the same mode a plain
/// `File::create` would get (0666 less the umask), not tempfile's private 0600.
fn temp_image(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Reads a whole source artifact. Empty files are refused: a zero-length payload would
/// share its offset with the next entry, and table offsets must strictly increase.
fn read_source(entry: &PackEntry) -> Result<Vec<u8>, EncodeError> {
    let data = fs::read(&entry.path).map_err(|source| EncodeError::SourceFile {
        role: entry.role,
        path: entry.path.clone(),
        source,
    })?;
    if data.is_empty() {
        return Err(EncodeError::EmptySource {
            role: entry.role,
            path: entry.path.clone(),
        });
    }
    Ok(data)
}

/// Packs `entries`, in order, into a new image at `output`.
pub fn encode<F: Format>(
    format: F,
    output: &Path,
    entries: &[PackEntry],
) -> Result<PackSummary, EncodeError> {
    let mut packer = Packer::new(format);
    packer.extend(entries.iter().cloned());
    packer.pack(output)
}
