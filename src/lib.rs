//! UPG firmware container library.
//!
//! This library packs independently built firmware blobs into a single UPG image
//! and extracts them again. It is organized into several modules:
//! - `config`: CLI configuration.
//! - `format`: Layout variants (canonical and the historical fixed layout).
//! - `layout`: Header/table sizing and payload placement.
//! - `header`: On-disk header and file table records.
//! - `packer`: Image encoder.
//! - `extractor`: Image decoder.
//! - `checksum`: MD5 and CRC32 primitives.
//! - `role`: Artifact roles.
//! - `error`: Error and warning types.

pub mod checksum;
pub mod config;
pub mod error;
pub mod extractor;
pub mod format;
pub mod header;
pub mod layout;
pub mod packer;
pub mod role;
pub mod utils;

pub use error::{DecodeError, EncodeError, EntryError, ImageWarning};
pub use extractor::{decode, ExtractOptions, Extractor, Manifest};
pub use packer::{encode, PackEntry, PackSummary, Packer};
pub use role::Role;
