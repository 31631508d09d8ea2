//! Layout variants.
//!
//! This module defines the `Format` trait, which captures everything that differs between
//! the two known UPG layouts: header size, file table capacity, version stamp and the
//! numeric role enumeration. The packer and extractor are generic over it.
//!
//! `canonical` is the variable file count layout produced by this tool by default.
//! `legacy` is the older fixed six-entry layout. The two share the magic and the field
//! offsets inside the header but are not interchangeable: their header sizes and role ids
//! differ, so an image must be read with the variant it was written with.

use crate::role::Role;

pub mod canonical;
pub mod legacy;

pub use canonical::Canonical;
pub use legacy::Legacy;

/// Magic tag shared by both variants.
pub const MAGIC: [u8; 4] = *b"NFWB";

/// A UPG layout variant.
pub trait Format {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Size in bytes of the fixed header record.
    fn header_size(&self) -> u64;

    /// `(version_major, version_minor)` stamped into the header.
    fn version(&self) -> (u32, u32);

    fn magic(&self) -> [u8; 4] {
        MAGIC
    }

    /// Maximum number of file table entries, if bounded.
    fn capacity(&self) -> Option<usize>;

    /// Size in bytes of the file table region for `file_count` entries, padding included.
    fn table_size(&self, file_count: usize) -> u64;

    /// Numeric tag for `role`, or `None` if this variant has no such role.
    fn role_id(&self, role: Role) -> Option<u32>;

    /// Roles accepted by this variant, in the order they are packed.
    fn roles(&self) -> &'static [Role];

    /// Reverse of [`Format::role_id`].
    fn role_of(&self, id: u32) -> Option<Role> {
        self.roles()
            .iter()
            .copied()
            .find(|role| self.role_id(*role) == Some(id))
    }
}
