//! Canonical layout.
//!
//! Variable number of files, 0x180 byte header. The file table is sized to the number of
//! entries and rounded up to the next 32 byte boundary (by zero when already aligned).

use super::Format;
use crate::header::FILE_ENTRY_SIZE;
use crate::role::Role;
use crate::utils::align_up;

pub const HEADER_SIZE: u64 = 0x180;
pub const VERSION_MAJOR: u32 = 0x2;
pub const VERSION_MINOR: u32 = 0x226;

const ROLES: [Role; 6] = [
    Role::Bootloader,
    Role::Kernel,
    Role::Rootfs,
    Role::Boardfs,
    Role::Splash,
    Role::Data,
];

/// The canonical, variable file count layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonical;

impl Format for Canonical {
    fn name(&self) -> &'static str {
        "canonical"
    }

    fn header_size(&self) -> u64 {
        HEADER_SIZE
    }

    fn version(&self) -> (u32, u32) {
        (VERSION_MAJOR, VERSION_MINOR)
    }

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn table_size(&self, file_count: usize) -> u64 {
        align_up(file_count as u64 * FILE_ENTRY_SIZE as u64, 32)
    }

    fn role_id(&self, role: Role) -> Option<u32> {
        match role {
            Role::Bootloader => Some(1),
            Role::Kernel => Some(2),
            Role::Rootfs => Some(3),
            Role::Boardfs => Some(4),
            Role::Splash => Some(5),
            Role::Data => Some(6),
            Role::Bootrom => None,
        }
    }

    fn roles(&self) -> &'static [Role] {
        &ROLES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rounds_up_only_when_needed() {
        assert_eq!(Canonical.table_size(0), 0);
        assert_eq!(Canonical.table_size(1), 32);
        assert_eq!(Canonical.table_size(2), 64);
        assert_eq!(Canonical.table_size(6), 192);
        // 8 * 28 = 224 = 7 * 32, already aligned
        assert_eq!(Canonical.table_size(8), 224);
    }

    #[test]
    fn role_ids_are_unique() {
        for role in Canonical.roles() {
            let id = Canonical.role_id(*role).unwrap();
            assert_eq!(Canonical.role_of(id), Some(*role));
        }
        assert_eq!(Canonical.role_id(Role::Bootrom), None);
        assert_eq!(Canonical.role_of(0), None);
    }
}
