//! Historical fixed layout.
//!
//! Older images carry a 0xC0 byte header followed by a table that always has room for six
//! entries (6 * 28 bytes plus 0x18 bytes of padding), so payloads start at 0x180.
//! Role ids are the odd-numbered set used by the original flashing tools.

use super::Format;
use crate::role::Role;

pub const HEADER_SIZE: u64 = 0xC0;
pub const VERSION_MAJOR: u32 = 0x2;
pub const VERSION_MINOR: u32 = 0x21C;
pub const CAPACITY: usize = 6;
pub const TABLE_SIZE: u64 = 0xC0;

const ROLES: [Role; CAPACITY] = [
    Role::Bootrom,
    Role::Rootfs,
    Role::Splash,
    Role::Bootloader,
    Role::Kernel,
    Role::Boardfs,
];

/// The fixed six-entry layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Legacy;

impl Format for Legacy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn header_size(&self) -> u64 {
        HEADER_SIZE
    }

    fn version(&self) -> (u32, u32) {
        (VERSION_MAJOR, VERSION_MINOR)
    }

    fn capacity(&self) -> Option<usize> {
        Some(CAPACITY)
    }

    fn table_size(&self, _file_count: usize) -> u64 {
        TABLE_SIZE
    }

    fn role_id(&self, role: Role) -> Option<u32> {
        match role {
            Role::Bootrom => Some(1),
            Role::Rootfs => Some(3),
            Role::Splash => Some(5),
            Role::Bootloader => Some(7),
            Role::Kernel => Some(9),
            Role::Boardfs => Some(12),
            Role::Data => None,
        }
    }

    fn roles(&self) -> &'static [Role] {
        &ROLES
    }
}
