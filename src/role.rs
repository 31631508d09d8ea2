//! Artifact roles.
//!
//! A role names what a bundled blob is for. The numeric tag written into the file
//! table depends on the layout variant, see [`crate::format::Format::role_id`].

use std::fmt;

/// Logical purpose of a bundled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Boot ROM image (historical layout only).
    Bootrom,
    /// Second stage bootloader (u-boot).
    Bootloader,
    Kernel,
    /// Root filesystem.
    Rootfs,
    /// Board specific filesystem.
    Boardfs,
    /// Boot splash image.
    Splash,
    /// Auxiliary data partition (canonical layout only, may repeat).
    Data,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Bootrom,
        Role::Bootloader,
        Role::Kernel,
        Role::Rootfs,
        Role::Boardfs,
        Role::Splash,
        Role::Data,
    ];

    /// Stable lower-case name, used for CLI flags and extracted file names.
    pub fn name(self) -> &'static str {
        match self {
            Role::Bootrom => "bootrom",
            Role::Bootloader => "uboot",
            Role::Kernel => "kernel",
            Role::Rootfs => "rootfs",
            Role::Boardfs => "boardfs",
            Role::Splash => "splash",
            Role::Data => "data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|role| role.name() == lower)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.name()), Some(role));
        }
        assert_eq!(Role::from_name("KERNEL"), Some(Role::Kernel));
        assert_eq!(Role::from_name("initrd"), None);
    }
}
