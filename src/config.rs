//! Configuration module.
//!
//! This module defines the command-line interface (CLI) using `clap`.
//! The pack command turns its per-role options into an ordered list of
//! `(role, path)` pairs; nothing else is shared with the encoder.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::format::Format;
use crate::packer::PackEntry;
use crate::role::Role;

/// Packs firmware blobs into UPG images and extracts them again.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an image from individual artifacts
    Pack(PackArgs),
    /// Extract every artifact of an image into a directory
    Extract(ExtractArgs),
}

/// Image layout to read or write.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatKind {
    /// Variable file count, 0x180 byte header
    #[default]
    Canonical,
    /// Fixed six-entry table, 0xC0 byte header
    Legacy,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Output image
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: FormatKind,

    /// Boot ROM image (legacy layout)
    #[arg(long)]
    pub bootrom: Option<PathBuf>,

    /// Bootloader image
    #[arg(long)]
    pub uboot: Option<PathBuf>,

    /// Kernel image
    #[arg(long)]
    pub kernel: Option<PathBuf>,

    /// Root filesystem
    #[arg(long)]
    pub rootfs: Option<PathBuf>,

    /// Board filesystem
    #[arg(long)]
    pub boardfs: Option<PathBuf>,

    /// Splash screen image
    #[arg(long)]
    pub splash: Option<PathBuf>,

    /// Auxiliary data partition, may be repeated (canonical layout)
    #[arg(long)]
    pub data: Vec<PathBuf>,
}

impl PackArgs {
    fn given(&self) -> Vec<PackEntry> {
        let singles = [
            (Role::Bootrom, &self.bootrom),
            (Role::Bootloader, &self.uboot),
            (Role::Kernel, &self.kernel),
            (Role::Rootfs, &self.rootfs),
            (Role::Boardfs, &self.boardfs),
            (Role::Splash, &self.splash),
        ];
        singles
            .into_iter()
            .filter_map(|(role, path)| path.as_ref().map(|p| PackEntry::new(role, p)))
            .chain(self.data.iter().map(|p| PackEntry::new(Role::Data, p)))
            .collect()
    }

    /// The requested artifacts in the packing order of `format`. Roles the format does
    /// not define are kept at the end so the encoder can reject them by name.
    pub fn entries<F: Format>(&self, format: &F) -> Vec<PackEntry> {
        let order = format.roles();
        let mut entries = self.given();
        entries.sort_by_key(|e| order.iter().position(|r| *r == e.role).unwrap_or(order.len()));
        entries
    }
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Image to extract
    pub input: PathBuf,

    /// Directory to extract into (created if missing)
    pub output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: FormatKind,

    /// Skip re-hashing extracted payloads
    #[arg(long)]
    pub no_verify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Canonical, Legacy};

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("upg").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn pack_order_follows_format() {
        let config = parse(&[
            "pack", "-o", "out.upg", "--splash", "s", "--kernel", "k", "--uboot", "u", "--data",
            "d1", "--data", "d2",
        ]);
        let Command::Pack(args) = config.command else {
            panic!("expected pack");
        };
        let roles: Vec<Role> = args.entries(&Canonical).iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            [Role::Bootloader, Role::Kernel, Role::Splash, Role::Data, Role::Data]
        );
        let data: Vec<_> = args.entries(&Canonical)[3..].iter().map(|e| e.path.clone()).collect();
        assert_eq!(data, [PathBuf::from("d1"), PathBuf::from("d2")]);

        let roles: Vec<Role> = args.entries(&Legacy).iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            [Role::Splash, Role::Bootloader, Role::Kernel, Role::Data, Role::Data]
        );
    }

    #[test]
    fn extract_defaults() {
        let config = parse(&["extract", "fw.upg", "out", "--log-level", "debug"]);
        assert_eq!(config.log_level, "debug");
        let Command::Extract(args) = config.command else {
            panic!("expected extract");
        };
        assert_eq!(args.format, FormatKind::Canonical);
        assert!(!args.no_verify);
    }
}
