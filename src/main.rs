//! Entry point for the upg tool.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Set up `tracing` output at the requested level.
//! 3. Dispatch to the packer or extractor for the selected layout.
//!
//! Error handling is done via `anyhow`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use upg::config::{Command, Config, ExtractArgs, FormatKind, PackArgs};
use upg::format::{Canonical, Format, Legacy};
use upg::{encode, ExtractOptions, Extractor};

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &config.command {
        Command::Pack(args) => match args.format {
            FormatKind::Canonical => pack(Canonical, args),
            FormatKind::Legacy => pack(Legacy, args),
        },
        Command::Extract(args) => match args.format {
            FormatKind::Canonical => extract(Canonical, args),
            FormatKind::Legacy => extract(Legacy, args),
        },
    }
}

fn pack<F: Format>(format: F, args: &PackArgs) -> Result<()> {
    let entries = args.entries(&format);
    let summary = encode(format, &args.output, &entries)
        .with_context(|| format!("failed to pack {}", args.output.display()))?;

    for (role, entry) in &summary.entries {
        println!(
            "[*] {:<8} {:>10} bytes at {:#010X} (MD5: {})",
            role, entry.size, entry.offset, entry.md5
        );
    }
    println!(
        "[+] Packed {} files into {}",
        summary.entries.len(),
        args.output.display()
    );
    Ok(())
}

fn extract<F: Format>(format: F, args: &ExtractArgs) -> Result<()> {
    let options = ExtractOptions {
        verify: !args.no_verify,
    };
    let manifest = Extractor::new(format)
        .with_options(options)
        .extract(&args.input, &args.output_dir)
        .with_context(|| format!("failed to extract {}", args.input.display()))?;

    println!("[+] {} files found.", manifest.header.files_count);
    for warning in &manifest.warnings {
        println!("[!] {warning}");
    }
    for entry in &manifest.entries {
        match (&entry.path, &entry.error) {
            (Some(path), None) => {
                println!("[*] Extracted {} (MD5: {})", path.display(), entry.declared_md5)
            }
            (_, Some(error)) => println!("[-] {error}"),
            (None, None) => {}
        }
    }

    let failed = manifest.failures().count();
    if failed > 0 {
        bail!(
            "{failed} of {} entries failed, {} extracted",
            manifest.entries.len(),
            manifest.extracted()
        );
    }
    println!("[+] Done, {} files extracted.", manifest.extracted());
    Ok(())
}
