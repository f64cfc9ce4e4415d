//! Archive inspection example for datdisk
//!
//! Prints the header of an archive and, when given an ID, the start of the
//! payload stored under it.
//!
//! ```text
//! cargo run --example dump -- client_portal.dat 0x06000001
//! ```

use anyhow::{bail, Context, Result};
use datdisk::Archive;

fn parse_id(text: &str) -> Result<u32> {
    let id = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    id.with_context(|| format!("invalid id {:?}", text))
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        bail!("usage: dump <archive.dat> [id]");
    };

    let archive = Archive::open(path).with_context(|| format!("failed to open {}", path))?;
    let header = archive.header();
    println!("Archive:      {}", archive.path().display());
    println!("Block size:   {}", header.block_size);
    println!("File size:    {}", header.file_size);
    println!("Tree root:    {:#010x}", header.tree_root);
    println!("Free blocks:  {}", header.free_count);
    println!("Root entries: {}", archive.index().root().entry_count());

    let Some(id) = args.get(1) else {
        return Ok(());
    };
    let id = parse_id(id)?;

    match archive.get_entry(id)? {
        Some(entry) => {
            println!("Entry {:#010x}: {} bytes", id, entry.len());
            for (row, chunk) in entry.data.chunks(16).take(8).enumerate() {
                let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
                println!("  {:04x}  {}", row * 16, hex.join(" "));
            }
        }
        None => println!("Entry {:#010x} not found", id),
    }

    Ok(())
}
