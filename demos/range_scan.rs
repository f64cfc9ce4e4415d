//! Range enumeration example for datdisk
//!
//! Lists every ID between two bounds and reports scan progress.
//!
//! ```text
//! cargo run --example range_scan -- client_cell_1.dat 0x01010000 0x0101FFFF
//! ```

use anyhow::{bail, Context, Result};
use datdisk::{Archive, Options, Preload};

fn parse_id(text: &str) -> Result<u32> {
    let hex = text.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(hex, 16).with_context(|| format!("invalid hex id {:?}", text))
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 3 {
        bail!("usage: range_scan <archive.dat> <min-id> <max-id>");
    }
    let (min, max) = (parse_id(&args[1])?, parse_id(&args[2])?);

    // Decode the top level up front.
    let options = Options::new().preload(Preload::Children);
    let archive = Archive::open_with_options(&args[0], options)?;

    let mut count = 0usize;
    let mut bytes = 0u64;
    let mut last_reported = -10.0f32;
    archive.find_ids_in_range(
        min,
        max,
        |id, entry| {
            count += 1;
            bytes += u64::from(entry.length);
            println!("{:#010x}  {:>8} bytes  head {:#010x}", id, entry.length, entry.chain_head);
        },
        |percent| {
            if percent - last_reported >= 10.0 || percent >= 100.0 {
                eprintln!("{:5.1}%", percent);
                last_reported = percent;
            }
        },
    );

    println!("{} entries, {} bytes total", count, bytes);
    Ok(())
}
