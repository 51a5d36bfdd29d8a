use anyhow::{Context, Result};
use samplestore::schema::{StoreManifest, HEADER_SIZE};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Display information about a store file
pub fn run(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    // Read the header directly so stores that were never closed still show up
    let mut header = Vec::with_capacity(HEADER_SIZE as usize);
    File::open(&file)
        .context("Failed to open file")?
        .take(HEADER_SIZE)
        .read_to_end(&mut header)
        .context("Failed to read store header")?;
    let manifest = StoreManifest::decode_header(&header).context("Not a valid store file")?;
    let file_len = std::fs::metadata(&file)?.len();

    println!("samplestore File Information");
    println!("============================");
    println!("File: {}", file.display());
    println!();

    println!("Store:");
    println!("  Format version: {}", manifest.format_version);
    println!("  Store id: {}", manifest.store_id);
    println!("  Created: {}", manifest.created);
    println!("  Writer: {}", manifest.writer);
    println!(
        "  Records: {} / {} ({:.1}% used)",
        manifest.records_written,
        manifest.capacity,
        if manifest.capacity > 0 {
            manifest.records_written as f64 * 100.0 / manifest.capacity as f64
        } else {
            0.0
        }
    );
    println!(
        "  File size: {} bytes ({:.2} MB)",
        file_len,
        file_len as f64 / 1024.0 / 1024.0
    );
    if manifest.complete {
        println!("  Status: complete");
    } else {
        println!("  Status: NOT closed cleanly, record contents are undefined");
    }
    println!();

    println!("Fields:");
    for (i, field) in manifest.fields.iter().enumerate() {
        println!(
            "  {:3}. {} ({}, record shape {:?}, {} bytes/record, offset {})",
            i + 1,
            field.name,
            field.dtype,
            field.record_shape,
            field.record_bytes,
            field.offset
        );
    }

    Ok(())
}
