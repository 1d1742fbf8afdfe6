//! The `fshash show` subcommand.

use anyhow::bail;

use fshash_cache::{CacheManager, DataItem};

use crate::{GlobalArgs, ShowArgs};

/// Prints a human-readable summary of a sidecar: header fields, the tracked
/// file list with stored digests, and the payload sections.
pub fn run(globals: &GlobalArgs, args: &ShowArgs) -> anyhow::Result<i32> {
    let manager = CacheManager::new(globals.config.version, globals.config.seed())
        .with_fingerprint(globals.config.fingerprint());

    let mut cache = manager.cache(&args.sidecar);
    cache.open();

    let Some(header) = cache.header().copied() else {
        bail!(
            "{}: no usable sidecar (missing, corrupt, or version/fingerprint mismatch)",
            args.sidecar
        );
    };

    if globals.quiet {
        return Ok(0);
    }

    println!("version:     {}", header.version);
    println!("digest:      {}", header.digest);
    println!("fingerprint: {}", header.fingerprint);
    println!("entries:     {}", header.entry_count);

    for (path, entry) in cache.read_files().iter().zip(cache.entries()) {
        println!("  {}  {}  ({} bytes)", entry.hash, path, entry.size);
    }

    let raw = cache.read_raw_data();
    println!("raw items:   {}", raw.len());
    for item in &raw {
        println!("  {}", describe(item));
    }

    let gzip = cache.read_gzip_data();
    println!(
        "gzip items:  {} ({} bytes uncompressed)",
        gzip.len(),
        header.gzip_uncompressed_len
    );
    for item in &gzip {
        println!("  {}", describe(item));
    }

    cache.close();
    Ok(0)
}

/// One-line description of a payload item.
fn describe(item: &DataItem) -> String {
    match item {
        DataItem::Bytes(bytes) => format!("bytes[{}]", bytes.len()),
        DataItem::Text(text) => {
            if text.chars().count() > 60 {
                let head: String = text.chars().take(60).collect();
                format!("text: {head:?}…")
            } else {
                format!("text: {text:?}")
            }
        }
        DataItem::Json(value) => format!("json: {value}"),
        DataItem::Null => "null".to_string(),
        DataItem::Absent => "absent".to_string(),
    }
}
