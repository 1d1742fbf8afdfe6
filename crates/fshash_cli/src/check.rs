//! The `fshash check` subcommand.

use fshash_cache::{CacheManager, WriteOptions};

use crate::{CheckArgs, GlobalArgs};

/// Validates a sidecar against a file list, optionally persisting the
/// result. Exits 0 when nothing changed and 1 when something did.
pub fn run(globals: &GlobalArgs, args: &CheckArgs) -> anyhow::Result<i32> {
    let manager = CacheManager::new(globals.config.version, globals.config.seed())
        .with_fingerprint(globals.config.fingerprint());

    let mut cache = manager.cache(&args.sidecar);
    cache.open();
    if globals.verbose && !globals.quiet {
        match cache.header() {
            Some(header) => println!(
                "sidecar: {} entries, digest {}",
                header.entry_count, header.digest
            ),
            None => println!("sidecar: no previous cache"),
        }
    }

    let files = (!args.files.is_empty()).then_some(args.files.as_slice());
    let outcome = cache.validate(files)?;

    if args.write {
        cache.write(&WriteOptions {
            gzip_level: args.gzip_level,
            ..WriteOptions::default()
        })?;
    }
    cache.close();

    if !globals.quiet {
        println!(
            "{} digest={} rehashed={}",
            if outcome.changed { "changed" } else { "unchanged" },
            outcome.digest,
            outcome.rehashed
        );
    }
    Ok(if outcome.changed { 1 } else { 0 })
}
