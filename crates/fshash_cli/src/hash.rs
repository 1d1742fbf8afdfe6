//! The `fshash hash` subcommand.

use fshash_common::Seed;
use fshash_engine::{hash_files_bulk, BulkOptions, OutputMode, PathSpec};

use crate::{GlobalArgs, HashArgs, Mode};

/// Hashes the given files and prints the result in the selected layout.
pub fn run(globals: &GlobalArgs, args: &HashArgs) -> anyhow::Result<i32> {
    let seed = Seed::from_parts(
        args.seed_low.unwrap_or(globals.config.seed_low),
        args.seed_high.unwrap_or(globals.config.seed_high),
    );
    let opts = BulkOptions {
        mode: match args.mode {
            Mode::Digest => OutputMode::Digest,
            Mode::Files => OutputMode::Files,
            Mode::All => OutputMode::All,
        },
        concurrency: args.concurrency.unwrap_or(globals.config.concurrency),
        seed,
    };

    let out = hash_files_bulk(&PathSpec::Paths(&args.files), &opts)?;
    if globals.quiet {
        return Ok(0);
    }

    match args.mode {
        Mode::Digest => println!("{}", hex(&out)),
        Mode::Files => {
            for (chunk, path) in out.chunks_exact(16).zip(&args.files) {
                println!("{}  {}", hex(chunk), path);
            }
        }
        Mode::All => {
            println!("{}", hex(&out[..16]));
            for (chunk, path) in out[16..].chunks_exact(16).zip(&args.files) {
                println!("{}  {}", hex(chunk), path);
            }
        }
    }
    Ok(0)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formatting() {
        assert_eq!(hex(&[0x00, 0xFF, 0x1A]), "00ff1a");
        assert_eq!(hex(&[]), "");
    }
}
