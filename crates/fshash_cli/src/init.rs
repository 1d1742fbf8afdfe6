//! The `fshash init` subcommand.

use std::fs;
use std::path::Path;

use anyhow::bail;

use crate::{GlobalArgs, InitArgs};

/// Writes a starter `fshash.toml` into the current directory.
///
/// Refuses to overwrite an existing configuration.
pub fn run(globals: &GlobalArgs, args: &InitArgs) -> anyhow::Result<i32> {
    let path = Path::new("fshash.toml");
    if path.exists() {
        bail!("fshash.toml already exists");
    }

    let mut content = format!(
        r#"# fshash configuration. Values here are defaults; command-line flags win.

# Caller version stored in sidecar headers (24-bit). Bump to invalidate
# every existing sidecar at once.
version = {}

# Aggregate-digest seed, as two 32-bit halves.
seed_low = 0
seed_high = 0

# Worker thread count for hashing; 0 picks the hardware default.
concurrency = 0
"#,
        args.version
    );

    if let Some(key) = &args.fingerprint {
        content.push_str(&format!(
            r#"
# Fingerprint key, hashed into the sidecar's 16-byte rejection key.
fingerprint = "{key}"
"#
        ));
    }

    fs::write(path, content)?;
    if !globals.quiet {
        eprintln!("Created fshash.toml");
    }
    Ok(0)
}
