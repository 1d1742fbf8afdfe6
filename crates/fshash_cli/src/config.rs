//! Configuration defaults loaded from `fshash.toml`.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use fshash_common::{Fingerprint, Seed};

/// Defaults for CLI runs, overridable by command-line flags.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Caller version stored in sidecar headers (masked to 24 bits).
    #[serde(default)]
    pub version: u32,

    /// Low 32 bits of the aggregate seed.
    #[serde(default)]
    pub seed_low: u32,

    /// High 32 bits of the aggregate seed.
    #[serde(default)]
    pub seed_high: u32,

    /// Fingerprint key; hashed into the 16-byte sidecar fingerprint.
    #[serde(default)]
    pub fingerprint: Option<String>,

    /// Default worker thread count; 0 selects the hardware default.
    #[serde(default)]
    pub concurrency: usize,
}

impl CliConfig {
    /// The aggregate seed assembled from the configured halves.
    pub fn seed(&self) -> Seed {
        Seed::from_parts(self.seed_low, self.seed_high)
    }

    /// The sidecar fingerprint derived from the configured key.
    pub fn fingerprint(&self) -> Fingerprint {
        match &self.fingerprint {
            Some(key) => Fingerprint::from_key(key.as_bytes()),
            None => Fingerprint::ZERO,
        }
    }
}

/// Loads configuration from the given path, from `./fshash.toml` when no
/// path is given and one exists, or defaults otherwise.
///
/// An explicitly named file that is missing or malformed is an error; the
/// implicit `./fshash.toml` only needs to parse if it exists.
pub fn load(path: Option<&str>) -> anyhow::Result<CliConfig> {
    let path = match path {
        Some(explicit) => Path::new(explicit).to_path_buf(),
        None => {
            let implicit = Path::new("fshash.toml");
            if !implicit.exists() {
                return Ok(CliConfig::default());
            }
            implicit.to_path_buf()
        }
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&content).with_context(|| format!("parsing config {}", path.display()))
}

fn parse(content: &str) -> anyhow::Result<CliConfig> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = parse("").unwrap();
        assert_eq!(config.version, 0);
        assert_eq!(config.seed().value(), 0);
        assert_eq!(config.fingerprint(), Fingerprint::ZERO);
        assert_eq!(config.concurrency, 0);
    }

    #[test]
    fn full_config() {
        let config = parse(
            r#"
version = 6
seed_low = 42
seed_high = 99
fingerprint = "my-tool"
concurrency = 4
"#,
        )
        .unwrap();
        assert_eq!(config.version, 6);
        assert_eq!(config.seed(), Seed::from_parts(42, 99));
        assert_eq!(
            config.fingerprint(),
            Fingerprint::from_key(b"my-tool")
        );
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(parse("not valid {{{").is_err());
    }

    #[test]
    fn explicit_missing_file_errors() {
        assert!(load(Some("/no/such/fshash.toml")).is_err());
    }
}
