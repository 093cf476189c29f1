//! Server configuration, loaded from TOML with defaults for every field

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::embedder::MAX_PIXEL_DIMENSION;

pub const DEFAULT_CONFIG_PATH: &str = "facematch.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Fixed embedding dimension. When unset the first registration decides.
    pub dimension: Option<usize>,
    /// Score at or above which a match response is flagged `is_match`.
    /// The index itself never applies a threshold.
    pub match_threshold: Option<f32>,
    pub embedder: EmbedderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            dimension: None,
            match_threshold: None,
            embedder: EmbedderConfig::default(),
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self { width: 16, height: 8 }
    }
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let (width, height) = (self.embedder.width, self.embedder.height);
        let Some(produced) = (width as usize).checked_mul(height as usize) else {
            bail!("embedder size {}x{} overflows", width, height);
        };
        if produced == 0 {
            bail!("embedder size must be non-zero, got {}x{}", width, height);
        }
        if produced > MAX_PIXEL_DIMENSION {
            bail!("embedder size {}x{} exceeds {} values", width, height, MAX_PIXEL_DIMENSION);
        }
        if let Some(dim) = self.dimension {
            if dim != produced {
                bail!("configured dimension {} does not match embedder output {}", dim, produced);
            }
        }
        if let Some(t) = self.match_threshold {
            if !(-1.0..=1.0).contains(&t) {
                bail!("match_threshold must lie in [-1, 1], got {}", t);
            }
        }
        Ok(())
    }
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod config_test {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("absent.toml"))).unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 9100\nmatch_threshold = 0.7\n\n[embedder]\nwidth = 8").unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.match_threshold, Some(0.7));
        assert_eq!(cfg.embedder, EmbedderConfig { width: 8, height: 8 });
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let cfg = Config { dimension: Some(128), ..Config::default() };
        assert!(cfg.validate().is_ok());

        let cfg = Config { dimension: Some(3), ..Config::default() };
        assert!(cfg.validate().is_err());

        let cfg = Config { match_threshold: Some(1.5), ..Config::default() };
        assert!(cfg.validate().is_err());

        let cfg = Config { embedder: EmbedderConfig { width: 0, height: 8 }, ..Config::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_oversized_embedder() {
        let cfg = Config { embedder: EmbedderConfig { width: 70_000, height: 70_000 }, ..Config::default() };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        let cfg = Config { embedder: EmbedderConfig { width: u32::MAX, height: u32::MAX }, ..Config::default() };
        assert!(cfg.validate().is_err());

        let cfg = Config { embedder: EmbedderConfig { width: 256, height: 256 }, ..Config::default() };
        assert!(cfg.validate().is_ok());
    }
}
