use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::preprocess::normalizer::DEFAULT_MAX_IMAGE_BYTES;

pub const ENV_CONFIG_PATH: &str = "FOOD_AESTHETICS_CONFIG";
pub const ENV_ADDR: &str = "FOOD_AESTHETICS_ADDR";
pub const ENV_MODEL: &str = "FOOD_AESTHETICS_MODEL";
pub const ENV_BATCH_SIZE: &str = "FOOD_AESTHETICS_BATCH_SIZE";
pub const ENV_MAX_BATCH: &str = "FOOD_AESTHETICS_MAX_BATCH";
pub const ENV_MAX_IMAGE_BYTES: &str = "FOOD_AESTHETICS_MAX_IMAGE_BYTES";

// ---------------------------------------------------------------------------
// ScorerConfig
// ---------------------------------------------------------------------------

/// Knobs of the scoring pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorerConfig {
    /// Maximum number of images evaluated in one forward pass.
    pub batch_size: usize,
    /// Encoded images larger than this are rejected before decoding.
    pub max_image_bytes: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig { batch_size: 8, max_image_bytes: DEFAULT_MAX_IMAGE_BYTES }
    }
}

impl ScorerConfig {
    pub fn with_batch_size(batch_size: usize) -> Self {
        ScorerConfig { batch_size: batch_size.max(1), ..ScorerConfig::default() }
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_model_path() -> String {
    "models/food_aesthetics.json".to_string()
}
fn default_batch_size() -> usize {
    8
}
fn default_max_batch_images() -> usize {
    10
}
fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

/// Settings for the HTTP service.  Read from an optional TOML file, then
/// overridden by `FOOD_AESTHETICS_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Largest list accepted by `/score-batch`.
    #[serde(default = "default_max_batch_images")]
    pub max_batch_images: usize,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            bind_addr: default_bind_addr(),
            model_path: default_model_path(),
            batch_size: default_batch_size(),
            max_batch_images: default_max_batch_images(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl ServiceConfig {
    /// Loads `.env`, the TOML file named by `FOOD_AESTHETICS_CONFIG` (if any)
    /// and the environment overrides, in that order.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: ServiceConfig = toml::from_str(text)?;
        Ok(cfg)
    }

    /// Applies overrides from `lookup` (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = lookup(ENV_MODEL) {
            self.model_path = v;
        }
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = parse_usize(ENV_BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_BATCH) {
            self.max_batch_images = parse_usize(ENV_MAX_BATCH, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_IMAGE_BYTES) {
            self.max_image_bytes = parse_usize(ENV_MAX_IMAGE_BYTES, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.max_batch_images == 0 {
            bail!("max_batch_images must be at least 1");
        }
        if self.max_image_bytes == 0 {
            bail!("max_image_bytes must be at least 1");
        }
        Ok(())
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            batch_size: self.batch_size,
            max_image_bytes: self.max_image_bytes,
        }
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{key} must be a non-negative integer, got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.max_batch_images, 10);
        assert_eq!(cfg.scorer_config(), ScorerConfig::default());
    }

    #[test]
    fn toml_values_are_read() {
        let cfg = ServiceConfig::from_toml_str(
            "bind_addr = \"0.0.0.0:9000\"\nbatch_size = 4\nmodel_path = \"m.json\"\n",
        )
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.model_path, "m.json");
        assert_eq!(cfg.max_batch_images, 10);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let env: HashMap<&str, &str> =
            [(ENV_BATCH_SIZE, "2"), (ENV_MODEL, "/srv/model.json")].into_iter().collect();
        let mut cfg = ServiceConfig::from_toml_str("batch_size = 16").unwrap();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.batch_size, 2);
        assert_eq!(cfg.model_path, "/srv/model.json");
    }

    #[test]
    fn bad_override_and_zero_batch_are_rejected() {
        let mut cfg = ServiceConfig::default();
        let err = cfg.apply_overrides(|k| (k == ENV_MAX_BATCH).then(|| "ten".to_string()));
        assert!(err.is_err());

        let cfg = ServiceConfig::from_toml_str("batch_size = 0").unwrap();
        assert!(cfg.validate().is_err());
    }
}
