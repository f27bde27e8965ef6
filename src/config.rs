// src/config.rs

use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            warn!("Config file {} not found, using defaults", path);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| -> Result<()> {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
            Ok(())
        };

        unit(
            "landmarks.keypoint_confidence",
            self.landmarks.keypoint_confidence,
        )?;
        unit(
            "landmarks.min_visible_fraction",
            self.landmarks.min_visible_fraction,
        )?;
        unit(
            "classifier.confidence_threshold",
            self.classifier.confidence_threshold,
        )?;

        if self.landmarks.input_width == 0 || self.landmarks.input_height == 0 {
            bail!("landmarks input size must be non-zero");
        }
        if self.session.smoothing_window == 0 {
            bail!("session.smoothing_window must be at least 1");
        }
        if self.session.target_fps == 0 {
            bail!("session.target_fps must be at least 1");
        }
        if self.camera.read_timeout_ms == 0 {
            bail!("camera.read_timeout_ms must be non-zero");
        }
        if self.camera.max_consecutive_timeouts == 0 {
            bail!("camera.max_consecutive_timeouts must be at least 1");
        }
        Ok(())
    }
}
