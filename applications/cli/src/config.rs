/// CLI configuration
use crate::error::{CliError, Result};
use loopweave_playback::types::MAX_FADE_OUT_SECONDS;
use loopweave_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration file read from the working directory when present
pub const CONFIG_FILE: &str = "loopweave.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoopweaveConfig {
    #[serde(default = "default_assets")]
    pub assets: AssetSettings,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default = "default_render")]
    pub render: RenderSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetSettings {
    /// Directory holding the catalog JSON files and clip audio
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Largest block rendered between timer checks
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,
}

impl Default for LoopweaveConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            engine: EngineConfig::default(),
            render: default_render(),
        }
    }
}

impl LoopweaveConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `file` must exist; otherwise `loopweave.toml` is read if
    /// present. `LOOPWEAVE_*` variables override both, with `__` between
    /// nested keys (`LOOPWEAVE_ENGINE__FADE_OUT_SECONDS=3`).
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(file, None)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_from(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match file {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("LOOPWEAVE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(8_000..=192_000).contains(&self.render.sample_rate) {
            return Err(CliError::Config(format!(
                "render.sample_rate must be 8000-192000 Hz, got {}",
                self.render.sample_rate
            )));
        }
        if self.render.block_frames == 0 {
            return Err(CliError::Config(
                "render.block_frames must be positive".to_string(),
            ));
        }

        let engine = &self.engine;
        if !(0.0..=MAX_FADE_OUT_SECONDS).contains(&engine.fade_out_seconds) {
            return Err(CliError::Config(format!(
                "engine.fade_out_seconds must be 0-{MAX_FADE_OUT_SECONDS}, got {}",
                engine.fade_out_seconds
            )));
        }
        for (key, value) in [
            ("engine.hand_off_fade_seconds", engine.hand_off_fade_seconds),
            ("engine.reset_delay_seconds", engine.reset_delay_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CliError::Config(format!(
                    "{key} must be a non-negative number, got {value}"
                )));
            }
        }
        for (key, value) in [
            ("engine.track_volume", engine.track_volume),
            ("engine.listener_volume", engine.listener_volume),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CliError::Config(format!("{key} must be 0-1, got {value}")));
            }
        }

        if !self.assets.root.is_dir() {
            return Err(CliError::Config(format!(
                "asset root not found at {:?}",
                self.assets.root
            )));
        }

        Ok(())
    }
}

// Default values
fn default_assets() -> AssetSettings {
    AssetSettings {
        root: default_root(),
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./assets")
}

fn default_render() -> RenderSettings {
    RenderSettings {
        sample_rate: default_sample_rate(),
        block_frames: default_block_frames(),
    }
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_block_frames() -> usize {
    512
}
