use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::{
    Codec, EncoderSettings, FfmpegSource, FrameSpec, RawPcmSource, SourceKind, SourceProvider,
};
use crate::error::ConfigError;

/// Frame durations the encoder accepts
pub const ALLOWED_FRAME_DURATIONS_MS: [u32; 3] = [20, 40, 60];

/// Engine configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub default_volume: f32,
    pub bitrate_kbps: u32,
    pub frame_duration_ms: u32,
    pub codec: Codec,
    pub source_kind: SourceKind,
    pub ffmpeg_path: PathBuf,
    pub source_buffer_bytes: usize,
    pub sink_queue_frames: usize,
    pub pace_output: bool,
    pub log_level: String,
    pub default_requester: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            bitrate_kbps: 64,
            frame_duration_ms: 20,
            codec: Codec::default(),
            source_kind: SourceKind::Ffmpeg,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            source_buffer_bytes: 512 * 1024,
            sink_queue_frames: 50,
            pace_output: true,
            log_level: "warn".to_string(),
            default_requester: "@local".to_string(),
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::InvalidValue {
            field: field.to_string(),
            reason,
        };

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(invalid(
                "default_volume",
                format!("{} is outside 0.0..=1.0", self.default_volume),
            ));
        }
        if !ALLOWED_FRAME_DURATIONS_MS.contains(&self.frame_duration_ms) {
            return Err(invalid(
                "frame_duration_ms",
                format!("{} is not one of 20, 40 or 60", self.frame_duration_ms),
            ));
        }
        if !(6..=510).contains(&self.bitrate_kbps) {
            return Err(invalid(
                "bitrate_kbps",
                format!("{} is outside 6..=510", self.bitrate_kbps),
            ));
        }
        if !self.codec.is_available() {
            return Err(invalid(
                "codec",
                format!("{} support was not compiled in", self.codec.as_str()),
            ));
        }
        if self.sink_queue_frames == 0 {
            return Err(invalid("sink_queue_frames", "must be at least 1".to_string()));
        }
        if self.source_buffer_bytes == 0 {
            return Err(invalid("source_buffer_bytes", "must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn frame_spec(&self) -> FrameSpec {
        FrameSpec::new(self.frame_duration_ms)
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            codec: self.codec,
            bitrate_bps: self.bitrate_kbps * 1000,
            frame: self.frame_spec(),
        }
    }

    /// Build the configured source provider
    pub fn source_provider(&self) -> Arc<dyn SourceProvider> {
        match self.source_kind {
            SourceKind::Ffmpeg => Arc::new(FfmpegSource::new(
                self.ffmpeg_path.clone(),
                self.source_buffer_bytes,
            )),
            SourceKind::Raw => Arc::new(RawPcmSource::new(self.source_buffer_bytes)),
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: EngineConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from the default location
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_path(Self::default_config_path()?)
    }

    /// Load from `config_path`, using defaults when the file does not exist
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path)?;
        config.validate()?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut updated = self.config.clone();
        updater(&mut updated);
        updated.validate()?;
        self.config = updated;
        self.save_config()
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ConfigError> {
        self.config.default_volume = volume.clamp(0.0, 1.0);
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = EngineConfig::default();
        self.save_config()
    }

    /// `<config dir>/voice-jukebox/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join("voice-jukebox");
        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::EncoderFactory;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_manager = ConfigManager {
            config: EngineConfig::default(),
            config_path,
        };

        (config_manager, temp_dir)
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();

        assert_eq!(config.default_volume, 1.0);
        assert_eq!(config.bitrate_kbps, 64);
        assert_eq!(config.frame_duration_ms, 20);
        assert_eq!(config.source_buffer_bytes, 524288);
        assert_eq!(config.source_kind, SourceKind::Ffmpeg);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_encoder_settings_from_config() {
        let config = EngineConfig {
            bitrate_kbps: 96,
            frame_duration_ms: 40,
            codec: Codec::Pcm,
            ..EngineConfig::default()
        };

        let settings = config.encoder_settings();
        assert_eq!(settings.bitrate_bps, 96_000);
        assert_eq!(settings.frame().samples(), 3840);
        assert_eq!(settings.codec, Codec::Pcm);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = vec![
            ("default_volume", EngineConfig { default_volume: 1.5, ..EngineConfig::default() }),
            ("frame_duration_ms", EngineConfig { frame_duration_ms: 25, ..EngineConfig::default() }),
            ("bitrate_kbps", EngineConfig { bitrate_kbps: 1000, ..EngineConfig::default() }),
            ("sink_queue_frames", EngineConfig { sink_queue_frames: 0, ..EngineConfig::default() }),
            ("source_buffer_bytes", EngineConfig { source_buffer_bytes: 0, ..EngineConfig::default() }),
        ];

        for (expected_field, config) in cases {
            match config.validate() {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("Expected InvalidValue for {}, got {:?}", expected_field, other),
            }
        }
    }

    #[test]
    fn test_save_and_load_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.config.default_volume = 0.6;
        config_manager.config.source_kind = SourceKind::Raw;
        config_manager.save_config().unwrap();

        let loaded_config = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded_config.default_volume, 0.6);
        assert_eq!(loaded_config.source_kind, SourceKind::Raw);
        assert_eq!(loaded_config, config_manager.config);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigManager::load_config(&temp_dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "bitrate_kbps = 128\nsource_kind = \"raw\"\n").unwrap();

        let manager = ConfigManager::with_path(config_path).unwrap();
        assert_eq!(manager.get_config().bitrate_kbps, 128);
        assert_eq!(manager.get_config().source_kind, SourceKind::Raw);
        assert_eq!(manager.get_config().frame_duration_ms, 20);
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        fs::write(&config_path, "invalid toml content [[[").unwrap();

        match ConfigManager::load_config(&config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other),
        }
    }

    #[test]
    fn test_with_path_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "frame_duration_ms = 10\n").unwrap();

        assert!(matches!(
            ConfigManager::with_path(config_path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_update_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager
            .update_config(|config| {
                config.default_volume = 0.9;
                config.sink_queue_frames = 10;
            })
            .unwrap();

        let loaded_config = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded_config.default_volume, 0.9);
        assert_eq!(loaded_config.sink_queue_frames, 10);
    }

    #[test]
    fn test_update_config_keeps_old_on_invalid() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        let result = config_manager.update_config(|config| config.frame_duration_ms = 7);
        assert!(result.is_err());
        assert_eq!(config_manager.get_config().frame_duration_ms, 20);
    }

    #[test]
    fn test_set_volume() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_volume(0.7).unwrap();
        assert_eq!(config_manager.config.default_volume, 0.7);

        config_manager.set_volume(1.5).unwrap();
        assert_eq!(config_manager.config.default_volume, 1.0);

        config_manager.set_volume(-0.5).unwrap();
        assert_eq!(config_manager.config.default_volume, 0.0);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();
        config_manager.config.bitrate_kbps = 32;

        config_manager.reset_to_defaults().unwrap();
        assert_eq!(config_manager.config, EngineConfig::default());
    }

    #[test]
    fn test_config_path_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("config").join("config.toml");

        let config_manager = ConfigManager {
            config: EngineConfig::default(),
            config_path: nested_path.clone(),
        };
        config_manager.save_config().unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_default_config_path() {
        match ConfigManager::default_config_path() {
            Ok(path) => {
                assert!(path.to_string_lossy().contains("voice-jukebox"));
                assert!(path.to_string_lossy().ends_with("config.toml"));
            }
            Err(ConfigError::ConfigDirNotFound) => {}
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_toml_format() {
        let toml_string = toml::to_string_pretty(&EngineConfig::default()).unwrap();

        assert!(toml_string.contains("default_volume"));
        assert!(toml_string.contains("frame_duration_ms = 20"));
        assert!(toml_string.contains("source_kind = \"ffmpeg\""));
        assert!(toml_string.contains("ffmpeg_path = \"ffmpeg\""));
    }
}
