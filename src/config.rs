use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    #[serde(default = "StageConfig::default_width")]
    pub width: f64,
    #[serde(default = "StageConfig::default_height")]
    pub height: f64,
}

/// Pauses inserted by blocks that take time.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_motion_pause_ms")]
    pub motion_pause_ms: u64,
    #[serde(default = "TimingConfig::default_say_pause_ms")]
    pub say_pause_ms: u64,
    #[serde(default = "TimingConfig::default_loop_yield_ms")]
    pub loop_yield_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "ConsoleConfig::default_capacity")]
    pub capacity: usize,
    #[serde(default = "ConsoleConfig::default_echo")]
    pub echo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub stage: StageConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfigOverrides {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub log_level: Option<String>,
}

impl StageConfig {
    const fn default_width() -> f64 {
        380.0
    }

    const fn default_height() -> f64 {
        285.0
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self { width: Self::default_width(), height: Self::default_height() }
    }
}

impl TimingConfig {
    const fn default_motion_pause_ms() -> u64 {
        30
    }

    const fn default_say_pause_ms() -> u64 {
        100
    }

    const fn default_loop_yield_ms() -> u64 {
        10
    }

    pub fn motion_pause(&self) -> Duration {
        Duration::from_millis(self.motion_pause_ms)
    }

    pub fn say_pause(&self) -> Duration {
        Duration::from_millis(self.say_pause_ms)
    }

    pub fn loop_yield(&self) -> Duration {
        Duration::from_millis(self.loop_yield_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            motion_pause_ms: Self::default_motion_pause_ms(),
            say_pause_ms: Self::default_say_pause_ms(),
            loop_yield_ms: Self::default_loop_yield_ms(),
        }
    }
}

impl ConsoleConfig {
    const fn default_capacity() -> usize {
        500
    }

    const fn default_echo() -> bool {
        true
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { capacity: Self::default_capacity(), echo: Self::default_echo() }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Self::default_level() }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.stage.width = width;
        }
        if let Some(height) = overrides.height {
            self.stage.height = height;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.log_level.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.log_level.is_some() {
            fields.push("log_level");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_files_fill_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        write!(file, r#"{{ "stage": {{ "width": 480 }}, "timing": {{ "say_pause_ms": 250 }} }}"#)
            .expect("write config");
        let cfg = AppConfig::load(file.path()).expect("config should load");
        assert_eq!(cfg.stage.width, 480.0);
        assert_eq!(cfg.stage.height, 285.0);
        assert_eq!(cfg.timing.say_pause(), Duration::from_millis(250));
        assert_eq!(cfg.timing.motion_pause(), Duration::from_millis(30));
        assert_eq!(cfg.timing.loop_yield(), Duration::from_millis(10));
        assert_eq!(cfg.console.capacity, 500);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::load_or_default("does/not/exist.json");
        assert_eq!(cfg.stage.width, 380.0);
        assert!(cfg.console.echo);
    }

    #[test]
    fn overrides_replace_selected_fields() {
        let mut cfg = AppConfig::default();
        let overrides =
            AppConfigOverrides { width: Some(640.0), height: None, log_level: Some("debug".to_string()) };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.stage.width, 640.0);
        assert_eq!(cfg.stage.height, 285.0);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(overrides.applied_fields(), vec!["width", "log_level"]);
        assert!(AppConfigOverrides::default().is_empty());
    }
}
