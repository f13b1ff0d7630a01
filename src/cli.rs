use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/blockstage.json";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    width: Option<f64>,
    height: Option<f64>,
    log_level: Option<String>,
    config: Option<PathBuf>,
    project: Option<PathBuf>,
    run_for: Option<Duration>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "width" => overrides.width = Some(parse_extent("width", &value)?),
                "height" => overrides.height = Some(parse_extent("height", &value)?),
                "log-level" => overrides.log_level = Some(parse_level(&value)?),
                "config" => overrides.config = Some(PathBuf::from(value)),
                "project" => overrides.project = Some(PathBuf::from(value)),
                "run-for" => {
                    let millis = value.parse::<u64>().with_context(|| format!("Invalid run-for '{value}'"))?;
                    overrides.run_for = Some(Duration::from_millis(millis));
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --width, --height, --log-level, --config, --project, --run-for."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn project(&self) -> Option<&PathBuf> {
        self.project.as_ref()
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for
    }

    pub fn config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides { width: self.width, height: self.height, log_level: self.log_level.clone() }
    }
}

fn parse_extent(flag: &str, value: &str) -> Result<f64> {
    let parsed = value.parse::<f64>().with_context(|| format!("Invalid {flag} '{value}'"))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        bail!("Invalid {flag} '{value}'. Use a positive number.");
    }
    Ok(parsed)
}

fn parse_level(value: &str) -> Result<String> {
    let level = value.to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(level),
        other => bail!("Invalid log-level '{other}'. Use trace, debug, info, warn or error."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stage_size_and_player_options() {
        let args = ["app", "--width", "480", "--height", "360", "--project", "demo.json", "--run-for", "1500"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        let config = overrides.config_overrides();
        assert_eq!((config.width, config.height), (Some(480.0), Some(360.0)));
        assert_eq!(overrides.project(), Some(&PathBuf::from("demo.json")));
        assert_eq!(overrides.run_for(), Some(Duration::from_millis(1500)));
        assert_eq!(overrides.config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["app", "--width", "800", "--width", "1920", "--log-level", "INFO", "--log-level", "debug"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        let config = overrides.config_overrides();
        assert_eq!(config.width, Some(1920.0));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["app", "--width"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_bad_values() {
        let err = CliOverrides::parse(["app", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
        assert!(CliOverrides::parse(["app", "--height", "-5"]).is_err());
        assert!(CliOverrides::parse(["app", "--log-level", "loud"]).is_err());
        assert!(CliOverrides::parse(["app", "positional"]).is_err());
    }
}
