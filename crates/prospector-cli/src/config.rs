//! Configuration vault – reads/writes `prospector.toml`.
//!
//! The file has two tables, `[perception]` and `[drive]`; every key is
//! optional and falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};

use prospector_perception::PerceptionConfig;
use prospector_runtime::DriveConfig;
use prospector_types::ProspectorError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "prospector.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub perception: PerceptionConfig,
    #[serde(default)]
    pub drive: DriveConfig,
}

impl Config {
    /// Validate both tables.
    pub fn validate(&self) -> Result<(), ProspectorError> {
        self.perception.validate()?;
        self.drive.validate()
    }
}

/// `explicit` if given, else `./prospector.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf)
}

/// Load, apply environment overrides, and validate.
///
/// A missing file yields the defaults; a file that exists but cannot be read
/// or parsed is an error.
pub fn load(path: &Path) -> Result<Config, ProspectorError> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load the file at `path` as written. Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ProspectorError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        ProspectorError::Io(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| ProspectorError::invalid_config(path.display().to_string(), e.to_string()))?;
    Ok(Some(cfg))
}

/// Apply `PROSPECTOR_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PROSPECTOR_WORLD_SIZE` | `perception.world_size` |
/// | `PROSPECTOR_MAX_VEL` | `drive.max_vel` |
/// | `PROSPECTOR_THROTTLE_SET` | `drive.throttle_set` |
/// | `PROSPECTOR_STUCK_TIMEOUT_SECS` | `drive.stuck_timeout_secs` |
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_parse::<usize>("PROSPECTOR_WORLD_SIZE") {
        cfg.perception.world_size = v;
    }
    if let Some(v) = env_parse::<f32>("PROSPECTOR_MAX_VEL") {
        cfg.drive.max_vel = v;
    }
    if let Some(v) = env_parse::<f32>("PROSPECTOR_THROTTLE_SET") {
        cfg.drive.throttle_set = v;
    }
    if let Some(v) = env_parse::<f64>("PROSPECTOR_STUCK_TIMEOUT_SECS") {
        cfg.drive.stuck_timeout_secs = v;
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

/// Write `cfg` to `path`, creating parent directories as needed.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ProspectorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ProspectorError::Io(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| ProspectorError::Io(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        ProspectorError::Io(format!("failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_perception::RockBand;
    use prospector_runtime::FallbackMode;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join("absent.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
            [perception]
            scale = 8.0

            [perception.rock_band]
            space = "rgb"
            red = [110, 255]
            green = [110, 255]
            blue = [0, 50]

            [drive]
            approach_fallback = "stop"
            "#,
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.perception.scale, 8.0);
        assert_eq!(cfg.perception.world_size, 200);
        assert!(matches!(cfg.perception.rock_band, RockBand::Rgb { .. }));
        assert_eq!(cfg.drive.approach_fallback, FallbackMode::Stop);
        assert_eq!(cfg.drive.go_forward, 500);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[drive]\nmax_vel = \"fast\"\n").expect("write");
        assert!(matches!(
            load_from(&path),
            Err(ProspectorError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut cfg = Config::default();
        cfg.drive.throttle_set = 3.0;
        assert!(cfg.validate().is_err());
        cfg.drive.throttle_set = 0.2;
        cfg.perception.world_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_path_defaults_to_working_directory() {
        assert_eq!(config_path(None), PathBuf::from("prospector.toml"));
        let explicit = Path::new("/tmp/rover.toml");
        assert_eq!(config_path(Some(explicit)), explicit.to_path_buf());
    }

    #[test]
    fn apply_env_overrides_changes_world_size() {
        // SAFETY: each override test owns a distinct variable.
        unsafe { std::env::set_var("PROSPECTOR_WORLD_SIZE", "120") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.perception.world_size, 120);
        unsafe { std::env::remove_var("PROSPECTOR_WORLD_SIZE") };
    }

    #[test]
    fn apply_env_overrides_changes_max_vel() {
        // SAFETY: each override test owns a distinct variable.
        unsafe { std::env::set_var("PROSPECTOR_MAX_VEL", "1.25") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.drive.max_vel, 1.25);
        unsafe { std::env::remove_var("PROSPECTOR_MAX_VEL") };
    }

    #[test]
    fn apply_env_overrides_changes_stuck_timeout() {
        // SAFETY: each override test owns a distinct variable.
        unsafe { std::env::set_var("PROSPECTOR_STUCK_TIMEOUT_SECS", "20") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.drive.stuck_timeout_secs, 20.0);
        unsafe { std::env::remove_var("PROSPECTOR_STUCK_TIMEOUT_SECS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_throttle() {
        // SAFETY: each override test owns a distinct variable.
        unsafe { std::env::set_var("PROSPECTOR_THROTTLE_SET", "full") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.drive.throttle_set, 0.2);
        unsafe { std::env::remove_var("PROSPECTOR_THROTTLE_SET") };
    }
}
