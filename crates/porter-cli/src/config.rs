//! Mission settings – reads/writes `~/.porter/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use porter_hal::SimRig;
use porter_runtime::MissionConfig;
use porter_types::ColorClass;
use serde::{Deserialize, Serialize};

/// Simulated rig used when no physical brick is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Colors the sensor reports, cycled forever.
    pub color_script: Vec<ColorClass>,
    pub initial_heading_deg: f32,
    /// Gripper stall delay.  Leave unset for a gripper that never stalls.
    pub stall_after_ms: Option<u64>,
    /// Fraction of real time timed motions take.  `0` runs instantly.
    pub time_scale: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            color_script: vec![
                ColorClass::White,
                ColorClass::Black,
                ColorClass::Red,
                ColorClass::Blue,
                ColorClass::Green,
            ],
            initial_heading_deg: 90.0,
            stall_after_ms: Some(800),
            time_scale: 0.25,
        }
    }
}

impl SimConfig {
    pub fn rig_builder(&self) -> SimRig {
        SimRig::builder()
            .with_colors(self.color_script.iter().copied())
            .with_heading(self.initial_heading_deg)
            .stall_after(self.stall_after_ms.map(Duration::from_millis))
            .time_scale(self.time_scale)
    }
}

/// Persisted settings stored in `~/.porter/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Deliveries to complete before the run ends.
    #[serde(default = "default_quota")]
    pub quota: u32,

    #[serde(default)]
    pub mission: MissionConfig,

    #[serde(default)]
    pub sim: SimConfig,
}

fn default_quota() -> u32 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            mission: MissionConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl Config {
    /// Reject values the environment overrides would also refuse.
    pub fn validate(&self) -> Result<(), String> {
        if self.mission.poll_interval_ms == 0 {
            return Err("mission.poll_interval_ms must be greater than 0".to_string());
        }
        if !valid_time_scale(self.sim.time_scale) {
            return Err(format!(
                "sim.time_scale must be a finite number >= 0, got {}",
                self.sim.time_scale
            ));
        }
        Ok(())
    }
}

fn valid_time_scale(scale: f64) -> bool {
    scale.is_finite() && scale >= 0.0
}

/// Return the path to `~/.porter/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".porter").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.validate()
        .map_err(|e| format!("Invalid config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `PORTER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PORTER_QUOTA` | `quota` |
/// | `PORTER_POLL_MS` | `mission.poll_interval_ms` |
/// | `PORTER_TIME_SCALE` | `sim.time_scale` |
///
/// Values that do not parse, or that [`Config::validate`] would reject, are
/// ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PORTER_QUOTA")
        && let Ok(quota) = v.trim().parse::<u32>()
    {
        cfg.quota = quota;
    }
    if let Some(v) = lookup("PORTER_POLL_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
        && ms > 0
    {
        cfg.mission.poll_interval_ms = ms;
    }
    if let Some(v) = lookup("PORTER_TIME_SCALE")
        && let Ok(scale) = v.trim().parse::<f64>()
        && valid_time_scale(scale)
    {
        cfg.sim.time_scale = scale;
    }
}

/// First positional argument, when it is a delivery count.
pub fn quota_from_args(mut args: impl Iterator<Item = String>) -> Option<u32> {
    args.next().and_then(|a| a.trim().parse().ok())
}

/// Save the config to disk, creating `~/.porter/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
