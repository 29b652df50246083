use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use skyrun_core::config::config_path;
use skyrun_core::error::ConfigError;

/// Terminal shell settings, read from the `[shell]` section of the shared
/// config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub tick_rate_hz: f32,
    /// Scale `dt` by wall-clock time instead of stepping in whole ticks.
    pub time_scaled: bool,
    /// Upper bound on a scaled `dt`, in nominal ticks.
    pub max_dt: f32,
    pub assets_dir: PathBuf,
    pub log_file: PathBuf,
    /// World units covered by one terminal column.
    pub cell_width_px: f32,
    /// World units covered by one terminal row.
    pub cell_height_px: f32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            time_scaled: false,
            max_dt: 3.0,
            assets_dir: PathBuf::from("assets"),
            log_file: PathBuf::from("skyrun.log"),
            cell_width_px: 10.0,
            cell_height_px: 20.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShellFile {
    shell: ShellConfig,
}

impl ShellConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str::<ShellFile>(text)
            .map(|f| f.shell)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load the `[shell]` section, falling back to defaults if the file is
    /// missing or unparseable. `SKYRUN_TICK_RATE` overrides the tick rate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {}: {e}, using shell defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Ok(val) = std::env::var("SKYRUN_TICK_RATE")
            && let Ok(rate) = val.parse::<f32>()
        {
            config.tick_rate_hz = rate;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("shell.tick_rate_hz", self.tick_rate_hz),
            ("shell.max_dt", self.max_dt),
            ("shell.cell_width_px", self.cell_width_px),
            ("shell.cell_height_px", self.cell_height_px),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be > 0, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Wall-clock length of one nominal tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_rate_hz)
    }

    /// `dt` for a tick that took `elapsed` of wall-clock time.
    pub fn dt_for(&self, elapsed: Duration) -> f32 {
        if !self.time_scaled {
            return 1.0;
        }
        let nominal = self.tick_duration().as_secs_f32();
        (elapsed.as_secs_f32() / nominal).clamp(0.0, self.max_dt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use skyrun_core::config::CONFIG_PATH_ENV;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Run `load()` against a temp config file (or a missing one) with the
    /// given env overrides set for the duration of the call.
    fn load_with(
        name: &str,
        contents: Option<&str>,
        vars: &[(&str, &str)],
    ) -> Result<ShellConfig, ConfigError> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let path = std::env::temp_dir().join(format!(
            "skyrun-term-{name}-{}.toml",
            std::process::id()
        ));
        if let Some(text) = contents {
            std::fs::write(&path, text).unwrap();
        }
        unsafe {
            std::env::remove_var("SKYRUN_TICK_RATE");
            std::env::set_var(CONFIG_PATH_ENV, &path);
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }

        let result = ShellConfig::load();

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
            for (key, _) in vars {
                std::env::remove_var(key);
            }
        }
        let _ = std::fs::remove_file(&path);
        result
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = load_with("missing", None, &[]).unwrap();
        assert_eq!(cfg, ShellConfig::default());
    }

    #[test]
    fn load_unparseable_file_falls_back_to_defaults() {
        let cfg = load_with("garbled", Some("[shell\ntick_rate_hz ="), &[]).unwrap();
        assert_eq!(cfg, ShellConfig::default());
    }

    #[test]
    fn load_reads_shell_section_from_env_path() {
        let cfg = load_with("custom", Some("[shell]\ntime_scaled = true\n"), &[]).unwrap();
        assert!(cfg.time_scaled);
        assert_eq!(cfg.tick_rate_hz, 60.0);
    }

    #[test]
    fn load_applies_tick_rate_override() {
        let cfg = load_with(
            "override",
            Some("[shell]\ntick_rate_hz = 30.0\n"),
            &[("SKYRUN_TICK_RATE", "120")],
        )
        .unwrap();
        assert_eq!(cfg.tick_rate_hz, 120.0);
    }

    #[test]
    fn load_rejects_zero_tick_rate_override() {
        let err = load_with("zero-rate", None, &[("SKYRUN_TICK_RATE", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "shell.tick_rate_hz",
                ..
            }
        ));
    }

    #[test]
    fn defaults() {
        let cfg = ShellConfig::default();
        assert_eq!(cfg.tick_rate_hz, 60.0);
        assert!(!cfg.time_scaled);
        assert_eq!(cfg.assets_dir, PathBuf::from("assets"));
        cfg.validate().unwrap();
    }

    #[test]
    fn reads_shell_section_and_ignores_sim_sections() {
        let toml_str = r#"
[physics]
gravity = 0.5

[shell]
tick_rate_hz = 30.0
log_file = "/tmp/run.log"
"#;
        let cfg = ShellConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.tick_rate_hz, 30.0);
        assert_eq!(cfg.log_file, PathBuf::from("/tmp/run.log"));
        assert_eq!(cfg.cell_width_px, 10.0);
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let cfg = ShellConfig::from_toml_str(include_str!("../../../config/skyrun.toml")).unwrap();
        assert_eq!(cfg, ShellConfig::default());
    }

    #[test]
    fn missing_section_gives_defaults() {
        let cfg = ShellConfig::from_toml_str("[view]\nwidth = 800.0\n").unwrap();
        assert_eq!(cfg, ShellConfig::default());
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let cfg = ShellConfig {
            tick_rate_hz: 0.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "shell.tick_rate_hz",
                ..
            }
        ));
    }

    #[test]
    fn fixed_mode_always_steps_one_tick() {
        let cfg = ShellConfig::default();
        assert_eq!(cfg.dt_for(Duration::from_millis(100)), 1.0);
        assert_eq!(cfg.dt_for(Duration::ZERO), 1.0);
    }

    #[test]
    fn scaled_dt_tracks_elapsed_and_clamps() {
        let cfg = ShellConfig {
            time_scaled: true,
            tick_rate_hz: 50.0,
            ..Default::default()
        };
        assert!((cfg.dt_for(Duration::from_millis(20)) - 1.0).abs() < 1e-4);
        assert!((cfg.dt_for(Duration::from_millis(10)) - 0.5).abs() < 1e-4);
        assert_eq!(cfg.dt_for(Duration::from_secs(1)), cfg.max_dt);
    }
}
