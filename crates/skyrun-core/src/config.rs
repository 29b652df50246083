use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Env var naming an alternate config file.
pub const CONFIG_PATH_ENV: &str = "SKYRUN_CONFIG";
/// Config file used when the env var is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/skyrun.toml";

/// Logical draw area in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
        }
    }
}

/// Per-tick physics constants. Units are world units per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration added to vertical velocity each tick.
    pub gravity: f32,
    /// Vertical velocity set on jump. Negative is upward.
    pub jump_impulse: f32,
    /// World shift applied per tick while a direction is held.
    pub move_speed: f32,
    pub player_width: f32,
    pub player_height: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.8,
            jump_impulse: -15.0,
            move_speed: 5.0,
            player_width: 40.0,
            player_height: 40.0,
        }
    }
}

/// Procedural world generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    /// Ground block edge length, also the distance unit.
    pub block_size: f32,
    pub min_ground_blocks: usize,
    pub min_platforms: usize,
    pub platform_spacing_min: f32,
    pub platform_spacing_max: f32,
    /// Platform top is placed this far above the ground surface.
    pub platform_rise_min: f32,
    pub platform_rise_max: f32,
    pub platform_width_min: f32,
    pub platform_width_max: f32,
    /// Platform thickness.
    pub platform_height: f32,
    /// Geometry further right than `view.width + prune_ahead_margin` is dropped.
    pub prune_ahead_margin: f32,
    /// Fixed RNG seed. `None` draws a fresh seed per session.
    pub seed: Option<u64>,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            block_size: 40.0,
            min_ground_blocks: 20,
            min_platforms: 10,
            platform_spacing_min: 200.0,
            platform_spacing_max: 400.0,
            platform_rise_min: 150.0,
            platform_rise_max: 300.0,
            platform_width_min: 60.0,
            platform_width_max: 150.0,
            platform_height: 20.0,
            prune_ahead_margin: 4800.0,
            seed: None,
        }
    }
}

/// Simulation configuration, loadable from TOML.
///
/// The same file may carry sections for other consumers (the terminal shell
/// reads `[shell]`); unknown sections are ignored here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub view: ViewConfig,
    pub physics: PhysicsConfig,
    pub world: WorldGenConfig,
}

impl SimConfig {
    /// Y coordinate of the ground surface (top edge of every ground block).
    pub fn ground_y(&self) -> f32 {
        self.view.height - self.world.block_size
    }

    /// Fixed screen x of the player's left edge.
    pub fn player_x(&self) -> f32 {
        (self.view.width / 2.0).floor()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from the config file, apply env overrides, then validate.
    ///
    /// A missing or unparseable file falls back to defaults; only values
    /// that fail validation are an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                },
            },
            Err(_) => {
                tracing::info!("No {} found, using defaults", path.display());
                Self::default()
            },
        };

        if let Ok(val) = std::env::var("SKYRUN_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            config.world.seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let view = &self.view;
        let physics = &self.physics;
        let world = &self.world;

        positive("view.width", view.width)?;
        positive("view.height", view.height)?;

        positive("physics.gravity", physics.gravity)?;
        if !physics.jump_impulse.is_finite() || physics.jump_impulse >= 0.0 {
            return Err(ConfigError::invalid(
                "physics.jump_impulse",
                "must be negative (upward)",
            ));
        }
        if !physics.move_speed.is_finite() || physics.move_speed < 0.0 {
            return Err(ConfigError::invalid("physics.move_speed", "must be >= 0"));
        }
        positive("physics.player_width", physics.player_width)?;
        positive("physics.player_height", physics.player_height)?;

        positive("world.block_size", world.block_size)?;
        if world.block_size >= view.height {
            return Err(ConfigError::invalid(
                "world.block_size",
                "must be smaller than view.height",
            ));
        }
        if physics.player_height >= self.ground_y() {
            return Err(ConfigError::invalid(
                "physics.player_height",
                "player must fit above the ground",
            ));
        }
        if world.min_ground_blocks == 0 {
            return Err(ConfigError::invalid("world.min_ground_blocks", "must be > 0"));
        }
        if world.min_platforms == 0 {
            return Err(ConfigError::invalid("world.min_platforms", "must be > 0"));
        }
        range(
            "world.platform_spacing",
            world.platform_spacing_min,
            world.platform_spacing_max,
        )?;
        range(
            "world.platform_rise",
            world.platform_rise_min,
            world.platform_rise_max,
        )?;
        if world.platform_rise_max > self.ground_y() {
            return Err(ConfigError::invalid(
                "world.platform_rise_max",
                "platforms would start above the top of the view",
            ));
        }
        range(
            "world.platform_width",
            world.platform_width_min,
            world.platform_width_max,
        )?;
        positive("world.platform_height", world.platform_height)?;

        let platform_reach = world.min_platforms as f32 * world.platform_spacing_max;
        let ground_reach = world.min_ground_blocks as f32 * world.block_size;
        if !world.prune_ahead_margin.is_finite()
            || world.prune_ahead_margin < platform_reach.max(ground_reach)
        {
            return Err(ConfigError::invalid(
                "world.prune_ahead_margin",
                format!(
                    "must be at least {} so pruning never removes geometry generation would recreate",
                    platform_reach.max(ground_reach)
                ),
            ));
        }

        Ok(())
    }
}

/// Config file location: `$SKYRUN_CONFIG` if set, else the default path.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be > 0, got {value}")))
    }
}

fn range(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    positive(field, min)?;
    if !max.is_finite() || max < min {
        return Err(ConfigError::invalid(
            field,
            format!("max ({max}) must be >= min ({min})"),
        ));
    }
    Ok(())
}
