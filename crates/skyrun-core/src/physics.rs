use serde::{Deserialize, Serialize};

use crate::config::{PhysicsConfig, SimConfig};
use crate::geometry::Rect;
use crate::world::World;

/// Spawn height above the bottom of the view.
const SPAWN_HEIGHT: f32 = 90.0;

/// The player. `x` is a fixed screen position; the world scrolls instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    /// Vertical velocity, positive is downward.
    pub vy: f32,
    pub jumping: bool,
    pub facing_right: bool,
}

impl PlayerState {
    pub fn spawn(config: &SimConfig) -> Self {
        Self {
            x: config.player_x(),
            y: config.view.height - SPAWN_HEIGHT,
            vy: 0.0,
            jumping: false,
            facing_right: true,
        }
    }

    /// Player bounds in screen coordinates.
    pub fn rect(&self, physics: &PhysicsConfig) -> Rect {
        Rect::new(self.x, self.y, physics.player_width, physics.player_height)
    }
}

/// What happened to the player during one physics tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicsOutcome {
    pub jumped: bool,
    /// Top edge of the surface landed on, if any.
    pub landed_on: Option<f32>,
}

/// Advance the player by one tick: jump, gravity, integration, landing.
///
/// `dt` is in nominal ticks (1.0 for fixed-tick mode).
pub fn tick_player(
    player: &mut PlayerState,
    jump_requested: bool,
    world: &World,
    config: &SimConfig,
    dt: f32,
) -> PhysicsOutcome {
    let physics = &config.physics;
    let mut outcome = PhysicsOutcome::default();

    if jump_requested && !player.jumping {
        player.vy = physics.jump_impulse;
        player.jumping = true;
        outcome.jumped = true;
    }

    // No terminal velocity clamp.
    player.vy += physics.gravity * dt;
    player.y += player.vy * dt;

    outcome.landed_on = resolve_landing(player, physics, world.shifted_rects());
    outcome
}

/// Snap the player onto a platform it is falling into.
///
/// Only a downward-moving player (`vy > 0`) lands, so platforms can be
/// jumped through from below. When several platforms overlap the player
/// in the same tick the highest top surface wins; on an exact tie the
/// first one in iteration order is kept.
pub(crate) fn resolve_landing(
    player: &mut PlayerState,
    physics: &PhysicsConfig,
    platforms: impl IntoIterator<Item = Rect>,
) -> Option<f32> {
    if player.vy <= 0.0 {
        return None;
    }

    let body = player.rect(physics);
    let top = platforms
        .into_iter()
        .filter(|p| body.intersects(p))
        .map(|p| p.top())
        .fold(None, |best: Option<f32>, top| match best {
            Some(b) if b <= top => Some(b),
            _ => Some(top),
        })?;

    player.y = top - physics.player_height;
    player.vy = 0.0;
    player.jumping = false;
    Some(top)
}
