use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::geometry::Rect;

/// Floating platforms present in a fresh world, as
/// `(x, height above view bottom, width)`.
const SEED_PLATFORMS: [(f32, f32, f32); 3] = [
    (200.0, 150.0, 100.0),
    (400.0, 200.0, 150.0),
    (600.0, 250.0, 120.0),
];

/// Tolerance for float comparisons on generated x positions.
pub(crate) const POSITION_EPSILON: f32 = 1e-3;

/// Once `|shift|` reaches this many blocks it is folded into
/// `origin_blocks`. Keeps stored coordinates well inside f32's exact range.
const REBASE_BLOCKS: f64 = 1024.0;

/// Scrolling world geometry.
///
/// Both sequences are kept sorted by x ascending. Rects are stored in world
/// coordinates; `shift` is added only when geometry is tested or drawn.
///
/// The total scroll is unbounded, so it is split in two: `shift` stays
/// small and `origin_blocks` counts whole blocks folded out of it by
/// [`World::rebase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub ground: VecDeque<Rect>,
    pub platforms: VecDeque<Rect>,
    /// Horizontal scroll relative to the current origin. Grows when the
    /// player moves left.
    pub shift: f32,
    #[serde(default)]
    pub origin_blocks: i64,
}

/// How many entries a prune pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub ground: usize,
    pub platforms: usize,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.ground == 0 && self.platforms == 0
    }
}

impl World {
    /// Ground spanning the initial viewport plus the three fixed platforms.
    /// The generator tops this up before the first tick.
    pub fn seeded(config: &SimConfig) -> Self {
        let block = config.world.block_size;
        let ground_y = config.ground_y();
        let count = (config.view.width / block).floor() as usize;
        let ground = (0..count)
            .map(|i| Rect::new(i as f32 * block, ground_y, block, block))
            .collect();

        let thickness = config.world.platform_height;
        let platforms = SEED_PLATFORMS
            .iter()
            .map(|&(x, above_bottom, width)| {
                Rect::new(x, config.view.height - above_bottom, width, thickness)
            })
            .collect();

        Self {
            ground,
            platforms,
            shift: 0.0,
            origin_blocks: 0,
        }
    }

    /// Cumulative scroll since the world was seeded.
    pub fn total_shift(&self, block_size: f32) -> f64 {
        f64::from(self.shift) + self.origin_blocks as f64 * f64::from(block_size)
    }

    /// Fold whole blocks of `shift` into `origin_blocks` once it grows past
    /// the rebase threshold. Every rect moves by the same amount, so shifted
    /// positions and the ground grid are unchanged. Returns the blocks moved.
    pub fn rebase(&mut self, block_size: f32) -> i64 {
        let block = f64::from(block_size);
        let shift = f64::from(self.shift);
        if shift.abs() < REBASE_BLOCKS * block {
            return 0;
        }
        let blocks = (shift / block).trunc();
        let offset = blocks * block;
        self.shift = (shift - offset) as f32;
        for r in self.ground.iter_mut().chain(self.platforms.iter_mut()) {
            r.x = (f64::from(r.x) + offset) as f32;
        }
        self.origin_blocks += blocks as i64;
        tracing::debug!(blocks, origin_blocks = self.origin_blocks, "world rebased");
        blocks as i64
    }

    /// Every platform (ground first, then floating) in screen coordinates.
    pub fn shifted_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        let shift = self.shift;
        self.ground
            .iter()
            .chain(self.platforms.iter())
            .map(move |r| r.translated(shift, 0.0))
    }

    /// Drop geometry that has scrolled fully off the left edge (with a
    /// one-block margin) or lies beyond the far-right margin. Order is kept.
    pub fn prune(&mut self, config: &SimConfig) -> PruneReport {
        let shift = self.shift;
        let left_limit = -config.world.block_size;
        let right_limit = config.view.width + config.world.prune_ahead_margin;
        let keep = |r: &Rect| r.right() + shift >= left_limit && r.left() + shift <= right_limit;

        let ground_before = self.ground.len();
        let platforms_before = self.platforms.len();
        self.ground.retain(keep);
        self.platforms.retain(keep);

        PruneReport {
            ground: ground_before - self.ground.len(),
            platforms: platforms_before - self.platforms.len(),
        }
    }

    /// Sorted and gapless: each neighbour sits exactly one block further right.
    pub fn ground_is_contiguous(&self, block_size: f32) -> bool {
        self.ground
            .iter()
            .zip(self.ground.iter().skip(1))
            .all(|(a, b)| ((b.x - a.x) - block_size).abs() <= POSITION_EPSILON)
    }

    pub fn platforms_are_sorted(&self) -> bool {
        self.platforms
            .iter()
            .zip(self.platforms.iter().skip(1))
            .all(|(a, b)| a.x <= b.x)
    }
}
