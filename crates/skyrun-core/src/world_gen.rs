use crate::config::SimConfig;
use crate::geometry::Rect;
use crate::rng::RandomSource;
use crate::world::World;

/// How many entries a generation pass added at each end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub ground_front: usize,
    pub ground_back: usize,
    pub platforms_front: usize,
    pub platforms_back: usize,
}

impl GenerationReport {
    pub fn is_empty(&self) -> bool {
        self.ground_front == 0
            && self.ground_back == 0
            && self.platforms_front == 0
            && self.platforms_back == 0
    }
}

/// Top up both geometry sequences around the current shift.
///
/// Ground is extended ahead until the minimum count is met and the right
/// edge of the view is covered, and behind until nothing is missing at the
/// left edge. Floating platforms follow the same count/position rules with
/// randomized spacing, height, and width. Running this twice without a
/// shift or prune in between adds nothing the second time.
pub fn generate<R: RandomSource + ?Sized>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
) -> GenerationReport {
    let mut report = GenerationReport::default();
    extend_ground(world, config, &mut report);
    extend_platforms(world, config, rng, &mut report);

    debug_assert!(
        world.ground_is_contiguous(config.world.block_size),
        "ground blocks lost contiguity during generation"
    );
    debug_assert!(
        world.platforms_are_sorted(),
        "floating platforms are no longer sorted by x"
    );
    report
}

fn extend_ground(world: &mut World, config: &SimConfig, report: &mut GenerationReport) {
    let block = config.world.block_size;
    let ground_y = config.ground_y();
    let shift = world.shift;

    // Everything was pruned: restart at the view's left edge, on the block grid.
    if world.ground.is_empty() {
        let anchor = (-shift / block).floor() * block;
        world
            .ground
            .push_back(Rect::new(anchor, ground_y, block, block));
        report.ground_back += 1;
    }

    // Ahead
    loop {
        let Some(last) = world.ground.back() else {
            break;
        };
        let enough = world.ground.len() >= config.world.min_ground_blocks;
        let covered = last.right() + shift >= config.view.width;
        if enough && covered {
            break;
        }
        let x = last.x + block;
        world.ground.push_back(Rect::new(x, ground_y, block, block));
        report.ground_back += 1;
    }

    // Behind
    loop {
        let Some(first) = world.ground.front() else {
            break;
        };
        if first.x + shift <= 0.0 {
            break;
        }
        let x = first.x - block;
        world.ground.push_front(Rect::new(x, ground_y, block, block));
        report.ground_front += 1;
    }
}

fn extend_platforms<R: RandomSource + ?Sized>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    report: &mut GenerationReport,
) {
    let shift = world.shift;

    // Ahead. An empty sequence anchors to the right edge of the view.
    while world.platforms.len() < config.world.min_platforms {
        let anchor = world
            .platforms
            .back()
            .map_or(config.view.width - shift, |p| p.x);
        let platform = random_platform(anchor, 1.0, config, rng);
        world.platforms.push_back(platform);
        report.platforms_back += 1;
    }

    // Behind. With the first platform just right of the view's left edge,
    // a full spacing step lands the new one past the prune margin, so while
    // moving left it is pruned and redrawn every tick until the gap closes.
    // Only off-screen geometry churns, but each redraw consumes RNG draws.
    loop {
        let Some(first) = world.platforms.front() else {
            break;
        };
        if first.x + shift <= 0.0 {
            break;
        }
        let platform = random_platform(first.x, -1.0, config, rng);
        world.platforms.push_front(platform);
        report.platforms_front += 1;
    }
}

/// Draws spacing, height, then width, in that order. `direction` is +1.0 to
/// place the platform after `anchor_x`, -1.0 to place it before.
fn random_platform<R: RandomSource + ?Sized>(
    anchor_x: f32,
    direction: f32,
    config: &SimConfig,
    rng: &mut R,
) -> Rect {
    let world = &config.world;
    let spacing = rng.next_in_range(world.platform_spacing_min, world.platform_spacing_max);
    let rise = rng.next_in_range(world.platform_rise_min, world.platform_rise_max);
    let width = rng.next_in_range(world.platform_width_min, world.platform_width_max);
    Rect::new(
        anchor_x + direction * spacing,
        config.ground_y() - rise,
        width,
        world.platform_height,
    )
}
