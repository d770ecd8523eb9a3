//! Platform layout generator.
//!
//! One forward pass, no retries:
//!   1. Ground strip: a scale-2 tile every `ground_step` units across the
//!      whole world (`2 × viewport width`), resting on the bottom edge.
//!   2. Floating platforms: `floating_count` tiles, each a random
//!      `[spacing_min, spacing_min + spacing_jitter)` to the right of the
//!      previous one, on one of `tier_count` heights above the ground line.
//!
//! Tier height is chosen to stay under the player's jump apex, so any two
//! adjacent tiers are reachable from one another. The clamp keeps the top
//! tier on screen for short viewports.

use rand::Rng;

/// Uniform random numbers in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Adapter from any `rand` generator.
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Display surface size in world units, sampled once at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Viewport { width, height }
    }

    /// The scrollable world is two screens wide.
    pub fn world_width(&self) -> f64 {
        self.width * 2.0
    }
}

/// Unscaled platform tile size.
pub const TILE_W: f64 = 64.0;
pub const TILE_H: f64 = 32.0;

/// Upper bound on the ground strip, whatever the configured viewport.
pub const MAX_GROUND_TILES: usize = 4096;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlatformKind {
    Ground,
    Floating,
}

/// One platform tile, center-origin, world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlatformPlacement {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub kind: PlatformKind,
}

impl PlatformPlacement {
    pub fn half_extents(&self) -> (f64, f64) {
        (TILE_W * self.scale / 2.0, TILE_H * self.scale / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutParams {
    pub ground_step: f64,
    pub ground_scale: f64,
    /// Ground line sits this far above the bottom edge.
    pub ground_offset: f64,
    pub floating_count: usize,
    pub floating_scale: f64,
    pub spacing_min: f64,
    pub spacing_jitter: f64,
    pub tier_height: f64,
    pub tier_count: u32,
    /// Topmost allowed floating-platform y.
    pub min_y: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        LayoutParams {
            ground_step: 128.0,
            ground_scale: 2.0,
            ground_offset: 32.0,
            floating_count: 10,
            floating_scale: 1.5,
            spacing_min: 200.0,
            spacing_jitter: 200.0,
            tier_height: 120.0,
            tier_count: 3,
            min_y: 200.0,
        }
    }
}

impl LayoutParams {
    /// Number of ground tiles for this viewport: `ceil(2W / ground_step)`.
    pub fn ground_count(&self, viewport: Viewport) -> usize {
        let world_w = viewport.world_width();
        if world_w <= 0.0 || self.ground_step <= 0.0 {
            return 0;
        }
        ((world_w / self.ground_step).ceil() as usize).min(MAX_GROUND_TILES)
    }

    pub fn total_count(&self, viewport: Viewport) -> usize {
        self.ground_count(viewport) + self.floating_count
    }

    fn ground_y(&self, viewport: Viewport) -> f64 {
        viewport.height - self.ground_offset
    }
}

/// Generate a complete layout: ground strip first, then floating platforms
/// left to right.
pub fn generate(
    viewport: Viewport,
    params: &LayoutParams,
    rng: &mut dyn RandomSource,
) -> Vec<PlatformPlacement> {
    let mut out = Vec::with_capacity(params.total_count(viewport));
    let ground_y = params.ground_y(viewport);

    for i in 0..params.ground_count(viewport) {
        out.push(PlatformPlacement {
            x: i as f64 * params.ground_step,
            y: ground_y,
            scale: params.ground_scale,
            kind: PlatformKind::Ground,
        });
    }

    let mut x = 0.0;
    for _ in 0..params.floating_count {
        x += params.spacing_min + rng.next_unit() * params.spacing_jitter;
        let y = floating_y(ground_y, params, rng.next_unit());
        out.push(PlatformPlacement {
            x,
            y,
            scale: params.floating_scale,
            kind: PlatformKind::Floating,
        });
    }

    out
}

/// Pick a tier from a unit sample and clamp it into `[min_y, ground_y]`.
/// `min_y` wins when the viewport is too short to satisfy both bounds.
fn floating_y(ground_y: f64, params: &LayoutParams, sample: f64) -> f64 {
    let tiers = params.tier_count.max(1);
    let tier = ((sample * tiers as f64).floor() as u32).min(tiers - 1) + 1;
    let y = ground_y - params.tier_height * tier as f64;
    y.min(ground_y).max(params.min_y)
}

/// Scripted random source for tests: replays `values` in a loop.
#[cfg(test)]
pub struct SequenceRandom {
    values: Vec<f64>,
    pos: usize,
}

#[cfg(test)]
impl SequenceRandom {
    pub fn new(values: &[f64]) -> Self {
        SequenceRandom { values: values.to_vec(), pos: 0 }
    }
}

#[cfg(test)]
impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layout_for(w: f64, h: f64, rng: &mut dyn RandomSource) -> Vec<PlatformPlacement> {
        generate(Viewport::new(w, h), &LayoutParams::default(), rng)
    }

    #[test]
    fn count_matches_formula_for_many_widths() {
        let params = LayoutParams::default();
        let mut rng = RngSource(StdRng::seed_from_u64(7));
        for w in [1.0, 63.0, 64.0, 100.0, 640.0, 800.0, 1024.0, 1366.0, 1920.0] {
            let out = layout_for(w, 600.0, &mut rng);
            let ground = (2.0 * w / 128.0_f64).ceil() as usize;
            assert_eq!(params.ground_count(Viewport::new(w, 600.0)), ground, "w={w}");
            assert_eq!(out.len(), ground + 10, "w={w}");
        }
    }

    #[test]
    fn huge_viewport_ground_is_capped() {
        let params = LayoutParams::default();
        let vp = Viewport::new(1e300, 600.0);
        assert_eq!(params.ground_count(vp), MAX_GROUND_TILES);
        let out = generate(vp, &params, &mut SequenceRandom::new(&[0.5]));
        assert_eq!(out.len(), MAX_GROUND_TILES + params.floating_count);
    }

    #[test]
    fn zero_width_has_only_floating() {
        let out = layout_for(0.0, 600.0, &mut SequenceRandom::new(&[0.5]));
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|p| p.kind == PlatformKind::Floating));
    }

    #[test]
    fn ground_strip_shape() {
        let out = layout_for(800.0, 600.0, &mut SequenceRandom::new(&[0.3]));
        let ground: Vec<_> = out.iter().take(13).collect();
        assert_eq!(ground.len(), 13);
        for (i, p) in ground.iter().enumerate() {
            assert_eq!(p.kind, PlatformKind::Ground);
            assert_eq!(p.x, i as f64 * 128.0);
            assert_eq!(p.y, 568.0);
            assert_eq!(p.scale, 2.0);
        }
        // Last tile starts before the world edge.
        assert!(ground[12].x < 1600.0);
        for p in out.iter().skip(13) {
            assert_eq!(p.kind, PlatformKind::Floating);
            assert_eq!(p.scale, 1.5);
        }
    }

    #[test]
    fn floating_spacing_strictly_increases_within_bounds() {
        let mut rng = RngSource(StdRng::seed_from_u64(42));
        for _ in 0..50 {
            let out = layout_for(1280.0, 720.0, &mut rng);
            let floating: Vec<_> = out.iter().filter(|p| p.kind == PlatformKind::Floating).collect();
            assert_eq!(floating.len(), 10);
            assert!(floating[0].x >= 200.0 && floating[0].x < 400.0);
            for pair in floating.windows(2) {
                let dx = pair[1].x - pair[0].x;
                assert!(dx >= 200.0 && dx < 400.0, "dx={dx}");
            }
        }
    }

    #[test]
    fn floating_y_stays_in_clamp_band() {
        let mut rng = RngSource(StdRng::seed_from_u64(3));
        for h in [232.0, 300.0, 400.0, 600.0, 900.0, 1440.0] {
            for _ in 0..20 {
                let out = layout_for(800.0, h, &mut rng);
                for p in out.iter().filter(|p| p.kind == PlatformKind::Floating) {
                    assert!(p.y >= 200.0 && p.y <= h - 32.0, "h={h} y={}", p.y);
                }
            }
        }
    }

    #[test]
    fn tiers_are_quantized() {
        // Each step draws spacing then height: feed heights 0.0, 0.4, 0.9.
        let mut rng = SequenceRandom::new(&[0.5, 0.0, 0.5, 0.4, 0.5, 0.9]);
        let out = layout_for(800.0, 900.0, &mut rng);
        let ys: Vec<f64> = out.iter().skip(13).take(3).map(|p| p.y).collect();
        assert_eq!(ys, vec![868.0 - 120.0, 868.0 - 240.0, 868.0 - 360.0]);
    }

    #[test]
    fn high_tier_clamped_on_short_viewport() {
        // H=450: ground line 418, top tier 58 → clamped to 200.
        let mut rng = SequenceRandom::new(&[0.0, 0.99]);
        let out = layout_for(800.0, 450.0, &mut rng);
        assert!(out.iter().skip(13).all(|p| p.y == 200.0));
    }

    #[test]
    fn spacing_uses_first_draw_of_each_step() {
        let mut rng = SequenceRandom::new(&[0.0, 0.0, 0.5, 0.0]);
        let out = layout_for(800.0, 600.0, &mut rng);
        let xs: Vec<f64> = out.iter().skip(13).take(4).map(|p| p.x).collect();
        assert_eq!(xs, vec![200.0, 500.0, 700.0, 1000.0]);
    }

    #[test]
    fn half_extents_scale_with_tile() {
        let p = PlatformPlacement { x: 0.0, y: 0.0, scale: 2.0, kind: PlatformKind::Ground };
        assert_eq!(p.half_extents(), (64.0, 32.0));
        let f = PlatformPlacement { scale: 1.5, kind: PlatformKind::Floating, ..p };
        assert_eq!(f.half_extents(), (48.0, 24.0));
    }
}
