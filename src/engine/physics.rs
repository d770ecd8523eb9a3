//! Arcade rigid-body physics.
//!
//! ## Model
//!
//! Every body is an axis-aligned box with a velocity. Platforms are static
//! boxes. Coordinates are y-down: gravity adds to `vy`, "down" means +y.
//!
//! One `step` does:
//!   1. `vy += gravity × dt`
//!   2. Move along X, stopping at the first static box edge crossed,
//!      then clamp to the world bounds. A blocked axis zeroes `vx`.
//!   3. Move along Y using the corrected X, same rules. A blocked axis
//!      reflects `vy` scaled by the body's bounce; small rebounds settle.
//!
//! Resolving X before Y gives "slide along walls" and prevents diagonal
//! tunneling through box corners.
//!
//! A box only blocks a body whose leading edge was at or behind its face
//! before the move, so a body already overlapping a platform (e.g. after a
//! teleport) is never shoved sideways. It drops out the bottom instead.

/// Edge tolerance for "was behind the face" tests.
const EPS: f64 = 0.001;

/// Rebound speeds below this settle to rest instead of hopping forever.
pub const REST_SPEED: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub center_x: f64,
    pub center_y: f64,
    pub half_w: f64,
    pub half_h: f64,
}

impl Aabb {
    pub fn new(center_x: f64, center_y: f64, half_w: f64, half_h: f64) -> Self {
        Aabb { center_x, center_y, half_w, half_h }
    }

    pub fn left(&self) -> f64 { self.center_x - self.half_w }
    pub fn right(&self) -> f64 { self.center_x + self.half_w }
    pub fn top(&self) -> f64 { self.center_y - self.half_h }
    pub fn bottom(&self) -> f64 { self.center_y + self.half_h }

    /// Strict intersection: boxes that merely touch do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    fn spans_y(&self, other: &Aabb) -> bool {
        self.top() < other.bottom() - EPS && other.top() < self.bottom() - EPS
    }

    fn spans_x(&self, other: &Aabb) -> bool {
        self.left() < other.right() - EPS && other.left() < self.right() - EPS
    }
}

/// Which sides were blocked during the last step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Touching {
    pub down: bool,
    pub up: bool,
    pub left: bool,
    pub right: bool,
}

/// The rectangle every body is kept inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub aabb: Aabb,
    pub vx: f64,
    pub vy: f64,
    /// Fraction of vertical speed kept after a vertical hit.
    pub bounce: f64,
    pub touching: Touching,
}

impl Body {
    pub fn new(x: f64, y: f64, width: f64, height: f64, bounce: f64) -> Self {
        Body {
            aabb: Aabb::new(x, y, width / 2.0, height / 2.0),
            vx: 0.0,
            vy: 0.0,
            bounce,
            touching: Touching::default(),
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.aabb.center_x, self.aabb.center_y)
    }

    /// Teleport, dropping all motion and contact state.
    pub fn reset(&mut self, x: f64, y: f64) {
        self.aabb.center_x = x;
        self.aabb.center_y = y;
        self.vx = 0.0;
        self.vy = 0.0;
        self.touching = Touching::default();
    }

    pub fn step(&mut self, solids: &[Aabb], bounds: WorldBounds, gravity: f64, dt: f64) {
        self.touching = Touching::default();
        self.vy += gravity * dt;

        let (x, blocked_x) = self.resolve_x(solids, bounds, self.vx * dt);
        self.aabb.center_x = x;
        if blocked_x {
            self.vx = 0.0;
        }

        let dy = self.vy * dt;
        let (y, blocked_y) = self.resolve_y(solids, bounds, dy);
        self.aabb.center_y = y;
        if blocked_y {
            self.vy = if dy > 0.0 && self.vy * self.bounce < REST_SPEED {
                0.0
            } else {
                -self.vy * self.bounce
            };
        }
    }

    fn resolve_x(&mut self, solids: &[Aabb], bounds: WorldBounds, dx: f64) -> (f64, bool) {
        let a = self.aabb;
        let mut x = a.center_x + dx;
        let mut blocked = false;

        if dx > 0.0 {
            for s in solids.iter().filter(|s| a.spans_y(s)) {
                if a.right() <= s.left() + EPS && x + a.half_w > s.left() {
                    x = s.left() - a.half_w;
                    blocked = true;
                }
            }
        } else if dx < 0.0 {
            for s in solids.iter().filter(|s| a.spans_y(s)) {
                if a.left() >= s.right() - EPS && x - a.half_w < s.right() {
                    x = s.right() + a.half_w;
                    blocked = true;
                }
            }
        }

        if x - a.half_w < bounds.min_x {
            x = bounds.min_x + a.half_w;
            blocked = dx < 0.0 || blocked;
            self.touching.left |= dx < 0.0;
        } else if x + a.half_w > bounds.max_x {
            x = bounds.max_x - a.half_w;
            blocked = dx > 0.0 || blocked;
            self.touching.right |= dx > 0.0;
        }

        if blocked {
            self.touching.left |= dx < 0.0;
            self.touching.right |= dx > 0.0;
        }
        (x, blocked)
    }

    fn resolve_y(&mut self, solids: &[Aabb], bounds: WorldBounds, dy: f64) -> (f64, bool) {
        let a = self.aabb;
        let mut y = a.center_y + dy;
        let mut blocked = false;

        if dy > 0.0 {
            for s in solids.iter().filter(|s| a.spans_x(s)) {
                if a.bottom() <= s.top() + EPS && y + a.half_h > s.top() {
                    y = s.top() - a.half_h;
                    blocked = true;
                }
            }
        } else if dy < 0.0 {
            for s in solids.iter().filter(|s| a.spans_x(s)) {
                if a.top() >= s.bottom() - EPS && y - a.half_h < s.bottom() {
                    y = s.bottom() + a.half_h;
                    blocked = true;
                }
            }
        }

        if y - a.half_h < bounds.min_y {
            y = bounds.min_y + a.half_h;
            blocked = dy < 0.0 || blocked;
        } else if y + a.half_h > bounds.max_y {
            y = bounds.max_y - a.half_h;
            blocked = dy > 0.0 || blocked;
        }

        if blocked {
            self.touching.down |= dy > 0.0;
            self.touching.up |= dy < 0.0;
        }
        (y, blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn bounds() -> WorldBounds {
        WorldBounds { min_x: 0.0, max_x: 1000.0, min_y: 0.0, max_y: 600.0 }
    }

    fn settle(body: &mut Body, solids: &[Aabb], frames: usize) {
        for _ in 0..frames {
            body.step(solids, bounds(), 1000.0, DT);
        }
    }

    #[test]
    fn overlap_is_strict() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Aabb::new(15.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Aabb::new(20.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Aabb::new(0.0, 25.0, 10.0, 10.0)));
    }

    #[test]
    fn falls_and_lands_on_platform() {
        let floor = Aabb::new(100.0, 400.0, 64.0, 16.0);
        let mut body = Body::new(100.0, 100.0, 32.0, 32.0, 0.2);
        settle(&mut body, &[floor], 180);
        assert!((body.aabb.bottom() - floor.top()).abs() < 1e-6);
        assert!(body.touching.down);
        assert_eq!(body.vy, 0.0);
    }

    #[test]
    fn fast_fall_does_not_tunnel() {
        let thin = Aabb::new(100.0, 300.0, 64.0, 2.0);
        let mut body = Body::new(100.0, 100.0, 32.0, 32.0, 0.0);
        body.vy = 20000.0;
        body.step(&[thin], bounds(), 1000.0, DT);
        assert!((body.aabb.bottom() - thin.top()).abs() < 1e-6);
    }

    #[test]
    fn bounce_reflects_then_settles() {
        let mut body = Body::new(100.0, 100.0, 24.0, 24.0, 0.5);
        let mut rebounded = false;
        for _ in 0..600 {
            body.step(&[], bounds(), 1000.0, DT);
            rebounded |= body.vy < 0.0;
        }
        assert!(rebounded);
        assert_eq!(body.vy, 0.0);
        assert!((body.aabb.bottom() - 600.0).abs() < 1e-6);
    }

    #[test]
    fn wall_stops_horizontal_motion() {
        let wall = Aabb::new(200.0, 500.0, 10.0, 100.0);
        let mut body = Body::new(150.0, 500.0, 32.0, 32.0, 0.0);
        body.vx = 3000.0;
        body.step(&[wall], bounds(), 0.0, DT);
        assert!(body.touching.right);
        assert_eq!(body.vx, 0.0);
        assert!((body.aabb.right() - wall.left()).abs() < 1e-6);
    }

    #[test]
    fn world_bounds_clamp() {
        let mut body = Body::new(10.0, 100.0, 32.0, 32.0, 0.0);
        body.vx = -600.0;
        body.step(&[], bounds(), 0.0, DT);
        assert_eq!(body.aabb.left(), 0.0);
        assert!(body.touching.left);

        let mut body = Body::new(990.0, 100.0, 32.0, 32.0, 0.0);
        body.vx = 600.0;
        body.step(&[], bounds(), 0.0, DT);
        assert_eq!(body.aabb.right(), 1000.0);
    }

    #[test]
    fn walks_off_edge_and_falls() {
        let ledge = Aabb::new(100.0, 400.0, 48.0, 16.0);
        let mut body = Body::new(100.0, 368.0, 32.0, 32.0, 0.0);
        body.step(&[ledge], bounds(), 1000.0, DT);
        assert!(body.touching.down);
        body.vx = 300.0;
        settle(&mut body, &[ledge], 60);
        assert!(body.aabb.top() > ledge.bottom());
    }

    #[test]
    fn jump_hits_ceiling() {
        let ceiling = Aabb::new(100.0, 300.0, 64.0, 16.0);
        let mut body = Body::new(100.0, 340.0, 32.0, 32.0, 0.0);
        body.vy = -500.0;
        body.step(&[ceiling], bounds(), 1000.0, DT);
        assert!(body.touching.up);
        assert!((body.aabb.top() - ceiling.bottom()).abs() < 1e-6);
    }

    #[test]
    fn teleport_into_platform_is_not_shoved() {
        let block = Aabb::new(100.0, 100.0, 64.0, 16.0);
        let mut body = Body::new(100.0, 100.0, 32.0, 32.0, 0.0);
        body.step(&[block], bounds(), 1000.0, DT);
        assert_eq!(body.aabb.center_x, 100.0);
        assert!(body.aabb.center_y > 100.0);
    }
}
