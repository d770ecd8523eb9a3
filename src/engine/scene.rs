//! ArcadeScene: the live world the progression controller drives.
//!
//! ## Ownership
//!
//! The scene owns every body (player, platforms, coins) plus the overlay
//! state the renderer draws (HUD, modal, finished banner). It never decides
//! anything about progression: it applies `Command`s and reports overlaps.
//!
//! ## Camera
//!
//! The world is `2W × H`. The camera shows one viewport-wide window,
//! follows the player horizontally and is clamped to `[0, W]`, so it never
//! shows past either world edge. A shake adds a short jitter on top.
//!
//! ## Freeze
//!
//! While a modal is open `step` does nothing: no gravity, no input, no
//! overlap reports. The only way forward is dismissing the modal.

use log::debug;

use crate::config::PhysicsConfig;
use crate::domain::catalog::split_breaks;
use crate::domain::entity::{CoinBatch, CoinId, Facing, FrameInput};
use crate::domain::layout::{PlatformPlacement, Viewport};
use crate::sim::event::{Command, GameEvent};
use crate::sim::stage::Stage;

use super::animation::{self, Animator};
use super::physics::{Aabb, Body, WorldBounds};

pub const PLAYER_SIZE: f64 = 32.0;
pub const COIN_SIZE: f64 = 24.0;

/// Background hills scroll at this fraction of the camera speed.
pub const PARALLAX: f64 = 0.5;

/// Shake amplitude as a fraction of the viewport width.
const SHAKE_INTENSITY: f64 = 0.05;

/// Content of the open modal, already split into lines.
#[derive(Clone, Debug, PartialEq)]
pub struct ModalView {
    pub title: String,
    pub lines: Vec<String>,
}

/// Overlay state: what the HUD row, modal box and banner show.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hud {
    pub score: u32,
    pub level_name: String,
    pub modal: Option<ModalView>,
    pub finished: bool,
}

#[derive(Clone, Debug)]
pub struct Platform {
    pub placement: PlatformPlacement,
    pub aabb: Aabb,
}

#[derive(Clone, Debug)]
pub struct SceneCoin {
    pub id: CoinId,
    pub body: Body,
    pub active: bool,
}

/// What happened during one `step`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Overlaps of the player with active, bound coins, in coin order.
    pub events: Vec<GameEvent>,
    pub jumped: bool,
}

pub struct ArcadeScene {
    viewport: Viewport,
    physics: PhysicsConfig,
    player: Body,
    facing: Facing,
    animator: Animator,
    platforms: Vec<Platform>,
    /// Cached platform boxes for the physics step.
    solids: Vec<Aabb>,
    coins: Vec<SceneCoin>,
    coins_bound: bool,
    hud: Hud,
    camera_x: f64,
    shake_remaining_ms: f64,
}

impl ArcadeScene {
    pub fn new(viewport: Viewport, physics: PhysicsConfig) -> Self {
        let player = Body::new(0.0, 0.0, PLAYER_SIZE, PLAYER_SIZE, physics.player_bounce);
        ArcadeScene {
            viewport,
            physics,
            player,
            facing: Facing::Right,
            animator: Animator::new(animation::IDLE),
            platforms: vec![],
            solids: vec![],
            coins: vec![],
            coins_bound: false,
            hud: Hud::default(),
            camera_x: 0.0,
            shake_remaining_ms: 0.0,
        }
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds {
            min_x: 0.0,
            max_x: self.viewport.world_width(),
            min_y: 0.0,
            max_y: self.viewport.height,
        }
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, input: FrameInput, dt: f64) -> StepReport {
        let mut report = StepReport::default();
        if self.hud.modal.is_some() {
            return report;
        }
        let bounds = self.bounds();
        let gravity = self.physics.gravity;

        // ── Player ──
        match input.horizontal {
            Some(Facing::Left) => {
                self.player.vx = -self.physics.run_speed;
                self.facing = Facing::Left;
                self.animator.play(animation::WALK);
            }
            Some(Facing::Right) => {
                self.player.vx = self.physics.run_speed;
                self.facing = Facing::Right;
                self.animator.play(animation::WALK);
            }
            None => {
                self.player.vx = 0.0;
                self.animator.play(animation::IDLE);
            }
        }
        if input.jump && self.player.touching.down {
            self.player.vy = -self.physics.jump_speed;
            report.jumped = true;
        }
        self.player.step(&self.solids, bounds, gravity, dt);
        self.animator.tick((dt * 1_000_000.0) as u64);

        // ── Coins ──
        if self.coins_bound {
            let player_box = self.player.aabb;
            for coin in self.coins.iter_mut().filter(|c| c.active) {
                coin.body.step(&self.solids, bounds, gravity, dt);
                if coin.body.aabb.overlaps(&player_box) {
                    report.events.push(GameEvent::CoinCollected { coin: coin.id });
                }
            }
        }

        // ── Camera ──
        let target = self.player.aabb.center_x - self.viewport.width / 2.0;
        self.camera_x = target.clamp(0.0, self.viewport.width.max(0.0));
        self.shake_remaining_ms = (self.shake_remaining_ms - dt * 1000.0).max(0.0);

        report
    }

    pub fn player(&self) -> &Body {
        &self.player
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Current sprite-sheet frame for the player.
    pub fn player_frame(&self) -> u8 {
        self.animator.frame()
    }

    pub fn is_walking(&self) -> bool {
        self.animator.clip() == animation::WALK
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn coins(&self) -> &[SceneCoin] {
        &self.coins
    }

    pub fn coins_bound(&self) -> bool {
        self.coins_bound
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    /// World x of the left edge of the view, shake included.
    pub fn camera_x(&self) -> f64 {
        self.camera_x + self.shake_offset().0
    }

    /// Scroll offset for the background layer.
    pub fn parallax_x(&self) -> f64 {
        self.camera_x * PARALLAX
    }

    pub fn shaking(&self) -> bool {
        self.shake_remaining_ms > 0.0
    }

    /// Camera jitter `(dx, dy)`; zero once the shake has run out.
    pub fn shake_offset(&self) -> (f64, f64) {
        if !self.shaking() {
            return (0.0, 0.0);
        }
        let amp = self.viewport.width * SHAKE_INTENSITY;
        let t = self.shake_remaining_ms;
        ((t * 0.37).sin() * amp, (t * 0.53).cos() * amp * 0.5)
    }

    fn rebuild_solids(&mut self) {
        self.solids = self.platforms.iter().map(|p| p.aabb).collect();
    }

    /// Keep a freshly placed body inside the world.
    fn clamp_into(bounds: WorldBounds, body: &mut Body) {
        let a = &mut body.aabb;
        let max_x = (bounds.max_x - a.half_w).max(bounds.min_x + a.half_w);
        let max_y = (bounds.max_y - a.half_h).max(bounds.min_y + a.half_h);
        a.center_x = a.center_x.clamp(bounds.min_x + a.half_w, max_x);
        a.center_y = a.center_y.clamp(bounds.min_y + a.half_h, max_y);
    }

    fn replace_coins(&mut self, batch: &CoinBatch) {
        let bounds = self.bounds();
        let bounce = self.physics.coin_bounce;
        self.coins = batch
            .iter()
            .filter(|c| c.active)
            .map(|c| {
                let mut body = Body::new(c.x, c.y, COIN_SIZE, COIN_SIZE, bounce);
                Self::clamp_into(bounds, &mut body);
                SceneCoin { id: c.id, body, active: true }
            })
            .collect();
        self.coins_bound = false;
    }
}

impl Stage for ArcadeScene {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn player_position(&self) -> (f64, f64) {
        self.player.position()
    }

    fn apply(&mut self, command: &Command) {
        match command {
            Command::SetScore(score) => self.hud.score = *score,
            Command::SetLevelName(name) => self.hud.level_name = name.clone(),
            Command::ShowModal { title, content } => {
                self.hud.modal = Some(ModalView {
                    title: title.clone(),
                    lines: split_breaks(content).into_iter().map(str::to_string).collect(),
                });
            }
            Command::HideModal => self.hud.modal = None,
            Command::DeactivateCoin(id) => {
                if let Some(coin) = self.coins.iter_mut().find(|c| c.id == *id) {
                    coin.active = false;
                }
            }
            Command::ClearPlatforms => {
                self.platforms.clear();
                self.solids.clear();
            }
            Command::SpawnPlatforms(placements) => {
                self.platforms.extend(placements.iter().map(|p| {
                    let (half_w, half_h) = p.half_extents();
                    Platform { placement: *p, aabb: Aabb::new(p.x, p.y, half_w, half_h) }
                }));
                self.rebuild_solids();
            }
            Command::MovePlayer { x, y } => {
                let bounds = self.bounds();
                self.player.reset(*x, *y);
                Self::clamp_into(bounds, &mut self.player);
            }
            Command::ReplaceCoins(batch) => self.replace_coins(batch),
            Command::BindColliders => self.coins_bound = true,
            Command::ShakeCamera { duration_ms } => {
                self.shake_remaining_ms = f64::from(*duration_ms);
            }
            Command::AnnounceFinished => self.hud.finished = true,
        }
        debug!("scene applied {}", command_name(command));
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::SetScore(_) => "SetScore",
        Command::SetLevelName(_) => "SetLevelName",
        Command::ShowModal { .. } => "ShowModal",
        Command::HideModal => "HideModal",
        Command::DeactivateCoin(_) => "DeactivateCoin",
        Command::ClearPlatforms => "ClearPlatforms",
        Command::SpawnPlatforms(_) => "SpawnPlatforms",
        Command::MovePlayer { .. } => "MovePlayer",
        Command::ReplaceCoins(_) => "ReplaceCoins",
        Command::BindColliders => "BindColliders",
        Command::ShakeCamera { .. } => "ShakeCamera",
        Command::AnnounceFinished => "AnnounceFinished",
    }
}
