//! Progression controller: coin collection, modal gating, level advance.
//!
//! Transitions are plain methods: `handle(event) -> Vec<Command>`. Nothing
//! here touches the engine directly; `dispatch` captures a `StageContext`,
//! runs the transition and then applies the commands to the stage in order.
//!
//! State machine:
//!   Playing ──last coin──▶ LevelComplete ──dismiss, levels remain──▶ Playing (next level)
//!                                        └─dismiss, last level─────▶ Finished
//!
//! The advance check runs only on modal dismissal, never on collection,
//! so each section must be read before the next layout appears.

use log::{debug, error, info};

use crate::domain::catalog::LevelCatalog;
use crate::domain::entity::{CoinBatch, CoinId};
use crate::domain::layout::{self, LayoutParams, PlatformPlacement, RandomSource};
use super::event::{Command, GameEvent};
use super::stage::{Stage, StageContext};
use super::state::{GameState, Modal, Phase};

/// Counts and offsets for spawning and advancing.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressionRules {
    pub coins_per_level: usize,
    pub coin_step: f64,
    /// First coin of the opening batch.
    pub initial_coin_x: f64,
    /// Distance ahead of the player for both the respawn and the new batch.
    pub anchor_offset_x: f64,
    /// Height for the respawned player and every coin batch.
    pub anchor_y: f64,
    /// Opening player position: `(spawn_x, H - spawn_offset_y)`.
    pub spawn_x: f64,
    pub spawn_offset_y: f64,
    pub shake_ms: u32,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        ProgressionRules {
            coins_per_level: 5,
            coin_step: 150.0,
            initial_coin_x: 200.0,
            anchor_offset_x: 200.0,
            anchor_y: 100.0,
            spawn_x: 100.0,
            spawn_offset_y: 100.0,
            shake_ms: 200,
        }
    }
}

pub struct ProgressionController {
    catalog: LevelCatalog,
    layout: LayoutParams,
    rules: ProgressionRules,
    state: GameState,
    platforms: Vec<PlatformPlacement>,
    coins: CoinBatch,
    next_coin_id: u32,
}

impl ProgressionController {
    pub fn new(catalog: LevelCatalog, layout: LayoutParams, rules: ProgressionRules) -> Self {
        ProgressionController {
            catalog,
            layout,
            rules,
            state: GameState::new(),
            platforms: Vec::new(),
            coins: CoinBatch::default(),
            next_coin_id: 0,
        }
    }

    // ── Accessors ──

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn platforms(&self) -> &[PlatformPlacement] {
        &self.platforms
    }

    pub fn coins(&self) -> &CoinBatch {
        &self.coins
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    // ══════════════════════════════════════════════════════════════
    // Stage-facing entry points
    // ══════════════════════════════════════════════════════════════

    /// Build level 0 on the stage.
    pub fn start<S: Stage + ?Sized>(&mut self, stage: &mut S, rng: &mut dyn RandomSource) -> Vec<Command> {
        let ctx = StageContext::capture(stage);
        let commands = self.opening_commands(&ctx, rng);
        apply_all(stage, &commands);
        commands
    }

    /// Run one event against the stage. Returns the applied commands.
    pub fn dispatch<S: Stage + ?Sized>(
        &mut self,
        event: GameEvent,
        stage: &mut S,
        rng: &mut dyn RandomSource,
    ) -> Vec<Command> {
        let ctx = StageContext::capture(stage);
        let commands = self.handle(event, &ctx, rng);
        apply_all(stage, &commands);
        commands
    }

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    pub fn opening_commands(&mut self, ctx: &StageContext, rng: &mut dyn RandomSource) -> Vec<Command> {
        self.state = GameState::new();
        self.platforms = layout::generate(ctx.viewport, &self.layout, rng);
        self.coins = self.spawn_batch(self.rules.initial_coin_x);

        let mut commands = Vec::with_capacity(8);
        commands.extend(self.level_name_command());
        commands.push(Command::SetScore(0));
        commands.push(Command::ClearPlatforms);
        commands.push(Command::SpawnPlatforms(self.platforms.clone()));
        commands.push(Command::MovePlayer {
            x: self.rules.spawn_x,
            y: ctx.viewport.height - self.rules.spawn_offset_y,
        });
        commands.push(Command::ReplaceCoins(self.coins.clone()));
        commands.push(Command::BindColliders);

        info!(
            "started at level 0 ({} levels, {} platforms)",
            self.catalog.len(),
            self.platforms.len()
        );
        commands
    }

    pub fn handle(&mut self, event: GameEvent, ctx: &StageContext, rng: &mut dyn RandomSource) -> Vec<Command> {
        match event {
            GameEvent::CoinCollected { coin } => self.collect_coin(coin),
            GameEvent::ModalDismissed => self.dismiss_modal(ctx, rng),
        }
    }

    fn collect_coin(&mut self, coin: CoinId) -> Vec<Command> {
        if !self.coins.deactivate(coin) {
            debug!("ignoring collection of inactive or unknown coin {:?}", coin);
            return vec![];
        }
        self.state.score += 1;

        let mut commands = vec![
            Command::DeactivateCoin(coin),
            Command::SetScore(self.state.score),
        ];

        let index = self.state.current_level_index;
        match self.catalog.get(index) {
            Ok(level) => {
                commands.push(Command::ShowModal {
                    title: level.name.clone(),
                    content: level.content.clone(),
                });
                self.state.modal = Some(Modal { level_index: index });
            }
            Err(e) => error!("no record for current level: {e}"),
        }

        if self.coins.active_count() == 0 && self.state.phase == Phase::Playing {
            self.state.phase = Phase::LevelComplete;
            info!("level {} complete, score {}", index, self.state.score);
        }
        commands
    }

    fn dismiss_modal(&mut self, ctx: &StageContext, rng: &mut dyn RandomSource) -> Vec<Command> {
        if self.state.modal.take().is_none() {
            return vec![];
        }
        let mut commands = vec![Command::HideModal];
        commands.extend(self.check_level_completion(ctx, rng));
        commands
    }

    /// Advance when every coin is gone and another level exists; otherwise
    /// mark the run finished once the last level is cleared. Does nothing
    /// while a modal is still open.
    pub fn check_level_completion(&mut self, ctx: &StageContext, rng: &mut dyn RandomSource) -> Vec<Command> {
        if self.state.modal_open() || self.coins.active_count() > 0 {
            return vec![];
        }
        if self.state.current_level_index < self.catalog.last_index() {
            return self.advance_level(ctx, rng);
        }
        if self.state.phase != Phase::Finished {
            self.state.phase = Phase::Finished;
            info!("all {} levels cleared, final score {}", self.catalog.len(), self.state.score);
            return vec![Command::AnnounceFinished];
        }
        vec![]
    }

    /// Moves the player `anchor_offset_x` ahead, then starts the coin row a
    /// further `anchor_offset_x` past the moved player. The second offset is
    /// intentional: the first coin never spawns on top of the player.
    fn advance_level(&mut self, ctx: &StageContext, rng: &mut dyn RandomSource) -> Vec<Command> {
        self.state.current_level_index += 1;
        self.state.phase = Phase::Playing;

        let mut commands = Vec::with_capacity(8);
        commands.extend(self.level_name_command());
        commands.push(Command::ShakeCamera { duration_ms: self.rules.shake_ms });

        self.platforms = layout::generate(ctx.viewport, &self.layout, rng);
        commands.push(Command::ClearPlatforms);
        commands.push(Command::SpawnPlatforms(self.platforms.clone()));

        // Coins follow the player; the platform layout does not.
        let player_x = ctx.player_x + self.rules.anchor_offset_x;
        commands.push(Command::MovePlayer { x: player_x, y: self.rules.anchor_y });

        self.coins = self.spawn_batch(player_x + self.rules.anchor_offset_x);
        commands.push(Command::ReplaceCoins(self.coins.clone()));
        commands.push(Command::BindColliders);

        info!(
            "advanced to level {} ({} platforms, coins from x={:.0})",
            self.state.current_level_index,
            self.platforms.len(),
            player_x + self.rules.anchor_offset_x
        );
        commands
    }

    // ── Helpers ──

    fn spawn_batch(&mut self, x: f64) -> CoinBatch {
        let batch = CoinBatch::row(
            self.next_coin_id,
            x,
            self.rules.anchor_y,
            self.rules.coins_per_level,
            self.rules.coin_step,
        );
        self.next_coin_id = batch.next_id().max(self.next_coin_id);
        batch
    }

    fn level_name_command(&self) -> Option<Command> {
        match self.catalog.get(self.state.current_level_index) {
            Ok(level) => Some(Command::SetLevelName(level.name.clone())),
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }
}

fn apply_all<S: Stage + ?Sized>(stage: &mut S, commands: &[Command]) {
    for command in commands {
        stage.apply(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::LevelRecord;
    use crate::domain::layout::{PlatformKind, SequenceRandom, Viewport};

    /// Records every command and tracks just enough to answer queries.
    struct FakeStage {
        viewport: Viewport,
        player: (f64, f64),
        platforms: Vec<PlatformPlacement>,
        coins: Vec<CoinId>,
        level_name: String,
        score: u32,
        modal: Option<String>,
        log: Vec<Command>,
    }

    impl FakeStage {
        fn new(w: f64, h: f64) -> Self {
            FakeStage {
                viewport: Viewport::new(w, h),
                player: (0.0, 0.0),
                platforms: vec![],
                coins: vec![],
                level_name: String::new(),
                score: 0,
                modal: None,
                log: vec![],
            }
        }
    }

    impl Stage for FakeStage {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        fn player_position(&self) -> (f64, f64) {
            self.player
        }

        fn apply(&mut self, command: &Command) {
            match command {
                Command::SetScore(s) => self.score = *s,
                Command::SetLevelName(n) => self.level_name = n.clone(),
                Command::ShowModal { content, .. } => self.modal = Some(content.clone()),
                Command::HideModal => self.modal = None,
                Command::ClearPlatforms => self.platforms.clear(),
                Command::SpawnPlatforms(p) => self.platforms.extend(p.iter().copied()),
                Command::MovePlayer { x, y } => self.player = (*x, *y),
                Command::ReplaceCoins(batch) => {
                    self.coins = batch.iter().map(|c| c.id).collect();
                }
                Command::DeactivateCoin(id) => self.coins.retain(|c| c != id),
                _ => {}
            }
            self.log.push(command.clone());
        }
    }

    fn catalog(n: usize) -> LevelCatalog {
        let levels = (0..n)
            .map(|i| LevelRecord::new(&format!("L{i}"), &format!("content {i}")))
            .collect();
        LevelCatalog::new(levels).unwrap()
    }

    fn setup(levels: usize) -> (ProgressionController, FakeStage, SequenceRandom) {
        let mut ctl = ProgressionController::new(
            catalog(levels),
            LayoutParams::default(),
            ProgressionRules::default(),
        );
        let mut stage = FakeStage::new(800.0, 600.0);
        let mut rng = SequenceRandom::new(&[0.1, 0.6, 0.35, 0.9, 0.72, 0.05, 0.48]);
        ctl.start(&mut stage, &mut rng);
        (ctl, stage, rng)
    }

    fn active_ids(ctl: &ProgressionController) -> Vec<CoinId> {
        ctl.coins().iter().filter(|c| c.active).map(|c| c.id).collect()
    }

    fn collect_all(ctl: &mut ProgressionController, stage: &mut FakeStage, rng: &mut SequenceRandom) {
        for id in active_ids(ctl) {
            ctl.dispatch(GameEvent::CoinCollected { coin: id }, stage, rng);
        }
    }

    #[test]
    fn start_builds_level_zero() {
        let (ctl, stage, _) = setup(5);
        assert_eq!(ctl.state().current_level_index, 0);
        assert_eq!(ctl.state().score, 0);
        assert_eq!(ctl.state().phase, Phase::Playing);
        assert_eq!(stage.level_name, "L0");
        // ceil(1600 / 128) = 13 ground + 10 floating
        assert_eq!(stage.platforms.len(), 23);
        assert_eq!(stage.player, (100.0, 500.0));
        let xs: Vec<f64> = ctl.coins().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![200.0, 350.0, 500.0, 650.0, 800.0]);
        assert_eq!(stage.log.last(), Some(&Command::BindColliders));
    }

    #[test]
    fn collecting_coin_scores_and_shows_modal() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let id = active_ids(&ctl)[0];
        let cmds = ctl.dispatch(GameEvent::CoinCollected { coin: id }, &mut stage, &mut rng);
        assert_eq!(cmds[0], Command::DeactivateCoin(id));
        assert_eq!(cmds[1], Command::SetScore(1));
        assert_eq!(
            cmds[2],
            Command::ShowModal { title: "L0".into(), content: "content 0".into() }
        );
        assert_eq!(stage.score, 1);
        assert!(ctl.state().modal_open());
        assert_eq!(ctl.coins().active_count(), 4);
    }

    #[test]
    fn collecting_same_coin_twice_has_no_effect() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let id = active_ids(&ctl)[0];
        ctl.dispatch(GameEvent::CoinCollected { coin: id }, &mut stage, &mut rng);
        let again = ctl.dispatch(GameEvent::CoinCollected { coin: id }, &mut stage, &mut rng);
        assert!(again.is_empty());
        assert_eq!(ctl.state().score, 1);
    }

    #[test]
    fn unknown_coin_ignored() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let cmds = ctl.dispatch(GameEvent::CoinCollected { coin: CoinId(999) }, &mut stage, &mut rng);
        assert!(cmds.is_empty());
        assert_eq!(ctl.state().score, 0);
    }

    #[test]
    fn no_advance_while_coins_remain() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let ids = active_ids(&ctl);
        for id in &ids[..4] {
            ctl.dispatch(GameEvent::CoinCollected { coin: *id }, &mut stage, &mut rng);
            ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
            assert_eq!(ctl.state().current_level_index, 0);
            assert_eq!(ctl.state().phase, Phase::Playing);
        }
        assert_eq!(ctl.coins().active_count(), 1);
    }

    #[test]
    fn last_coin_waits_for_dismissal() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        collect_all(&mut ctl, &mut stage, &mut rng);
        assert_eq!(ctl.coins().active_count(), 0);
        assert_eq!(ctl.state().phase, Phase::LevelComplete);
        assert_eq!(ctl.state().current_level_index, 0);
        assert_eq!(stage.level_name, "L0");

        // A repeated report while the modal is up changes nothing.
        let cmds = ctl.dispatch(GameEvent::CoinCollected { coin: CoinId(0) }, &mut stage, &mut rng);
        assert!(cmds.is_empty());

        // Neither does a direct check: the open modal holds the level.
        let ctx = StageContext::capture(&stage);
        assert!(ctl.check_level_completion(&ctx, &mut rng).is_empty());
        assert_eq!(ctl.state().current_level_index, 0);
        assert_eq!(ctl.state().phase, Phase::LevelComplete);
    }

    #[test]
    fn scenario_800x600_advance() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let old_platforms = stage.platforms.clone();
        assert_eq!(old_platforms.len(), 23);

        collect_all(&mut ctl, &mut stage, &mut rng);
        stage.log.clear();
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);

        assert_eq!(ctl.state().current_level_index, 1);
        assert_eq!(ctl.state().phase, Phase::Playing);
        assert_eq!(stage.level_name, "L1");
        assert_eq!(stage.platforms.len(), 23);
        assert_eq!(ctl.platforms(), stage.platforms.as_slice());
        assert_eq!(stage.platforms.iter().filter(|p| p.kind == PlatformKind::Ground).count(), 13);
        assert_eq!(ctl.coins().active_count(), 5);
        assert_eq!(stage.modal, None);

        // Effect order.
        assert_eq!(stage.log[0], Command::HideModal);
        assert_eq!(stage.log[1], Command::SetLevelName("L1".into()));
        assert_eq!(stage.log[2], Command::ShakeCamera { duration_ms: 200 });
        assert_eq!(stage.log[3], Command::ClearPlatforms);
        assert!(matches!(stage.log[4], Command::SpawnPlatforms(_)));
        assert!(matches!(stage.log[5], Command::MovePlayer { .. }));
        assert!(matches!(stage.log[6], Command::ReplaceCoins(_)));
        assert_eq!(stage.log[7], Command::BindColliders);
        assert_eq!(stage.log.len(), 8);
    }

    #[test]
    fn regenerated_layout_replaces_old_one() {
        let (mut ctl, mut stage, mut rng) = setup(3);
        let before: Vec<f64> = stage
            .platforms
            .iter()
            .filter(|p| p.kind == PlatformKind::Floating)
            .map(|p| p.x)
            .collect();
        collect_all(&mut ctl, &mut stage, &mut rng);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        let after: Vec<f64> = stage
            .platforms
            .iter()
            .filter(|p| p.kind == PlatformKind::Floating)
            .map(|p| p.x)
            .collect();
        assert_eq!(after.len(), 10);
        // 20 draws per layout over a 7-value cycle: the second layout starts elsewhere.
        assert_ne!(before, after);
    }

    #[test]
    fn coins_anchor_to_player_platforms_do_not() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        collect_all(&mut ctl, &mut stage, &mut rng);
        stage.player = (640.0, 520.0);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);

        // Player jumps ahead of where it stood, not back to spawn.
        assert_eq!(stage.player, (840.0, 100.0));
        let xs: Vec<f64> = ctl.coins().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1040.0, 1190.0, 1340.0, 1490.0, 1640.0]);
        assert!(ctl.coins().iter().all(|c| c.y == 100.0));
        assert_eq!(xs[0] - stage.player.0, 200.0);
        // Ground strip still starts at world origin regardless of the player.
        assert_eq!(stage.platforms[0].x, 0.0);
    }

    #[test]
    fn new_batch_ids_never_collide_with_old() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let old = active_ids(&ctl);
        collect_all(&mut ctl, &mut stage, &mut rng);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        let new = active_ids(&ctl);
        assert!(new.iter().all(|id| !old.contains(id)));

        // A stale report for an old coin is ignored.
        let cmds = ctl.dispatch(GameEvent::CoinCollected { coin: old[0] }, &mut stage, &mut rng);
        assert!(cmds.is_empty());
        assert_eq!(ctl.state().score, 5);
    }

    #[test]
    fn last_level_finishes_without_regeneration() {
        let (mut ctl, mut stage, mut rng) = setup(2);
        collect_all(&mut ctl, &mut stage, &mut rng);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        assert_eq!(ctl.state().current_level_index, 1);

        let platforms = stage.platforms.clone();
        collect_all(&mut ctl, &mut stage, &mut rng);
        stage.log.clear();
        let cmds = ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);

        assert_eq!(cmds, vec![Command::HideModal, Command::AnnounceFinished]);
        assert_eq!(ctl.state().current_level_index, 1);
        assert_eq!(ctl.state().phase, Phase::Finished);
        assert_eq!(stage.platforms, platforms);
        assert_eq!(ctl.state().score, 10);
    }

    #[test]
    fn finished_is_sticky() {
        let (mut ctl, mut stage, mut rng) = setup(1);
        collect_all(&mut ctl, &mut stage, &mut rng);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        assert_eq!(ctl.state().phase, Phase::Finished);

        // Nothing left to collect; extra dismissals and checks are no-ops.
        assert!(ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng).is_empty());
        let ctx = StageContext::capture(&stage);
        assert!(ctl.check_level_completion(&ctx, &mut rng).is_empty());
        assert_eq!(ctl.state().current_level_index, 0);
    }

    #[test]
    fn dismiss_without_modal_is_noop() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let cmds = ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        assert!(cmds.is_empty());
    }

    #[test]
    fn index_never_passes_last_level() {
        let (mut ctl, mut stage, mut rng) = setup(3);
        for _ in 0..6 {
            collect_all(&mut ctl, &mut stage, &mut rng);
            ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
            assert!(ctl.state().current_level_index <= 2);
        }
        assert_eq!(ctl.state().current_level_index, 2);
        assert_eq!(ctl.state().phase, Phase::Finished);
    }

    #[test]
    fn score_counts_across_level_boundary() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        let ids = active_ids(&ctl);
        // Two coins on level 0, finish the rest, advance, one more on level 1.
        for id in &ids[..2] {
            ctl.dispatch(GameEvent::CoinCollected { coin: *id }, &mut stage, &mut rng);
        }
        assert_eq!(stage.score, 2);
        collect_all(&mut ctl, &mut stage, &mut rng);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        let next = active_ids(&ctl)[0];
        ctl.dispatch(GameEvent::CoinCollected { coin: next }, &mut stage, &mut rng);
        assert_eq!(ctl.state().score, 6);
        assert_eq!(stage.score, 6);
    }

    #[test]
    fn three_coins_three_points() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        for id in active_ids(&ctl).into_iter().take(3) {
            ctl.dispatch(GameEvent::CoinCollected { coin: id }, &mut stage, &mut rng);
            ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        }
        assert_eq!(stage.score, 3);
    }

    #[test]
    fn modal_shows_current_level_content() {
        let (mut ctl, mut stage, mut rng) = setup(5);
        collect_all(&mut ctl, &mut stage, &mut rng);
        ctl.dispatch(GameEvent::ModalDismissed, &mut stage, &mut rng);
        let id = active_ids(&ctl)[0];
        ctl.dispatch(GameEvent::CoinCollected { coin: id }, &mut stage, &mut rng);
        assert_eq!(stage.modal.as_deref(), Some("content 1"));
        assert_eq!(ctl.state().modal, Some(Modal { level_index: 1 }));
    }
}
