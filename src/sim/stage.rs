//! The engine capability the progression core drives.
//!
//! The stage owns every live entity (player body, platform bodies, coin
//! bodies, overlay widgets). The core only reads the viewport and the
//! player position, and pushes `Command`s.

use crate::domain::layout::Viewport;
use super::event::Command;

pub trait Stage {
    fn viewport(&self) -> Viewport;
    fn player_position(&self) -> (f64, f64);
    fn apply(&mut self, command: &Command);
}

/// What a transition may read from the stage, captured before it runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageContext {
    pub viewport: Viewport,
    pub player_x: f64,
    pub player_y: f64,
}

impl StageContext {
    pub fn capture<S: Stage + ?Sized>(stage: &S) -> Self {
        let (player_x, player_y) = stage.player_position();
        StageContext { viewport: stage.viewport(), player_x, player_y }
    }
}
