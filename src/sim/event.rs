//! Events flowing into the progression controller, and the commands it
//! emits for the stage to carry out.

use crate::domain::entity::{CoinBatch, CoinId};
use crate::domain::layout::PlatformPlacement;

/// Reported by the stage (overlap) or the front end (dismiss trigger).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    CoinCollected { coin: CoinId },
    ModalDismissed,
}

/// Side effects of a state transition, applied to the stage in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetScore(u32),
    SetLevelName(String),
    ShowModal { title: String, content: String },
    HideModal,
    DeactivateCoin(CoinId),
    ClearPlatforms,
    SpawnPlatforms(Vec<PlatformPlacement>),
    MovePlayer { x: f64, y: f64 },
    /// Discards every existing coin body. New coins start unbound.
    ReplaceCoins(CoinBatch),
    /// Attach coin ↔ platform colliders and the player ↔ coin overlap.
    BindColliders,
    ShakeCamera { duration_ms: u32 },
    AnnounceFinished,
}
