//! GameState: the mutable cursor over the catalog plus the score.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Coins remain, or the last modal was dismissed and a new level began.
    Playing,
    /// Last coin of the level taken; waiting for the modal to be dismissed.
    LevelComplete,
    /// Last level cleared. No more content is generated.
    Finished,
}

/// The level whose content is on screen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Modal {
    pub level_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    /// Monotonic, `0..=level_count - 1`.
    pub current_level_index: usize,
    /// +1 per coin, never reset.
    pub score: u32,
    pub phase: Phase,
    pub modal: Option<Modal>,
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            current_level_index: 0,
            score: 0,
            phase: Phase::Playing,
            modal: None,
        }
    }

    pub fn modal_open(&self) -> bool {
        self.modal.is_some()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
