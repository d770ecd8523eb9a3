/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous running and jumping while a key is held
///   - Edge-triggered dismiss (only fires on initial press)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// Key bindings:
///   ← / A        run left
///   → / D        run right
///   ↑ / W / Space  jump
///   Enter / Esc / Space  dismiss the open section
///   Q / Ctrl-C   quit

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{Facing, FrameInput};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const LEFT_KEYS: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const RIGHT_KEYS: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const JUMP_KEYS: &[KeyCode] =
    &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char(' ')];
const DISMISS_KEYS: &[KeyCode] = &[KeyCode::Enter, KeyCode::Esc, KeyCode::Char(' ')];
const QUIT_KEYS: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// Everything the game loop needs from one frame of input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub frame: FrameInput,
    /// Edge-triggered. Only meaningful while a modal is open.
    pub dismiss: bool,
    pub quit: bool,
}

impl Controls {
    /// Combine with another device: held inputs OR together,
    /// conflicting directions cancel out.
    pub fn merge(self, other: Controls) -> Controls {
        let horizontal = match (self.frame.horizontal, other.frame.horizontal) {
            (Some(a), Some(b)) if a != b => None,
            (Some(a), _) => Some(a),
            (None, b) => b,
        };
        Controls {
            frame: FrameInput { horizontal, jump: self.frame.jump || other.frame.jump },
            dismiss: self.dismiss || other.dismiss,
            quit: self.quit || other.quit,
        }
    }
}

/// Keeps jump off after a key closes a section, until every jump input has
/// been let go. Space both dismisses and jumps, and stays held for
/// `HOLD_TIMEOUT` after the press.
#[derive(Clone, Copy, Debug, Default)]
pub struct JumpLatch {
    armed: bool,
}

impl JumpLatch {
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn filter(&mut self, mut controls: Controls) -> Controls {
        if self.armed {
            if controls.frame.jump {
                controls.frame.jump = false;
            } else {
                self.armed = false;
            }
        }
        controls
    }
}

/// Left + right held together means standing still.
pub fn horizontal_from(left: bool, right: bool) -> Option<Facing> {
    match (left, right) {
        (true, false) => Some(Facing::Left),
        (false, true) => Some(Facing::Right),
        _ => None,
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for Ctrl-C detection.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key);
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // Enhancement not confirmed; rely on timeout-based expiry
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Map the held/pressed keys of this frame onto game controls.
    pub fn controls(&self) -> Controls {
        Controls {
            frame: FrameInput {
                horizontal: horizontal_from(self.any_held(LEFT_KEYS), self.any_held(RIGHT_KEYS)),
                jump: self.any_held(JUMP_KEYS),
            },
            dismiss: self.any_pressed(DISMISS_KEYS),
            quit: self.ctrl_c_pressed() || self.any_pressed(QUIT_KEYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputState, code: KeyCode) {
        input.record(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn arrows_and_wasd_move() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Char('a'));
        assert_eq!(input.controls().frame.horizontal, Some(Facing::Left));

        let mut input = InputState::new();
        press(&mut input, KeyCode::Right);
        press(&mut input, KeyCode::Up);
        let c = input.controls();
        assert_eq!(c.frame.horizontal, Some(Facing::Right));
        assert!(c.frame.jump);
        assert!(!c.dismiss);
    }

    #[test]
    fn opposite_directions_cancel() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Right);
        assert_eq!(input.controls().frame.horizontal, None);
    }

    #[test]
    fn space_jumps_and_dismisses() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Char(' '));
        let c = input.controls();
        assert!(c.frame.jump);
        assert!(c.dismiss);
    }

    #[test]
    fn dismiss_is_edge_triggered() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Enter);
        assert!(input.controls().dismiss);
        input.fresh_presses.clear();
        // Auto-repeat while still held is not a new press.
        press(&mut input, KeyCode::Enter);
        assert!(!input.controls().dismiss);
    }

    #[test]
    fn quit_keys() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Char('q'));
        assert!(input.controls().quit);

        let mut input = InputState::new();
        input.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(input.controls().quit);
    }

    #[test]
    fn release_honored_only_when_enabled() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Left);
        input.record(KeyEvent::new_with_kind(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Release));
        assert!(input.is_held(KeyCode::Left));

        input.honor_release = true;
        input.record(KeyEvent::new_with_kind(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Release));
        assert!(!input.is_held(KeyCode::Left));
    }

    #[test]
    fn merge_combines_devices() {
        let keys = Controls {
            frame: FrameInput { horizontal: Some(Facing::Left), jump: false },
            dismiss: false,
            quit: false,
        };
        let pad = Controls {
            frame: FrameInput { horizontal: None, jump: true },
            dismiss: true,
            quit: false,
        };
        let merged = keys.merge(pad);
        assert_eq!(merged.frame.horizontal, Some(Facing::Left));
        assert!(merged.frame.jump);
        assert!(merged.dismiss);

        let pad_right = Controls {
            frame: FrameInput { horizontal: Some(Facing::Right), jump: false },
            ..Controls::default()
        };
        assert_eq!(keys.merge(pad_right).frame.horizontal, None);
    }

    #[test]
    fn no_jump_after_space_dismiss_until_released() {
        let mut input = InputState::new();
        input.honor_release = true;
        let mut latch = JumpLatch::default();

        press(&mut input, KeyCode::Char(' '));
        let first = latch.filter(input.controls());
        assert!(first.dismiss);
        latch.arm();

        // Following ticks: Space still held, no fresh press.
        input.fresh_presses.clear();
        for _ in 0..10 {
            let c = latch.filter(input.controls());
            assert!(!c.frame.jump);
            assert!(!c.dismiss);
        }

        input.record(KeyEvent::new_with_kind(KeyCode::Char(' '), KeyModifiers::NONE, KeyEventKind::Release));
        assert!(!latch.filter(input.controls()).frame.jump);

        press(&mut input, KeyCode::Up);
        assert!(latch.filter(input.controls()).frame.jump);
    }

    #[test]
    fn unarmed_latch_passes_jump_through() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Char('w'));
        let mut latch = JumpLatch::default();
        assert!(latch.filter(input.controls()).frame.jump);
    }
}
