//! Looping sprite-sheet clips for the player.
//!
//! A clip is a contiguous frame range played at a fixed rate. The animator
//! keeps elapsed time in microseconds so frame selection stays exact under
//! the fixed tick.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clip {
    pub first: u8,
    pub last: u8,
    pub fps: u32,
}

pub const WALK: Clip = Clip { first: 0, last: 3, fps: 10 };
pub const IDLE: Clip = Clip { first: 0, last: 1, fps: 5 };

impl Clip {
    pub fn frame_count(&self) -> u64 {
        u64::from(self.last.saturating_sub(self.first)) + 1
    }

    /// Frame shown `elapsed_us` after the clip started; loops forever.
    pub fn frame_at(&self, elapsed_us: u64) -> u8 {
        if self.fps == 0 {
            return self.first;
        }
        let ticks = elapsed_us * u64::from(self.fps) / 1_000_000;
        self.first + (ticks % self.frame_count()) as u8
    }
}

#[derive(Clone, Debug)]
pub struct Animator {
    clip: Clip,
    elapsed_us: u64,
}

impl Animator {
    pub fn new(clip: Clip) -> Self {
        Animator { clip, elapsed_us: 0 }
    }

    /// Switch clips. Replaying the current clip keeps its phase.
    pub fn play(&mut self, clip: Clip) {
        if self.clip != clip {
            self.clip = clip;
            self.elapsed_us = 0;
        }
    }

    pub fn tick(&mut self, dt_us: u64) {
        self.elapsed_us = self.elapsed_us.saturating_add(dt_us);
    }

    pub fn clip(&self) -> Clip {
        self.clip
    }

    pub fn frame(&self) -> u8 {
        self.clip.frame_at(self.elapsed_us)
    }
}
