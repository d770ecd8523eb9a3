//! Entities the progression core reasons about: coins and coin batches,
//! plus the per-frame player intent handed to the stage.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Frame input, sampled once per frame.
/// Horizontal = continuous (held key), jump = held but gated on ground contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub horizontal: Option<Facing>,
    pub jump: bool,
}

/// Coin identity. Unique for the whole run, never reused across batches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct CoinId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Coin {
    pub id: CoinId,
    /// Spawn position (center, world units). The live body belongs to the stage.
    pub x: f64,
    pub y: f64,
    pub active: bool,
}

/// One level's worth of coins, laid out in a horizontal row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoinBatch {
    coins: Vec<Coin>,
}

impl CoinBatch {
    /// `count` coins starting at `(x, y)`, `step` apart, ids from `first_id`.
    pub fn row(first_id: u32, x: f64, y: f64, count: usize, step: f64) -> Self {
        let coins = (0..count)
            .map(|i| Coin {
                id: CoinId(first_id + i as u32),
                x: x + step * i as f64,
                y,
                active: true,
            })
            .collect();
        CoinBatch { coins }
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.coins.iter().filter(|c| c.active).count()
    }

    pub fn is_active(&self, id: CoinId) -> bool {
        self.coins.iter().any(|c| c.id == id && c.active)
    }

    /// Deactivate a coin. Returns false if it is unknown or already inactive,
    /// so repeated collection reports are harmless.
    pub fn deactivate(&mut self, id: CoinId) -> bool {
        match self.coins.iter_mut().find(|c| c.id == id && c.active) {
            Some(coin) => {
                coin.active = false;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.coins.iter()
    }

    /// One past the highest id in the batch.
    pub fn next_id(&self) -> u32 {
        self.coins.iter().map(|c| c.id.0 + 1).max().unwrap_or(0)
    }
}
