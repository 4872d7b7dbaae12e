use chess::Color;
use std::time::Instant;

/// Authoritative remaining time for both sides, already normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub white_ms: u64,
    pub black_ms: u64,
    /// Side whose clock runs; `None` keeps the side of the previous anchor
    pub active: Option<Color>,
    /// Half-moves played; `None` keeps the count already known
    pub move_count: Option<u32>,
    /// Server-side instant (unix ms) at which the current turn started
    pub server_turn_start_ms: Option<u64>,
}

impl TimerSnapshot {
    pub fn new(white_ms: u64, black_ms: u64) -> Self {
        TimerSnapshot {
            white_ms,
            black_ms,
            active: None,
            move_count: None,
            server_turn_start_ms: None,
        }
    }

    pub fn with_active(mut self, active: Color) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_move_count(mut self, move_count: u32) -> Self {
        self.move_count = Some(move_count);
        self
    }
}

/// The live basis for local countdown projection.
///
/// Anchors are replaced wholesale by every accepted snapshot and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAnchor {
    pub white_ms: u64,
    pub black_ms: u64,
    pub active: Color,
    pub anchored_at: Instant,
    /// Clocks stay frozen until the first move is committed
    pub pre_first_move: bool,
    pub server_turn_start_ms: Option<u64>,
    pub generation: u64,
}

/// Remaining time as shown to the player. Never negative, never authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayedClocks {
    pub white_ms: u64,
    pub black_ms: u64,
}

impl DisplayedClocks {
    pub fn get(&self, side: Color) -> u64 {
        match side {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }
}

/// Local flag-fall notice.
///
/// This is advisory: the game server alone decides whether the timeout stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutEvent {
    pub loser: Color,
    pub winner: Color,
    /// Anchor generation the timeout was detected against
    pub generation: u64,
}
