use chess::Color;
use log::debug;

use crate::clock::source::{Clock, SystemClock};
use crate::models::{ClockAnchor, DisplayedClocks, TimeoutEvent, TimerSnapshot};

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub clocks: DisplayedClocks,
    /// Set on the one tick that first sees a clock at zero
    pub timeout: Option<TimeoutEvent>,
}

/// Projects both sides' remaining time between authoritative snapshots.
///
/// Every snapshot becomes a new anchor; ticks only ever subtract the time
/// elapsed since that anchor from the active side. Nothing here can fail:
/// inputs are normalized before they reach this type.
pub struct ClockReconciler<C: Clock = SystemClock> {
    clock: C,
    anchor: Option<ClockAnchor>,
    displayed: DisplayedClocks,
    highest_move_count: u32,
    timeout_signalled: bool,
    generation: u64,
}

impl<C: Clock> ClockReconciler<C> {
    pub fn new(clock: C) -> Self {
        ClockReconciler {
            clock,
            anchor: None,
            displayed: DisplayedClocks::default(),
            highest_move_count: 0,
            timeout_signalled: false,
            generation: 0,
        }
    }

    /// Replace the live anchor and republish the snapshot values as-is
    pub fn apply_snapshot(&mut self, snapshot: TimerSnapshot) -> DisplayedClocks {
        let active = snapshot
            .active
            .or(self.anchor.map(|anchor| anchor.active))
            .unwrap_or(Color::White);

        // Out-of-order pushes must not drag the game back before its first move
        if let Some(count) = snapshot.move_count {
            self.highest_move_count = self.highest_move_count.max(count);
        }

        self.generation += 1;
        let anchor = ClockAnchor {
            white_ms: snapshot.white_ms,
            black_ms: snapshot.black_ms,
            active,
            anchored_at: self.clock.now(),
            pre_first_move: self.highest_move_count == 0,
            server_turn_start_ms: snapshot.server_turn_start_ms,
            generation: self.generation,
        };

        debug!(
            "Anchor #{}: white={}ms black={}ms active={:?} pre_first_move={}",
            anchor.generation,
            anchor.white_ms,
            anchor.black_ms,
            anchor.active,
            anchor.pre_first_move
        );

        self.anchor = Some(anchor);
        self.timeout_signalled = false;
        self.displayed = DisplayedClocks {
            white_ms: anchor.white_ms,
            black_ms: anchor.black_ms,
        };
        self.displayed
    }

    /// Recompute the displayed clocks from the live anchor
    pub fn tick(&mut self) -> TickOutcome {
        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => {
                return TickOutcome {
                    clocks: self.displayed,
                    timeout: None,
                }
            }
        };

        self.displayed = project(&anchor, self.clock.now());

        let timeout = if anchor.pre_first_move || self.timeout_signalled {
            None
        } else {
            self.detect_timeout(&anchor)
        };

        TickOutcome {
            clocks: self.displayed,
            timeout,
        }
    }

    fn detect_timeout(&mut self, anchor: &ClockAnchor) -> Option<TimeoutEvent> {
        let loser = if self.displayed.get(anchor.active) == 0 {
            anchor.active
        } else if self.displayed.white_ms == 0 {
            Color::White
        } else if self.displayed.black_ms == 0 {
            Color::Black
        } else {
            return None;
        };

        self.timeout_signalled = true;
        Some(TimeoutEvent {
            loser,
            winner: !loser,
            generation: anchor.generation,
        })
    }

    pub fn displayed(&self) -> DisplayedClocks {
        self.displayed
    }

    pub fn anchor(&self) -> Option<&ClockAnchor> {
        self.anchor.as_ref()
    }

    pub fn timeout_signalled(&self) -> bool {
        self.timeout_signalled
    }

    pub fn is_pre_first_move(&self) -> bool {
        self.anchor.map_or(true, |anchor| anchor.pre_first_move)
    }
}

/// Remaining time on both clocks at `now`, seen from `anchor`
fn project(anchor: &ClockAnchor, now: std::time::Instant) -> DisplayedClocks {
    if anchor.pre_first_move {
        return DisplayedClocks {
            white_ms: anchor.white_ms,
            black_ms: anchor.black_ms,
        };
    }

    let elapsed = u64::try_from(now.saturating_duration_since(anchor.anchored_at).as_millis())
        .unwrap_or(u64::MAX);

    match anchor.active {
        Color::White => DisplayedClocks {
            white_ms: anchor.white_ms.saturating_sub(elapsed),
            black_ms: anchor.black_ms,
        },
        Color::Black => DisplayedClocks {
            white_ms: anchor.white_ms,
            black_ms: anchor.black_ms.saturating_sub(elapsed),
        },
    }
}
