use actix::prelude::*;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::clock::reconciler::ClockReconciler;
use crate::clock::source::{Clock, SystemClock};
use crate::events::EventBus;
use crate::game::utils::{color_to_string, format_clock};
use crate::models::{DisplayedClocks, TimerSnapshot};

/// Recommended refresh period for a smooth countdown
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Re-anchor the clocks on an authoritative snapshot
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct ApplySnapshot(pub TimerSnapshot);

/// Recompute the displayed clocks now
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct Tick;

/// The server reported the match as finished; stop ticking for good
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct MatchEnded;

/// Where the clock actor is in the match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// No snapshot received yet
    Waiting,
    Running,
    /// A clock hit zero locally; waiting for the server to confirm
    TimedOut,
    Ended,
}

/// Last computed clocks, readable from anywhere without touching the actor
#[derive(Debug, Clone, Default)]
pub struct ClockDisplay {
    clocks: Arc<Mutex<DisplayedClocks>>,
}

impl ClockDisplay {
    pub fn read(&self) -> DisplayedClocks {
        *self.clocks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, clocks: DisplayedClocks) {
        *self.clocks.lock().unwrap_or_else(PoisonError::into_inner) = clocks;
    }
}

/// Drives a `ClockReconciler` from a periodic interval.
///
/// The mailbox serializes snapshots and ticks, so an anchor is always swapped
/// whole between two ticks and snapshots apply in arrival order.
pub struct ClockActor<C: Clock = SystemClock> {
    reconciler: ClockReconciler<C>,
    bus: EventBus,
    display: ClockDisplay,
    tick_interval: Duration,
    ticker: Option<SpawnHandle>,
    status: MatchStatus,
}

impl<C: Clock + Unpin + 'static> ClockActor<C> {
    pub fn new(clock: C, bus: EventBus, display: ClockDisplay, tick_interval: Duration) -> Self {
        ClockActor {
            reconciler: ClockReconciler::new(clock),
            bus,
            display,
            tick_interval,
            ticker: None,
            status: MatchStatus::Waiting,
        }
    }

    fn publish(&self, clocks: DisplayedClocks) {
        self.display.publish(clocks);
        self.bus.clocks.emit(&clocks);
    }

    fn start_ticking(&mut self, ctx: &mut Context<Self>) {
        if self.ticker.is_none() {
            debug!("Starting clock ticker every {:?}", self.tick_interval);
            self.ticker = Some(ctx.run_interval(self.tick_interval, |act, ctx| act.on_tick(ctx)));
        }
    }

    fn stop_ticking(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.ticker.take() {
            debug!("Stopping clock ticker");
            ctx.cancel_future(handle);
        }
    }

    fn on_tick(&mut self, ctx: &mut Context<Self>) {
        if self.status != MatchStatus::Running {
            return;
        }

        let outcome = self.reconciler.tick();
        self.publish(outcome.clocks);

        if let Some(timeout) = outcome.timeout {
            warn!(
                "Clock flag fell for {} (anchor #{}), awaiting server ruling",
                color_to_string(timeout.loser),
                timeout.generation
            );
            self.status = MatchStatus::TimedOut;
            self.stop_ticking(ctx);
            self.bus.timeout.emit(&timeout);
        }
    }
}

impl<C: Clock + Unpin + 'static> Actor for ClockActor<C> {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("Clock actor started");
    }

    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        self.stop_ticking(ctx);
        info!("Clock actor stopping");
        Running::Stop
    }
}

impl<C: Clock + Unpin + 'static> Handler<ApplySnapshot> for ClockActor<C> {
    type Result = ();

    fn handle(&mut self, msg: ApplySnapshot, ctx: &mut Self::Context) {
        if self.status == MatchStatus::Ended {
            debug!("Ignoring timer snapshot for a finished match");
            return;
        }

        let clocks = self.reconciler.apply_snapshot(msg.0);
        debug!(
            "Synced clocks: white {} / black {}",
            format_clock(clocks.white_ms),
            format_clock(clocks.black_ms)
        );
        self.publish(clocks);

        self.status = MatchStatus::Running;
        self.start_ticking(ctx);
    }
}

impl<C: Clock + Unpin + 'static> Handler<Tick> for ClockActor<C> {
    type Result = ();

    fn handle(&mut self, _: Tick, ctx: &mut Self::Context) {
        self.on_tick(ctx);
    }
}

impl<C: Clock + Unpin + 'static> Handler<MatchEnded> for ClockActor<C> {
    type Result = ();

    fn handle(&mut self, _: MatchEnded, ctx: &mut Self::Context) {
        if self.status != MatchStatus::Ended {
            info!("Match ended, clocks frozen at {:?}", self.reconciler.displayed());
            self.status = MatchStatus::Ended;
            self.stop_ticking(ctx);
        }
    }
}
