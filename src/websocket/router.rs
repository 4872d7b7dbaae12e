use actix::Recipient;
use log::{debug, info, warn};

use crate::clock::{ApplySnapshot, MatchEnded};
use crate::events::EventBus;
use crate::game::utils::color_to_string;
use crate::models::{decode_push, ServerPush, TimerSnapshot};

/// Sends decoded server pushes to the clock and the UI.
///
/// Pushes are forwarded in arrival order, so when a move result and a timer
/// sync race each other the later one becomes the anchor.
#[derive(Clone)]
pub struct PushRouter {
    snapshots: Recipient<ApplySnapshot>,
    ended: Recipient<MatchEnded>,
    bus: EventBus,
}

impl PushRouter {
    pub fn new(
        snapshots: Recipient<ApplySnapshot>,
        ended: Recipient<MatchEnded>,
        bus: EventBus,
    ) -> Self {
        PushRouter { snapshots, ended, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Decode and route a text frame. Returns the game id when the push names one.
    pub fn route_text(&self, text: &str) -> Option<String> {
        match decode_push(text) {
            Ok(push) => self.route(push),
            Err(e) => {
                warn!("Error decoding server push: {}", e);
                None
            }
        }
    }

    pub fn route(&self, push: ServerPush) -> Option<String> {
        match push {
            ServerPush::MoveMade(snapshot) | ServerPush::TimeSync(snapshot) => {
                if let Some(snapshot) = snapshot {
                    self.anchor(snapshot);
                }
                None
            }
            ServerPush::GameState {
                game_id,
                snapshot,
                terminal,
            } => {
                if let Some(snapshot) = snapshot {
                    self.anchor(snapshot);
                }
                if terminal {
                    info!("Game state reports the match is over");
                    self.ended.do_send(MatchEnded);
                }
                game_id
            }
            ServerPush::GameOver(over) => {
                info!(
                    "Game over: {} (winner: {}), {}",
                    over.result,
                    over.winner.map(color_to_string).unwrap_or_else(|| "none".to_string()),
                    over.reason
                );
                self.ended.do_send(MatchEnded);
                self.bus.game_over.emit(&over);
                None
            }
            ServerPush::Other(message_type) => {
                debug!("Ignoring server push: {}", message_type);
                None
            }
        }
    }

    fn anchor(&self, snapshot: TimerSnapshot) {
        self.snapshots.do_send(ApplySnapshot(snapshot));
    }
}
