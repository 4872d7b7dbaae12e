use chess::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::utils::color_to_string;

/// Message sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClientMessage {
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promote_to: Option<String>,
}

/// Something the player asked for that the server has to rule on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIntent {
    Create {
        start_time_minutes: u64,
        increment_seconds: u64,
        color_preference: Option<Color>,
    },
    Join {
        game_id: String,
    },
    Move {
        from: String,
        to: String,
        promote_to: Option<String>,
    },
    Resign,
    OfferDraw,
    RequestTimeSync,
}

impl ClientIntent {
    /// Build the wire message, tagging it with the current game when known
    pub fn to_message(&self, game_id: Option<&str>) -> ClientMessage {
        let game_id = game_id.map(str::to_string);
        match self {
            ClientIntent::Create {
                start_time_minutes,
                increment_seconds,
                color_preference,
            } => ClientMessage {
                message_type: "create".to_string(),
                start_time_minutes: Some(*start_time_minutes),
                increment_seconds: Some(*increment_seconds),
                color_preference: color_preference.map(color_to_string),
                ..Default::default()
            },
            ClientIntent::Join { game_id } => ClientMessage {
                message_type: "join".to_string(),
                game_id: Some(game_id.clone()),
                ..Default::default()
            },
            ClientIntent::Move { from, to, promote_to } => ClientMessage {
                message_type: "move".to_string(),
                game_id,
                move_from: Some(from.to_lowercase()),
                move_to: Some(to.to_lowercase()),
                promote_to: promote_to.clone(),
                ..Default::default()
            },
            ClientIntent::Resign => ClientMessage {
                message_type: "resign".to_string(),
                game_id,
                ..Default::default()
            },
            ClientIntent::OfferDraw => ClientMessage {
                message_type: "offer_draw".to_string(),
                game_id,
                ..Default::default()
            },
            ClientIntent::RequestTimeSync => ClientMessage {
                message_type: "time_sync".to_string(),
                game_id,
                ..Default::default()
            },
        }
    }
}

/// How a finished game was decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameResultCode {
    Checkmate,
    Timeout,
    Draw,
    Other(String),
}

impl GameResultCode {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "checkmate" => GameResultCode::Checkmate,
            "timeout" => GameResultCode::Timeout,
            "draw" => GameResultCode::Draw,
            other => GameResultCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for GameResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResultCode::Checkmate => write!(f, "checkmate"),
            GameResultCode::Timeout => write!(f, "timeout"),
            GameResultCode::Draw => write!(f, "draw"),
            GameResultCode::Other(code) => write!(f, "{}", code),
        }
    }
}

/// End-of-game notice pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    pub result: GameResultCode,
    pub winner: Option<Color>,
    pub reason: String,
}

/// Connection lifecycle notices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { connection_id: String },
    Closed { connection_id: String },
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Connected { connection_id } => {
                write!(f, "connection {} established", connection_id)
            }
            ConnectionEvent::Closed { connection_id } => {
                write!(f, "connection {} closed", connection_id)
            }
        }
    }
}
