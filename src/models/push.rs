use chess::Color;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::game::utils::{
    coerce_millis, color_from_status, fen_progress, is_terminal_status, parse_color,
};
use crate::models::clock_state::TimerSnapshot;
use crate::models::messages::{GameOver, GameResultCode};

/// A push from the game server, decoded into what the client cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPush {
    /// A move was accepted; may carry fresh timers
    MoveMade(Option<TimerSnapshot>),
    /// Dedicated timer synchronization
    TimeSync(Option<TimerSnapshot>),
    /// General game state; `terminal` is set once the match is over
    GameState {
        game_id: Option<String>,
        snapshot: Option<TimerSnapshot>,
        terminal: bool,
    },
    GameOver(GameOver),
    /// Anything the clock has no use for
    Other(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("push is not a JSON object")]
    NotAnObject,
    #[error("push has no message type")]
    MissingType,
}

/// Decode one text frame from the server
pub fn decode_push(text: &str) -> Result<ServerPush, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let envelope = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let message_type = ["message_type", "event", "type"]
        .iter()
        .find_map(|key| envelope.get(*key).and_then(Value::as_str))
        .ok_or(DecodeError::MissingType)?;

    let payload = match envelope.get("data") {
        Some(Value::Object(data)) => data,
        _ => envelope,
    };

    let push = match message_type {
        "move_made" | "move_result" | "moveMade" => ServerPush::MoveMade(extract_snapshot(payload)),
        "time_sync" | "timer_sync" | "timerSync" | "timeSync" => {
            ServerPush::TimeSync(extract_snapshot(payload))
        }
        "game_state" | "gameState" | "game_joined" | "game_created" | "player_joined" => {
            ServerPush::GameState {
                game_id: ["game_id", "gameId"]
                    .iter()
                    .find_map(|key| payload.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                snapshot: extract_snapshot(payload),
                terminal: payload_is_terminal(payload),
            }
        }
        "game_over" | "gameOver" | "game_ended" => ServerPush::GameOver(extract_game_over(payload)),
        other => ServerPush::Other(other.to_string()),
    };

    Ok(push)
}

/// Pull timer values out of any of the payload shapes the server uses.
///
/// Returns `None` when the payload carries no recognizable timer data at all.
/// Within a recognized shape, missing values are coerced to 0.
pub fn extract_snapshot(payload: &Map<String, Value>) -> Option<TimerSnapshot> {
    let (white_ms, black_ms) = extract_timers(payload)?;

    let fen = payload.get("fen").and_then(Value::as_str).and_then(fen_progress);

    Some(TimerSnapshot {
        white_ms,
        black_ms,
        active: extract_active(payload).or(fen.map(|(side, _)| side)),
        move_count: extract_move_count(payload).or(fen.map(|(_, played)| played)),
        server_turn_start_ms: ["turnStartTimestamp", "turn_start_timestamp", "turnStart"]
            .iter()
            .find_map(|key| payload.get(*key))
            .map(|v| coerce_millis(Some(v)))
            .filter(|ms| *ms > 0),
    })
}

fn extract_timers(payload: &Map<String, Value>) -> Option<(u64, u64)> {
    match payload.get("timers") {
        // {timers: {white, black}}
        Some(Value::Object(timers)) => {
            return Some((
                coerce_millis(timers.get("white")),
                coerce_millis(timers.get("black")),
            ));
        }
        // {timers: <whiteMs>, black: <blackMs>}
        Some(scalar) if !scalar.is_null() => {
            return Some((coerce_millis(Some(scalar)), coerce_millis(payload.get("black"))));
        }
        _ => {}
    }

    // {board: {whiteTime, blackTime}}
    if let Some(Value::Object(board)) = payload.get("board") {
        if board.contains_key("whiteTime") || board.contains_key("blackTime") {
            return Some((
                coerce_millis(board.get("whiteTime")),
                coerce_millis(board.get("blackTime")),
            ));
        }
    }

    let pairs = [
        ("white", "black"),
        ("white_time_ms", "black_time_ms"),
        ("time_white", "time_black"),
    ];
    pairs.iter().find_map(|(white, black)| {
        if payload.contains_key(*white) || payload.contains_key(*black) {
            Some((coerce_millis(payload.get(*white)), coerce_millis(payload.get(*black))))
        } else {
            None
        }
    })
}

fn extract_active(payload: &Map<String, Value>) -> Option<Color> {
    let named = ["active_color", "activeSide", "active_side", "turn", "currentTurn"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .find_map(parse_color);

    named.or_else(|| {
        ["status", "game_status"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(Value::as_str))
            .find_map(color_from_status)
    })
}

fn extract_move_count(payload: &Map<String, Value>) -> Option<u32> {
    let explicit = ["moveCount", "move_count"]
        .iter()
        .find_map(|key| payload.get(*key))
        .map(|v| coerce_millis(Some(v)).min(u64::from(u32::MAX)) as u32);

    explicit.or_else(|| {
        ["moves", "history"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_array))
            .map(|moves| moves.len().min(u32::MAX as usize) as u32)
    })
}

fn payload_is_terminal(payload: &Map<String, Value>) -> bool {
    let flagged = ["gameOver", "game_over", "isGameOver"]
        .iter()
        .any(|key| payload.get(*key).and_then(Value::as_bool).unwrap_or(false));

    flagged
        || ["status", "game_status"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(Value::as_str))
            .any(is_terminal_status)
}

fn extract_game_over(payload: &Map<String, Value>) -> GameOver {
    let result = ["result", "code", "status"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(GameResultCode::parse)
        .unwrap_or_else(|| GameResultCode::Other("unknown".to_string()));

    let winner = payload
        .get("winner")
        .and_then(Value::as_str)
        .and_then(parse_color);

    let reason = payload
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| result.to_string());

    GameOver { result, winner, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockReconciler, ManualClock};
    use crate::models::DisplayedClocks;
    use chess::{Board, ChessMove, Square};
    use serde_json::json;

    fn snapshot_of(value: Value) -> Option<TimerSnapshot> {
        extract_snapshot(value.as_object().unwrap())
    }

    #[test]
    fn nested_timers_with_string_and_null() {
        let snapshot =
            snapshot_of(json!({"timers": {"white": "120000", "black": null}})).unwrap();
        assert_eq!(snapshot.white_ms, 120_000);
        assert_eq!(snapshot.black_ms, 0);
    }

    #[test]
    fn all_timer_sync_shapes_normalize_alike() {
        let nested = snapshot_of(json!({"timers": {"white": 3000, "black": 4000}})).unwrap();
        let split = snapshot_of(json!({"timers": 3000, "black": 4000})).unwrap();
        let flat = snapshot_of(json!({"white": 3000, "black": 4000})).unwrap();

        for s in [nested, split, flat] {
            assert_eq!((s.white_ms, s.black_ms), (3000, 4000));
        }
    }

    #[test]
    fn timers_object_wins_over_board_times() {
        let snapshot = snapshot_of(json!({
            "timers": {"white": 1000, "black": 2000},
            "board": {"whiteTime": 9000, "blackTime": 9000}
        }))
        .unwrap();
        assert_eq!((snapshot.white_ms, snapshot.black_ms), (1000, 2000));

        let board_only =
            snapshot_of(json!({"board": {"whiteTime": 7000, "blackTime": -5}})).unwrap();
        assert_eq!((board_only.white_ms, board_only.black_ms), (7000, 0));
    }

    #[test]
    fn payload_without_timers_yields_nothing() {
        assert_eq!(snapshot_of(json!({"fen": "whatever", "status": "active"})), None);
        assert_eq!(snapshot_of(json!({"timers": null})), None);
    }

    #[test]
    fn active_side_and_move_count_sources() {
        let explicit = snapshot_of(json!({
            "white": 1, "black": 1, "turn": "b", "moveCount": 3
        }))
        .unwrap();
        assert_eq!(explicit.active, Some(Color::Black));
        assert_eq!(explicit.move_count, Some(3));

        let from_history = snapshot_of(json!({
            "white": 1, "black": 1, "status": "white_turn", "moves": ["e4", "e5"]
        }))
        .unwrap();
        assert_eq!(from_history.active, Some(Color::White));
        assert_eq!(from_history.move_count, Some(2));

        let from_fen = snapshot_of(json!({
            "white_time_ms": 5000,
            "black_time_ms": 6000,
            "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        }))
        .unwrap();
        assert_eq!((from_fen.white_ms, from_fen.black_ms), (5000, 6000));
        assert_eq!(from_fen.active, Some(Color::Black));
        assert_eq!(from_fen.move_count, Some(1));
    }

    #[test]
    fn mid_game_board_fen_starts_the_countdown() {
        // `chess::Board` prints "0 1" whatever the game length
        let fen = Board::default()
            .make_move_new(ChessMove::new(Square::E2, Square::E4, None))
            .make_move_new(ChessMove::new(Square::E7, Square::E5, None))
            .to_string();
        let snapshot = snapshot_of(json!({
            "white_time_ms": 60_000,
            "black_time_ms": 55_000,
            "fen": fen
        }))
        .unwrap();

        let clock = ManualClock::new();
        let mut reconciler = ClockReconciler::new(clock.clone());
        reconciler.apply_snapshot(snapshot);
        assert!(!reconciler.is_pre_first_move());

        clock.advance_ms(1500);
        assert_eq!(
            reconciler.tick().clocks,
            DisplayedClocks { white_ms: 58_500, black_ms: 55_000 }
        );

        // A fresh game is still frozen until the first move
        let start = snapshot_of(json!({
            "white_time_ms": 60_000,
            "black_time_ms": 60_000,
            "fen": Board::default().to_string()
        }))
        .unwrap();
        let mut fresh = ClockReconciler::new(clock.clone());
        fresh.apply_snapshot(start);
        clock.advance_ms(1500);
        assert!(fresh.is_pre_first_move());
        assert_eq!(fresh.tick().clocks.white_ms, 60_000);
    }

    #[test]
    fn decodes_envelopes() {
        let push =
            decode_push(r#"{"message_type":"time_sync","timers":{"white":10,"black":20}}"#)
                .unwrap();
        assert_eq!(push, ServerPush::TimeSync(Some(TimerSnapshot::new(10, 20))));

        let push = decode_push(
            r#"{"event":"move_made","data":{"timers":{"white":5,"black":6},"turn":"white"}}"#,
        )
        .unwrap();
        assert_eq!(
            push,
            ServerPush::MoveMade(Some(TimerSnapshot::new(5, 6).with_active(Color::White)))
        );

        let push = decode_push(r#"{"message_type":"game_state","status":"checkmate"}"#).unwrap();
        assert_eq!(
            push,
            ServerPush::GameState {
                game_id: None,
                snapshot: None,
                terminal: true
            }
        );

        let push = decode_push(
            r#"{"message_type":"game_joined","game_id":"g-7",
                "time_white":60000,"time_black":60000,"status":"waiting"}"#,
        )
        .unwrap();
        assert_eq!(
            push,
            ServerPush::GameState {
                game_id: Some("g-7".to_string()),
                snapshot: Some(TimerSnapshot::new(60_000, 60_000)),
                terminal: false
            }
        );

        let push = decode_push(r#"{"message_type":"available_moves"}"#).unwrap();
        assert_eq!(push, ServerPush::Other("available_moves".to_string()));
    }

    #[test]
    fn decodes_game_over() {
        let push = decode_push(
            r#"{"message_type":"game_over","result":"timeout","winner":"black",
                "reason":"White ran out of time"}"#,
        )
        .unwrap();
        assert_eq!(
            push,
            ServerPush::GameOver(GameOver {
                result: GameResultCode::Timeout,
                winner: Some(Color::Black),
                reason: "White ran out of time".to_string(),
            })
        );

        let push =
            decode_push(r#"{"message_type":"game_over","result":"draw","winner":null}"#).unwrap();
        match push {
            ServerPush::GameOver(over) => {
                assert_eq!(over.result, GameResultCode::Draw);
                assert_eq!(over.winner, None);
                assert_eq!(over.reason, "draw");
            }
            other => panic!("unexpected push {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(decode_push("{nope"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_push("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode_push(r#"{"timers":1}"#), Err(DecodeError::MissingType)));
    }
}
