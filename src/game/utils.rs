use chess::{Board, Color};
use serde_json::Value;
use std::str::FromStr;

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Parse a side name as the server spells it ("white", "w", "Black", ...)
pub fn parse_color(text: &str) -> Option<Color> {
    match text.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

/// Side to move encoded in a game status such as "white_turn"
pub fn color_from_status(status: &str) -> Option<Color> {
    match status {
        "white_turn" => Some(Color::White),
        "black_turn" => Some(Color::Black),
        _ => None,
    }
}

/// Whether a game status reported by the server means the match is over
pub fn is_terminal_status(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_lowercase().as_str(),
        "ended"
            | "finished"
            | "completed"
            | "game_over"
            | "checkmate"
            | "stalemate"
            | "resigned"
            | "resignation"
            | "draw"
            | "timeout"
            | "aborted"
            | "white_wins"
            | "black_wins"
    )
}

/// Coerce a JSON value into a non-negative millisecond count.
///
/// Numbers and numeric strings are accepted. Anything else (null, missing,
/// NaN, negative, garbage text) becomes 0. Fractions are floored.
pub fn coerce_millis(value: Option<&Value>) -> u64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n > 0.0 => {
            if n >= u64::MAX as f64 {
                u64::MAX
            } else {
                n.floor() as u64
            }
        }
        _ => 0,
    }
}

/// Side to move and number of half-moves played, read from a FEN string
pub fn fen_progress(fen: &str) -> Option<(Color, u32)> {
    let board = Board::from_str(fen).ok()?;
    let side = board.side_to_move();

    // The chess crate drops the move counters, so read the fullmove field directly
    let fullmove = fen
        .split_whitespace()
        .nth(5)
        .and_then(|field| field.parse::<u64>().ok())
        .unwrap_or(1)
        .max(1);

    let played = fullmove
        .saturating_sub(1)
        .saturating_mul(2)
        .saturating_add(u64::from(side == Color::Black))
        .min(u64::from(u32::MAX)) as u32;

    // Servers printing `chess::Board` always write "0 1"; only the initial
    // position really means nothing has been played yet
    if played == 0 && board != Board::default() {
        return Some((side, 1));
    }
    Some((side, played))
}

/// Render remaining time for display: "M:SS", or "S.t" under ten seconds
pub fn format_clock(ms: u64) -> String {
    if ms < 10_000 {
        format!("{}.{}", ms / 1000, (ms % 1000) / 100)
    } else {
        let total_seconds = ms / 1000;
        format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}
