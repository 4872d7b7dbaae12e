use actix::Actor;
use futures::StreamExt;
use log::{debug, error, info, warn};

use chess_clock_client::clock::{ClockActor, ClockDisplay, SystemClock};
use chess_clock_client::config::ClientConfig;
use chess_clock_client::events::EventBus;
use chess_clock_client::game::utils::{color_to_string, format_clock};
use chess_clock_client::models::ClientIntent;
use chess_clock_client::websocket::{GameConnection, PushRouter};

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ClientConfig::from_env();
    info!("Starting chess clock client against {}", config.server_url);

    let bus = EventBus::new();
    let display = ClockDisplay::default();
    let clock =
        ClockActor::new(SystemClock, bus.clone(), display.clone(), config.tick_interval).start();

    // Anything that ends the session lands here
    let (done_tx, mut done_rx) = futures::channel::mpsc::unbounded::<String>();

    let _clocks = bus.clocks.subscribe(|clocks| {
        debug!(
            "white {} | black {}",
            format_clock(clocks.white_ms),
            format_clock(clocks.black_ms)
        );
    });
    let _timeout = bus.timeout.subscribe(|timeout| {
        warn!(
            "{} flagged locally, {} should win on time",
            color_to_string(timeout.loser),
            color_to_string(timeout.winner)
        );
    });
    let tx = done_tx.clone();
    let _game_over = bus.game_over.subscribe(move |over| {
        let _ = tx.unbounded_send(format!("game over: {} ({})", over.result, over.reason));
    });
    let tx = done_tx;
    let _connection = bus.connection.subscribe(move |event| {
        info!("{}", event);
        if matches!(event, chess_clock_client::models::ConnectionEvent::Closed { .. }) {
            let _ = tx.unbounded_send(event.to_string());
        }
    });

    let router =
        PushRouter::new(clock.clone().recipient(), clock.clone().recipient(), bus.clone());
    let connection = match GameConnection::connect(&config, router).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e.to_string(),
            ));
        }
    };

    match &config.game_id {
        Some(game_id) => connection.send(ClientIntent::Join {
            game_id: game_id.clone(),
        }),
        None => connection.send(ClientIntent::Create {
            start_time_minutes: config.start_time_minutes,
            increment_seconds: config.increment_seconds,
            color_preference: None,
        }),
    }

    if let Some(reason) = done_rx.next().await {
        info!("Session {} finished: {}", connection.id(), reason);
    }

    let final_clocks = display.read();
    info!(
        "Final clocks: white {} | black {}",
        format_clock(final_clocks.white_ms),
        format_clock(final_clocks.black_ms)
    );

    if connection.is_connected() {
        connection.disconnect().await;
    }
    Ok(())
}
