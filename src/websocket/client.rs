use actix::io::{SinkWrite, WriteHandler};
use actix::prelude::*;
use actix_codec::Framed;
use awc::error::WsProtocolError;
use awc::{ws, BoxedSocket};
use futures::channel::oneshot;
use futures::stream::{SplitSink, StreamExt};
use log::{info, warn};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::models::{ClientIntent, ConnectionEvent};
use crate::websocket::router::PushRouter;

type WsSink = SplitSink<Framed<BoxedSocket, ws::Codec>, ws::Message>;

/// How long `disconnect` waits for the close frame to go out
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket handshake with {url} failed: {reason}")]
    Handshake { url: String, reason: String },
}

/// Forward a player intent to the server
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct SendIntent(pub ClientIntent);

/// Close the socket and stop the connection actor.
///
/// The sender, when given, fires once the actor has stopped.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct Disconnect(pub Option<oneshot::Sender<()>>);

/// One websocket session with the game server
pub struct GameConnection {
    id: String,
    sink: SinkWrite<ws::Message, WsSink>,
    router: PushRouter,
    game_id: Option<String>,
    sync_interval: Option<Duration>,
    on_stopped: Vec<oneshot::Sender<()>>,
}

impl GameConnection {
    /// Open a websocket to the game server.
    ///
    /// The returned handle owns the connection: dropping it disconnects.
    pub async fn connect(
        config: &ClientConfig,
        router: PushRouter,
    ) -> Result<ConnectionHandle, ConnectionError> {
        let (response, framed) = awc::Client::new()
            .ws(config.server_url.as_str())
            .connect()
            .await
            .map_err(|e| ConnectionError::Handshake {
                url: config.server_url.clone(),
                reason: e.to_string(),
            })?;

        let id = Uuid::new_v4().to_string();
        info!("Connected to {} as {} ({})", config.server_url, id, response.status());

        let (sink, stream) = framed.split();
        let connection_id = id.clone();
        let game_id = config.game_id.clone();
        let sync_interval = config.sync_interval;
        let addr = GameConnection::create(move |ctx| {
            GameConnection::add_stream(stream, ctx);
            GameConnection {
                id: connection_id,
                sink: SinkWrite::new(sink, ctx),
                router,
                game_id,
                sync_interval,
                on_stopped: Vec::new(),
            }
        });

        Ok(ConnectionHandle {
            id,
            addr,
            disconnected: false,
        })
    }

    fn send_intent(&mut self, intent: &ClientIntent) {
        let message = intent.to_message(self.game_id.as_deref());
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Error serializing client message: {}", e);
                return;
            }
        };

        if self.sink.write(ws::Message::Text(text.into())).is_err() {
            warn!("Connection {} is closed, dropping {}", self.id, message.message_type);
        }
    }

    fn handle_text(&mut self, text: &str) {
        if let Some(game_id) = self.router.route_text(text) {
            if self.game_id.as_deref() != Some(game_id.as_str()) {
                info!("Connection {} is now in game {}", self.id, game_id);
                self.game_id = Some(game_id);
            }
        }
    }
}

impl Actor for GameConnection {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.router.bus().connection.emit(&ConnectionEvent::Connected {
            connection_id: self.id.clone(),
        });

        if let Some(interval) = self.sync_interval {
            ctx.run_interval(interval, |act, _| {
                if act.game_id.is_some() {
                    act.send_intent(&ClientIntent::RequestTimeSync);
                }
            });
        }
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        info!("WebSocket connection closed: {}", self.id);
        self.router.bus().connection.emit(&ConnectionEvent::Closed {
            connection_id: self.id.clone(),
        });
        for waiter in self.on_stopped.drain(..) {
            let _ = waiter.send(());
        }
    }
}

// The default `finished` stops the actor once the sink has flushed and closed
impl WriteHandler<WsProtocolError> for GameConnection {}

impl StreamHandler<Result<ws::Frame, WsProtocolError>> for GameConnection {
    fn handle(&mut self, msg: Result<ws::Frame, WsProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Frame::Text(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.handle_text(text),
                Err(e) => warn!("Received non UTF-8 text frame: {}", e),
            },
            Ok(ws::Frame::Ping(bytes)) => {
                if self.sink.write(ws::Message::Pong(bytes)).is_err() {
                    warn!("Could not answer ping on {}", self.id);
                }
            }
            Ok(ws::Frame::Binary(_)) => {
                warn!("Binary messages are not supported");
            }
            Ok(ws::Frame::Close(reason)) => {
                info!("Server closed the connection: {:?}", reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket protocol error: {}", e);
                ctx.stop();
            }
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

impl Handler<SendIntent> for GameConnection {
    type Result = ();

    fn handle(&mut self, msg: SendIntent, _: &mut Self::Context) {
        self.send_intent(&msg.0);
    }
}

impl Handler<Disconnect> for GameConnection {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Self::Context) {
        info!("Disconnecting {}", self.id);
        self.on_stopped.extend(msg.0);

        if self.sink.write(ws::Message::Close(None)).is_err() {
            warn!("Connection {} was already closed", self.id);
            ctx.stop();
            return;
        }
        self.sink.close();
    }
}

/// Owned handle to a live `GameConnection`
pub struct ConnectionHandle {
    id: String,
    addr: Addr<GameConnection>,
    disconnected: bool,
}

impl ConnectionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn send(&self, intent: ClientIntent) {
        self.addr.do_send(SendIntent(intent));
    }

    pub fn is_connected(&self) -> bool {
        self.addr.connected()
    }

    /// Send the close frame and wait until the connection actor has stopped
    pub async fn disconnect(mut self) {
        self.disconnected = true;
        let (stopped_tx, stopped_rx) = oneshot::channel();
        if self.addr.send(Disconnect(Some(stopped_tx))).await.is_err() {
            return;
        }
        if actix_rt::time::timeout(CLOSE_TIMEOUT, stopped_rx).await.is_err() {
            warn!("Connection {} did not close within {:?}", self.id, CLOSE_TIMEOUT);
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if !self.disconnected && self.addr.connected() {
            self.addr.do_send(Disconnect(None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockActor, ClockDisplay, ManualClock};
    use crate::events::EventBus;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use actix_web_actors::ws as server_ws;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Server side of the socket; remembers whether a close frame arrived
    struct CloseRecorder {
        closed: Arc<AtomicBool>,
    }

    impl Actor for CloseRecorder {
        type Context = server_ws::WebsocketContext<Self>;
    }

    impl StreamHandler<Result<server_ws::Message, server_ws::ProtocolError>> for CloseRecorder {
        fn handle(
            &mut self,
            msg: Result<server_ws::Message, server_ws::ProtocolError>,
            ctx: &mut Self::Context,
        ) {
            if let Ok(server_ws::Message::Close(reason)) = msg {
                self.closed.store(true, Ordering::SeqCst);
                ctx.close(reason);
                ctx.stop();
            }
        }
    }

    async fn ws_index(
        req: HttpRequest,
        stream: web::Payload,
        closed: web::Data<Arc<AtomicBool>>,
    ) -> Result<HttpResponse, actix_web::Error> {
        let recorder = CloseRecorder {
            closed: closed.get_ref().clone(),
        };
        server_ws::start(recorder, &req, stream)
    }

    #[actix_rt::test]
    async fn disconnect_waits_for_the_close_frame() {
        let closed = Arc::new(AtomicBool::new(false));
        let data = web::Data::new(closed.clone());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/ws", web::get().to(ws_index))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let port = server.addrs()[0].port();
        actix_rt::spawn(server.run());

        let bus = EventBus::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let _subscription = bus
            .connection
            .subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let clock = ClockActor::new(
            ManualClock::new(),
            bus.clone(),
            ClockDisplay::default(),
            Duration::from_secs(3600),
        )
        .start();
        let router = PushRouter::new(clock.clone().recipient(), clock.recipient(), bus);
        let config = ClientConfig {
            server_url: format!("ws://127.0.0.1:{}/ws", port),
            sync_interval: None,
            ..ClientConfig::default()
        };

        let connection = GameConnection::connect(&config, router).await.unwrap();
        let id = connection.id().to_string();
        assert!(connection.is_connected());

        connection.disconnect().await;

        // The actor has stopped by the time disconnect returns
        let seen = events.lock().unwrap().clone();
        assert!(seen.contains(&ConnectionEvent::Closed { connection_id: id }));

        // The close frame reached the server; its worker runs on another thread
        for _ in 0..100 {
            if closed.load(Ordering::SeqCst) {
                break;
            }
            actix_rt::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(closed.load(Ordering::SeqCst));
    }
}
