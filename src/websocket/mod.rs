pub mod client;
pub mod router;

pub use client::{ConnectionError, ConnectionHandle, Disconnect, GameConnection, SendIntent};
pub use router::PushRouter;
