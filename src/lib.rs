//! Client-side chess clocks kept in step with an authoritative game server.
//!
//! The server owns every ruling. This crate mirrors its timer snapshots and
//! interpolates a smooth per-side countdown between them.

pub mod clock;
pub mod config;
pub mod events;
pub mod game;
pub mod models;
pub mod websocket;
