//! A small real-time chat broker over WebSockets, for the Tokio stack.
//!
//! The server speaks two dialects on the same port: the standard
//! [WebSocket Protocol RFC](https://datatracker.ietf.org/doc/html/rfc6455)
//! and the legacy Hixie-76 draft still spoken by some embedded clients, each
//! negotiated from the opening handshake. Frames are decoded incrementally —
//! a parser snapshot survives arbitrarily chunked reads — and every decoded
//! chat message lands in a bounded in-memory history before being fanned out
//! to the other connected clients. A client may ask for the recent backlog
//! with a `{"cmd": ...}` message.

pub mod config;
pub mod connection;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod frame;
pub mod handshake;
pub mod history;
pub mod hub;
mod read;
pub mod server;
pub mod split;
mod write;
