//! Channel-based request/response messaging
//!
//! Requests name a channel and carry a unique response channel. Every
//! response for that request comes back on the response channel, so any
//! number of requests can be in flight on one connection. Streaming
//! requests end with a response marked `done`.

mod client;
pub mod codec;
mod message;
mod registry;
mod server;
pub mod transport;

pub use client::{IpcClient, ResponseStream};
pub use message::{channels, response_channel_for, ProtocolMessage, Request, Response};
pub use server::{Reply, Responder};
