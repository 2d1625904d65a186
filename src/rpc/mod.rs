//! JSON-RPC 2.0 protocol front.
//!
//! Reads framed messages from a byte stream (stdin for the launcher),
//! dispatches them to a [`TreeServer`] and writes responses and
//! `document/edited` notifications back through a single writer.

pub mod client;
pub mod codec;
pub mod params;
pub mod server;
pub mod types;

pub use client::{Client, Outbox};
pub use codec::{FrameReader, Framing};
pub use server::{ServerOptions, TreeServer};
