//! redispatch: a transport-agnostic RESP client core.
//!
//! This crate implements the protocol half of a Redis client and nothing
//! else. It has no socket: outbound command frames are handed to a write
//! callback, inbound bytes are pushed in through [`Client::feed`]. The
//! surrounding shell wires those two ends to whatever transport it likes.
//!
//! Pieces, bottom-up:
//! - [`Value`]: the decoded reply datum (nil, integer, status, error, bulk,
//!   array)
//! - [`Parser`]: an incremental RESP decoder that accepts input split at any
//!   byte boundary and resumes across calls
//! - [`Client`]: the dispatcher that frames requests, correlates replies
//!   FIFO, and routes pub/sub pushes to per-channel handlers
//!
//! RESP2 only; RESP3 frame types and inline commands are not supported.

pub mod client;
pub mod parser;
pub mod value;

mod commands;

pub use client::Client;
pub use parser::{ParseStatus, Parser};
pub use value::{Kind, Value};
