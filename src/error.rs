// src/error.rs
//
// Flat error enum for the node. Distinguishes decode/transport/storage
// failures; anything else crosses the anyhow boundary at the call site.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("unknown command byte: {0:#04x}")]
    UnknownCommand(u8),

    #[error("implausible length field: {0}")]
    ImplausibleLength(u32),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bind to {addr} failed: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("call timed out waiting for echo {echo}")]
    CallTimeout { echo: String },

    #[error("event bus closed")]
    BusClosed,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("other: {0}")]
    Other(String),
}
