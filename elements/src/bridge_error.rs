// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::io::ErrorKind;

use thiserror::Error;

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Failures seen while talking to the mount or to a Stellarium client.
#[derive(Error, Debug)]
pub enum BridgeError {
    // A read exceeded its time bound.
    #[error("Transport timeout: {0}")]
    TransportTimeout(String),

    // The mount did not answer the initialization query with its ready
    // marker.
    #[error("Mount handshake failed: {0}")]
    HandshakeFailed(String),

    // Fewer bytes than a full frame arrived before the read ended.
    #[error("Malformed frame: got {received} of {expected} bytes")]
    MalformedFrame { received: usize, expected: usize },

    // Peer went away (EOF, reset, broken pipe).
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    // Serial port or listening socket could not be opened.
    #[error("Port unavailable: {0}")]
    PortUnavailable(String),

    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl BridgeError {
    /// Classifies an I/O error by kind. `context` names the operation that
    /// failed and ends up in the message.
    pub fn from_io(context: &str, e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                Self::TransportTimeout(format!("{}: {}", context, e))
            }
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => {
                Self::ConnectionClosed(format!("{}: {}", context, e))
            }
            _ => Self::Io(e),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        Self::from_io("I/O", e)
    }
}
