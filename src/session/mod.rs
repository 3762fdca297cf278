mod message_counts;
mod report;
#[allow(clippy::module_inception)]
mod session;
mod timers;

use std::convert::From;
use std::error;
use std::fmt;
use std::io;

pub use message_counts::MessageCounts;
pub use report::LspReport;
pub use session::Session;

use crate::pcep::PcepError;

/// Lifecycle events the controller watches for
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// First keepalive after the OPEN exchange, sent once per session
    Ready,
    Closed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    OpenSent,
    Up,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            SessionState::Idle => "Idle",
            SessionState::OpenSent => "OpenSent",
            SessionState::Up => "Up",
            SessionState::Closed => "Closed",
        };
        write!(f, "{}", word)
    }
}

/// Locally configured timers (seconds)
///
/// `keepalive` and `dead_timer` are advertised in our OPEN.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionTimers {
    pub keepalive: u8,
    pub dead_timer: u8,
    /// Longest a single outgoing message may wait on the peer
    pub write_timeout: u8,
}

impl Default for SessionTimers {
    fn default() -> Self {
        Self {
            keepalive: 30,
            dead_timer: 120,
            write_timeout: 10,
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// No message from the peer within the dead timer. [interval]
    DeadTimerExpired(u8),
    /// Peer stopped reading, a write made no progress. [interval]
    WriteTimeout(u8),
    /// Session is not up (or already closed)
    NotConnected,
    /// Message could not be encoded or the stream could not be framed. [reason]
    Codec(String),
    /// Something happened in transport. [reason]
    TransportError(String),
    /// Some other issue happened. [reason]
    Other(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Session Error: ")?;
        use SessionError::*;
        match self {
            DeadTimerExpired(d) => write!(f, "Dead timer expired after {} seconds", d)?,
            WriteTimeout(d) => write!(f, "Write timed out after {} seconds", d)?,
            NotConnected => write!(f, "Session is not up")?,
            Codec(r) => write!(f, "Codec error [{}]", r)?,
            TransportError(r) => write!(f, "Transport error [{}]", r)?,
            Other(r) => write!(f, "{}", r)?,
        }
        Ok(())
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::TransportError(error.to_string())
    }
}

impl From<PcepError> for SessionError {
    fn from(error: PcepError) -> Self {
        match error {
            PcepError::Io(reason) => SessionError::TransportError(reason),
            other => SessionError::Codec(other.to_string()),
        }
    }
}

impl error::Error for SessionError {}
