//! Connection lifecycle types

use std::fmt;

/// Where the connection is in its lifecycle
///
/// `Closed` is terminal and only reached through an explicit close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Short label for a working/offline indicator
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "offline",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "working",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Notifications from the connection task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A (re)connection succeeded; sent once per successful open
    Opened,
    /// One inbound text frame
    Message(String),
    /// An open connection dropped without being asked to
    Closed { reason: Option<String> },
    /// A connection attempt or the socket failed
    Error(String),
    /// Reconnection has failed `attempts` times in a row
    Degraded { attempts: u32 },
    /// A connection held up after `Degraded` was reported
    Recovered,
}
