use crate::state::SocketState;
use std::fmt;

/// Errors returned by the socket adapter.
///
/// These indicate caller bugs or resource exhaustion, never ordinary network
/// conditions: flow control and remote closes surface as
/// [`SendStatus`](crate::SendStatus) / [`RecvStatus`](crate::RecvStatus)
/// variants, and transport faults are recorded on the socket and read back
/// through [`last_error`](crate::SocketDriver::last_error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No free socket slot available.
    TableFull,
    /// The socket id does not name a live socket (unknown slot, or a stale
    /// generation after the slot was released and reused).
    UnknownSocket,
    /// An accept was issued against a socket that is not a server.
    NotServer,
    /// The operation is not legal in the socket's current state. This marks
    /// a caller sequencing bug, not a retryable condition.
    InvalidState {
        op: &'static str,
        state: SocketState,
    },
    /// A stack event arrived for a socket whose state should make that
    /// event impossible. State is left untouched.
    UnexpectedEvent {
        event: &'static str,
        state: SocketState,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableFull => write!(f, "no free socket slots"),
            Error::UnknownSocket => write!(f, "unknown or stale socket id"),
            Error::NotServer => write!(f, "socket is not a server"),
            Error::InvalidState { op, state } => {
                write!(f, "{} not permitted in state {}", op, state)
            }
            Error::UnexpectedEvent { event, state } => {
                write!(f, "unexpected {} event in state {}", event, state)
            }
        }
    }
}

impl std::error::Error for Error {}
