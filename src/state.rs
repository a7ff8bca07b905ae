//! Per-socket lifecycle state machine.
//!
//! Every socket slot is in exactly one of these states, and every mutation -
//! whether it originates from a poll call or a vendor stack event - is gated
//! on the current state. The trickiest part of the lifecycle is closing: a
//! locally-initiated close issues a teardown request and waits in
//! `Disconnecting` for the stack's confirmation, at which point the slot is
//! freed outright. A remote-initiated close instead parks the socket in
//! `Closed` (or `Error` after a reset) until the caller observes the
//! end-of-stream status from `send`/`recv` and acknowledges with an explicit
//! close. The adapter never auto-releases a socket the caller has not
//! acknowledged.

use std::fmt;

/// The lifecycle states of a socket slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// Free slot, not bound to any socket.
    Unused,
    /// New inbound connection the caller has not accepted yet.
    UnacceptedInbound,
    /// Hostname resolution outstanding; happens before `Connecting`.
    ResolvingAddress,
    /// Outbound connect in flight, awaiting the stack's confirmation.
    Connecting,
    /// Connected with no transmit in flight. A listening server socket is
    /// also "idle": it never transmits.
    Idle,
    /// A send was handed to the stack, awaiting the sent acknowledgment.
    Transmitting,
    /// Local close issued, awaiting the stack's disconnect confirmation.
    Disconnecting,
    /// Stack-side connection gone; awaiting the caller's close.
    Closed,
    /// Fault recorded; awaiting the caller's close.
    Error,
}

impl SocketState {
    /// Terminal for the caller: the stack-side connection is gone and only
    /// an explicit close will return the slot to `Unused`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SocketState::Closed | SocketState::Error)
    }

    /// A teardown is already underway or complete; `close` must not issue
    /// another stack request from here.
    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            SocketState::Disconnecting | SocketState::Closed | SocketState::Error
        )
    }

    /// Whether a `send` may start a transmission from this state.
    pub fn can_send(&self) -> bool {
        matches!(self, SocketState::Idle)
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketState::Unused => "unused",
            SocketState::UnacceptedInbound => "unaccepted",
            SocketState::ResolvingAddress => "resolving",
            SocketState::Connecting => "connecting",
            SocketState::Idle => "idle",
            SocketState::Transmitting => "transmitting",
            SocketState::Disconnecting => "disconnecting",
            SocketState::Closed => "closed",
            SocketState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SocketState::Closed.is_terminal());
        assert!(SocketState::Error.is_terminal());
        assert!(!SocketState::Idle.is_terminal());
        assert!(!SocketState::Disconnecting.is_terminal());
        assert!(!SocketState::Unused.is_terminal());
    }

    #[test]
    fn test_closing_states() {
        assert!(SocketState::Disconnecting.is_closing());
        assert!(SocketState::Closed.is_closing());
        assert!(SocketState::Error.is_closing());
        assert!(!SocketState::Transmitting.is_closing());
        assert!(!SocketState::ResolvingAddress.is_closing());
    }

    #[test]
    fn test_only_idle_can_send() {
        assert!(SocketState::Idle.can_send());
        assert!(!SocketState::Transmitting.can_send());
        assert!(!SocketState::Connecting.can_send());
        assert!(!SocketState::UnacceptedInbound.can_send());
        assert!(!SocketState::Closed.can_send());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(format!("{}", SocketState::Unused), "unused");
        assert_eq!(format!("{}", SocketState::UnacceptedInbound), "unaccepted");
        assert_eq!(format!("{}", SocketState::ResolvingAddress), "resolving");
        assert_eq!(format!("{}", SocketState::Disconnecting), "disconnecting");
        assert_eq!(format!("{}", SocketState::Transmitting), "transmitting");
    }
}
