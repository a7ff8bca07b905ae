//! Core types for the socket adapter.

use std::fmt;
use std::net::Ipv4Addr;

/// Opaque socket identifier.
///
/// Returned when a socket is created or accepted, and used to identify the
/// socket in every subsequent operation.
///
/// Internally encodes both a slot index and a generation counter so that a
/// stale id (one held across the release and reuse of its slot) fails lookup
/// instead of addressing the wrong socket. This is what makes late vendor
/// callbacks for an already-released socket safe to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketId(pub(crate) u64);

impl SocketId {
    /// Create a socket id from a raw slot value (generation 0).
    ///
    /// Primarily useful for testing stale-handle behavior.
    #[inline]
    pub fn new(slot: usize) -> Self {
        Self(slot as u64)
    }

    /// Create a socket id with both slot and generation.
    #[inline]
    pub(crate) fn with_generation(slot: usize, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (slot as u64 & 0xFFFF_FFFF))
    }

    /// Get the slot index from this id, suitable for indexing the table.
    #[inline]
    pub fn slot(&self) -> usize {
        (self.0 & 0xFFFF_FFFF) as usize
    }

    /// Get the generation counter from this id.
    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Get the raw u64 value of the id.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.slot(), self.generation())
    }
}

/// How a socket entered its connection.
///
/// Fixed once set; determines which teardown verb applies (`delete` for
/// servers, `disconnect` for everything else) and whether the vendor stack
/// retains allocation responsibility for the connection object (inbound).
/// Each variant carries only the fields relevant to that role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Listening socket. A server socket never transmits.
    Server {
        /// The local port this socket listens on.
        listen_port: u16,
    },
    /// Outbound client connection.
    Outbound {
        /// Hostname awaiting asynchronous resolution, if any.
        pending_host: Option<String>,
    },
    /// Inbound connection accepted by the stack on behalf of a server.
    Inbound {
        /// The listening port this connection arrived on.
        listen_port: u16,
    },
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server { .. } => write!(f, "server"),
            Role::Outbound { .. } => write!(f, "outbound"),
            Role::Inbound { .. } => write!(f, "inbound"),
        }
    }
}

/// Token returned by [`resolve_addr`](crate::SocketDriver::resolve_addr) and
/// threaded through to the subsequent create call.
///
/// Carrying the hostname in the token makes the resolve/create correlation
/// explicit instead of relying on call ordering against hidden state, and
/// permits more than one resolution to be pending at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveToken {
    pub(crate) hostname: String,
}

impl ResolveToken {
    /// The hostname this token will resolve.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// What a new socket should connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketTarget {
    /// Listen on the given port ("act as server").
    Server,
    /// Connect out to a known address.
    Addr(Ipv4Addr),
    /// Resolve a hostname first, then connect out.
    Resolve(ResolveToken),
}

/// Outcome of a [`send`](crate::SocketDriver::send) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// All bytes were accepted for transmission.
    Sent(usize),
    /// Not ready: a transmit is already in flight or the socket is not yet
    /// connected. Nothing was sent, nothing changed; retry later.
    ///
    /// This is the adapter's flow-control signal, not an error.
    Busy,
    /// The connection is closed or in error; nothing was sent. The caller
    /// should close the socket to reclaim it.
    Closed,
}

/// Outcome of a [`recv`](crate::SocketDriver::recv) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvStatus {
    /// Bytes were copied out of the receive buffer. May be fewer than the
    /// caller's capacity; that does not mean end-of-stream.
    Data(usize),
    /// No data buffered right now, connection still viable.
    Pending,
    /// No data buffered and the connection is closed or in error. This is
    /// how a caller discovers a remote-initiated close.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_id_slot_and_generation() {
        let id = SocketId::with_generation(7, 42);
        assert_eq!(id.slot(), 7);
        assert_eq!(id.generation(), 42);
    }

    #[test]
    fn test_socket_id_new_is_generation_zero() {
        let id = SocketId::new(3);
        assert_eq!(id.slot(), 3);
        assert_eq!(id.generation(), 0);
        assert_eq!(id.as_u64(), 3);
    }

    #[test]
    fn test_socket_id_generation_distinguishes_reuse() {
        let old = SocketId::with_generation(0, 1);
        let new = SocketId::with_generation(0, 2);
        assert_eq!(old.slot(), new.slot());
        assert_ne!(old, new);
    }

    #[test]
    fn test_socket_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(SocketId::with_generation(1, 0));
        set.insert(SocketId::with_generation(1, 1));
        set.insert(SocketId::with_generation(1, 0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_socket_id_display() {
        let id = SocketId::with_generation(4, 9);
        assert_eq!(format!("{}", id), "4.9");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(format!("{}", Role::Server { listen_port: 80 }), "server");
        assert_eq!(
            format!("{}", Role::Outbound { pending_host: None }),
            "outbound"
        );
        assert_eq!(format!("{}", Role::Inbound { listen_port: 80 }), "inbound");
    }

    #[test]
    fn test_resolve_token_hostname() {
        let token = ResolveToken {
            hostname: "example.com".into(),
        };
        assert_eq!(token.hostname(), "example.com");
    }
}
