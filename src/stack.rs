//! The boundary with the vendor TCP/IP stack.
//!
//! The vendor stack owns all actual protocol behavior. The adapter drives it
//! through a small set of requests ([`VendorStack`]) and receives its
//! asynchronous callbacks as [`StackEvent`]s. Events identify their socket by
//! the [`SocketId`] back-reference the adapter stored on the connection
//! object at registration time; because the id carries a generation counter,
//! a late event for a released socket simply fails lookup and is dropped.

use crate::types::SocketId;
use std::net::Ipv4Addr;

/// Status code returned by vendor stack requests. Zero means success; any
/// nonzero value is a transport error code recorded into the socket's fault.
pub type StackStatus = i8;

/// Adapter-side mirror of the vendor's opaque connection object.
///
/// For sockets the adapter creates (server and outbound), the adapter owns
/// this handle exclusively. For inbound-accepted sockets the vendor stack
/// retains allocation responsibility for its side of the connection; the
/// adapter only ever drops its mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Back-reference to the owning socket, stored on the connection object
    /// so events can be routed back. `None` until the adapter registers the
    /// connection with a slot.
    pub backref: Option<SocketId>,
    /// Local port (the listening port for server and inbound sockets).
    pub local_port: u16,
    /// Remote address; `None` while hostname resolution is outstanding.
    pub remote_ip: Option<Ipv4Addr>,
    /// Remote port (0 for server sockets).
    pub remote_port: u16,
    /// Nagle disabled on this connection. Set at creation; interactive
    /// traffic does not want the extra delay.
    pub no_delay: bool,
}

impl Connection {
    /// Build the connection mirror for an outbound socket. The remote
    /// address may still be unresolved.
    pub fn outbound(remote_ip: Option<Ipv4Addr>, remote_port: u16) -> Self {
        Self {
            backref: None,
            local_port: 0,
            remote_ip,
            remote_port,
            no_delay: true,
        }
    }

    /// Build the connection mirror for a listening server socket.
    pub fn server(listen_port: u16) -> Self {
        Self {
            backref: None,
            local_port: listen_port,
            remote_ip: None,
            remote_port: 0,
            no_delay: true,
        }
    }

    /// Build the mirror for a connection the vendor stack accepted on a
    /// listening port. Used by stacks and test harnesses to construct
    /// [`StackEvent::InboundConnect`].
    pub fn inbound(listen_port: u16, remote_ip: Ipv4Addr, remote_port: u16) -> Self {
        Self {
            backref: None,
            local_port: listen_port,
            remote_ip: Some(remote_ip),
            remote_port,
            no_delay: true,
        }
    }
}

/// Requests the adapter issues to the vendor stack.
///
/// All requests are asynchronous: a zero status only means the stack
/// accepted the request, and the outcome arrives later as a [`StackEvent`].
pub trait VendorStack {
    /// Start listening on the connection's local port.
    fn listen(&mut self, conn: &Connection) -> StackStatus;

    /// Start an outbound connect to the connection's remote address.
    fn connect(&mut self, conn: &Connection) -> StackStatus;

    /// Request teardown of an established (non-server) connection. The
    /// stack confirms with [`StackEvent::Disconnected`].
    fn disconnect(&mut self, conn: &Connection) -> StackStatus;

    /// Tear down a listening server socket. Distinct verb from
    /// [`disconnect`](VendorStack::disconnect); the stack confirms with
    /// [`StackEvent::Disconnected`].
    fn delete(&mut self, conn: &Connection) -> StackStatus;

    /// Hand one buffer of data to the stack for transmission. Completion
    /// arrives as [`StackEvent::Sent`].
    fn send(&mut self, conn: &Connection, data: &[u8]) -> StackStatus;

    /// Start an asynchronous hostname resolution for this connection.
    /// Completion arrives as [`StackEvent::Resolved`].
    fn resolve(&mut self, conn: &Connection, hostname: &str) -> StackStatus;
}

/// Asynchronous notifications from the vendor stack.
///
/// These can arrive between any two poll calls; they are never concurrent
/// with a poll call, but their interleaving is not under the adapter's
/// control.
#[derive(Debug)]
pub enum StackEvent {
    /// A peer connected to a listening port. The stack allocated the
    /// connection object; the adapter binds it to a fresh slot (or refuses
    /// it when the table is full).
    InboundConnect {
        /// The listening port the connection arrived on.
        listen_port: u16,
        /// The vendor-allocated connection, back-reference not yet set.
        conn: Connection,
    },
    /// An outbound connect completed successfully.
    ConnectEstablished { socket: SocketId },
    /// The connection is gone, whether we asked for it or the peer did.
    Disconnected { socket: SocketId },
    /// The connection was reset or errored out. Treated as a disconnect
    /// with an attached fault.
    Reset { socket: SocketId, code: i32 },
    /// The in-flight transmit buffer has been sent and can be released.
    Sent { socket: SocketId },
    /// Data arrived on the connection.
    Received { socket: SocketId, data: Vec<u8> },
    /// Hostname resolution finished. `addr` is `None` when the name could
    /// not be resolved.
    Resolved {
        socket: SocketId,
        addr: Option<Ipv4Addr>,
    },
}

/// Map a vendor transport error code to a human-readable message.
pub fn stack_error_to_str(code: i32) -> &'static str {
    match code {
        -1 => "out of memory",
        -3 => "timeout",
        -4 => "routing problem",
        -5 => "operation in progress",
        -8 => "connection aborted",
        -9 => "connection reset",
        -10 => "connection closed",
        -11 => "not connected",
        -12 => "illegal argument",
        -15 => "already connected",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_connection() {
        let conn = Connection::outbound(Some(Ipv4Addr::new(10, 0, 0, 1)), 80);
        assert_eq!(conn.remote_port, 80);
        assert_eq!(conn.local_port, 0);
        assert!(conn.backref.is_none());
        assert!(conn.no_delay);
    }

    #[test]
    fn test_server_connection() {
        let conn = Connection::server(8080);
        assert_eq!(conn.local_port, 8080);
        assert_eq!(conn.remote_port, 0);
        assert!(conn.remote_ip.is_none());
    }

    #[test]
    fn test_inbound_connection() {
        let conn = Connection::inbound(80, Ipv4Addr::new(192, 168, 1, 5), 49152);
        assert_eq!(conn.local_port, 80);
        assert_eq!(conn.remote_port, 49152);
        assert_eq!(conn.remote_ip, Some(Ipv4Addr::new(192, 168, 1, 5)));
    }

    #[test]
    fn test_stack_error_strings() {
        assert_eq!(stack_error_to_str(-9), "connection reset");
        assert_eq!(stack_error_to_str(-3), "timeout");
        assert_eq!(stack_error_to_str(1234), "unknown error");
    }
}
