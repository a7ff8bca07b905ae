//! The socket driver: poll API on one side, stack event adapter on the other.
//!
//! Both faces mutate the same socket table and meet in the per-socket state
//! machine. Poll calls come from the host's control loop; stack events come
//! from the vendor's callbacks. They are never concurrent - everything takes
//! `&mut self`, which makes the driver the single serialized apply point -
//! but an event can arrive between any two poll calls, so every handler
//! validates state before touching anything.
//!
//! No call blocks. "Not yet" is a status the caller retries on, and a fault
//! never propagates past its socket: the caller discovers it through the
//! send/recv sentinels or [`check_error`](SocketDriver::check_error) and
//! reclaims the slot with an explicit close.

use crate::error::Error;
use crate::stack::{stack_error_to_str, Connection, StackEvent, VendorStack};
use crate::state::SocketState;
use crate::table::{Fault, Socket, SocketTable};
use crate::types::{RecvStatus, ResolveToken, Role, SendStatus, SocketId, SocketTarget};
use log::{debug, trace, warn};

/// Default maximum number of concurrently open sockets.
///
/// Small on purpose: the vendor stacks this adapter targets support on the
/// order of ten concurrent connections.
pub const DEFAULT_CAPACITY: usize = 10;

/// Adapter between a callback-driven vendor TCP stack and a poll-based
/// socket surface.
///
/// See the crate-level docs for the usage pattern.
pub struct SocketDriver<S> {
    stack: S,
    table: SocketTable,
}

impl<S: VendorStack> SocketDriver<S> {
    /// Create a driver with the default socket capacity.
    pub fn new(stack: S) -> Self {
        Self::with_capacity(stack, DEFAULT_CAPACITY)
    }

    /// Create a driver with a custom socket capacity.
    pub fn with_capacity(stack: S, capacity: usize) -> Self {
        Self {
            stack,
            table: SocketTable::new(capacity),
        }
    }

    /// Borrow the vendor stack.
    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Mutably borrow the vendor stack.
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Number of live sockets.
    pub fn socket_count(&self) -> usize {
        self.table.len()
    }

    /// Maximum number of live sockets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// The state of a socket, if the id is live.
    pub fn socket_state(&self, id: SocketId) -> Option<SocketState> {
        self.table.get(id).map(|s| s.state)
    }

    // === Poll API ===

    /// Start resolving a hostname. The returned token must be passed to
    /// [`create_socket`](Self::create_socket) with
    /// [`SocketTarget::Resolve`]; resolution is not actually requested from
    /// the stack until the socket exists to own it.
    pub fn resolve_addr(&mut self, hostname: &str) -> ResolveToken {
        ResolveToken {
            hostname: hostname.to_owned(),
        }
    }

    /// Create a socket.
    ///
    /// - [`SocketTarget::Server`]: listen on `port`. A listening socket is
    ///   immediately `Idle`; it never transmits.
    /// - [`SocketTarget::Addr`]: connect out to `addr:port`.
    /// - [`SocketTarget::Resolve`]: resolve the token's hostname, then
    ///   connect out to `resolved:port`.
    ///
    /// A failed listen/connect request still returns the socket id with the
    /// fault recorded; the caller observes it via
    /// [`check_error`](Self::check_error) or the send/recv sentinels and
    /// closes the socket to reclaim it. Fails with [`Error::TableFull`] when
    /// all slots are live.
    pub fn create_socket(&mut self, target: SocketTarget, port: u16) -> Result<SocketId, Error> {
        let id = self.table.allocate()?;

        match target {
            SocketTarget::Server => {
                let mut conn = Connection::server(port);
                conn.backref = Some(id);

                let socket = self.table.lookup_mut(id)?;
                socket.role = Some(Role::Server { listen_port: port });
                socket.state = SocketState::Idle;
                let conn = socket.conn.insert(conn);

                let rc = self.stack.listen(conn);
                if rc != 0 {
                    debug!("socket {}: listen on port {} refused rc={}", id, port, rc);
                    socket.set_fault("listen error", rc as i32);
                } else {
                    debug!("socket {}: listening on port {}", id, port);
                }
            }
            SocketTarget::Addr(addr) => {
                let mut conn = Connection::outbound(Some(addr), port);
                conn.backref = Some(id);

                let socket = self.table.lookup_mut(id)?;
                socket.role = Some(Role::Outbound { pending_host: None });
                socket.conn = Some(conn);
                debug!("socket {}: connecting to {}:{}", id, addr, port);
                start_connect(&mut self.stack, socket);
            }
            SocketTarget::Resolve(token) => {
                let mut conn = Connection::outbound(None, port);
                conn.backref = Some(id);

                let socket = self.table.lookup_mut(id)?;
                socket.role = Some(Role::Outbound {
                    pending_host: Some(token.hostname.clone()),
                });
                socket.state = SocketState::ResolvingAddress;
                let conn = socket.conn.insert(conn);

                debug!("socket {}: resolving {}", id, token.hostname);
                let rc = self.stack.resolve(conn, &token.hostname);
                if rc != 0 {
                    debug!("socket {}: resolve request refused rc={}", id, rc);
                    socket.set_fault("resolve error", rc as i32);
                }
            }
        }

        Ok(id)
    }

    /// Poll a server socket for a pending inbound connection.
    ///
    /// Returns the accepted socket's id, now `Idle` and ready for use, or
    /// `None` when nothing is pending.
    pub fn accept(&mut self, server: SocketId) -> Result<Option<SocketId>, Error> {
        let socket = self.table.lookup(server)?;
        let port = match socket.role {
            Some(Role::Server { listen_port }) => listen_port,
            _ => return Err(Error::NotServer),
        };

        let pending = self.table.iter_mut().find(|s| {
            s.state == SocketState::UnacceptedInbound && s.listen_port() == Some(port)
        });

        Ok(pending.map(|s| {
            s.state = SocketState::Idle;
            debug!("socket {}: accepted on port {}", s.id, port);
            s.id
        }))
    }

    /// Send data on a socket.
    ///
    /// Either all of `data` is accepted or none of it: `Busy` signals
    /// backpressure (a transmit already in flight, or not connected yet)
    /// with no state change, and `Closed` signals the caller should close
    /// the socket. At most one transmit is outstanding per socket.
    pub fn send(&mut self, id: SocketId, data: &[u8]) -> Result<SendStatus, Error> {
        let socket = self.table.lookup_mut(id)?;

        if socket.is_server() {
            return Err(Error::InvalidState {
                op: "send",
                state: socket.state,
            });
        }
        if socket.state.is_terminal() {
            return Ok(SendStatus::Closed);
        }
        if !socket.state.can_send() {
            trace!("socket {}: send deferred in state {}", id, socket.state);
            return Ok(SendStatus::Busy);
        }
        if socket.tx.is_inflight() {
            // Idle with a transmit outstanding breaks the state machine
            return Err(Error::InvalidState {
                op: "send",
                state: socket.state,
            });
        }
        if data.is_empty() {
            return Ok(SendStatus::Sent(0));
        }

        let rc = match socket.conn.as_ref() {
            Some(conn) => self.stack.send(conn, data),
            None => {
                return Err(Error::InvalidState {
                    op: "send",
                    state: socket.state,
                })
            }
        };
        if rc != 0 {
            debug!("socket {}: send of {} bytes refused rc={}", id, data.len(), rc);
            socket.set_fault("send error", rc as i32);
            return Ok(SendStatus::Closed);
        }

        socket.tx.begin(data);
        socket.state = SocketState::Transmitting;
        trace!("socket {}: transmitting {} bytes", id, data.len());
        Ok(SendStatus::Sent(data.len()))
    }

    /// Receive buffered data from a socket.
    ///
    /// Copies up to `buf.len()` bytes out of the receive buffer. `Pending`
    /// means nothing is buffered but the connection is viable; `Closed`
    /// means nothing is buffered and the connection is gone - the only way
    /// a caller not blocked on send discovers a remote-initiated close.
    pub fn recv(&mut self, id: SocketId, buf: &mut [u8]) -> Result<RecvStatus, Error> {
        let socket = self.table.lookup_mut(id)?;

        if socket.rx.is_empty() {
            return Ok(if socket.state.is_terminal() {
                RecvStatus::Closed
            } else {
                RecvStatus::Pending
            });
        }

        let n = socket.rx.read_into(buf);
        trace!("socket {}: recv {} bytes, {} left", id, n, socket.rx.len());
        Ok(RecvStatus::Data(n))
    }

    /// Close a socket.
    ///
    /// Two situations land here: the caller closing a live socket, and the
    /// caller acknowledging a socket already `Closed`/`Error`ed from the
    /// stack side. The first issues a teardown request and waits in
    /// `Disconnecting` for the stack's confirmation; the second frees the
    /// slot immediately. Closing while a close is already in flight is a
    /// sequencing bug and fails with [`Error::InvalidState`].
    pub fn close_socket(&mut self, id: SocketId) -> Result<(), Error> {
        let socket = self.table.lookup_mut(id)?;

        match socket.state {
            SocketState::Disconnecting => Err(Error::InvalidState {
                op: "close",
                state: socket.state,
            }),
            SocketState::Closed | SocketState::Error => {
                // The stack side is already gone; this is the caller's
                // acknowledgment, so the slot can be freed.
                socket.release_connection();
                socket.rx.clear();
                debug!("socket {}: released", id);
                self.table.release(id);
                Ok(())
            }
            SocketState::ResolvingAddress => {
                // The resolver callback still references this socket; the
                // close is deferred and the caller must retry after the
                // resolution completes. Known limitation.
                warn!("socket {}: close ignored while resolving", id);
                Ok(())
            }
            _ => {
                let rc = match (socket.is_server(), socket.conn.as_ref()) {
                    (true, Some(conn)) => self.stack.delete(conn),
                    (false, Some(conn)) => self.stack.disconnect(conn),
                    (_, None) => 0,
                };
                if rc != 0 {
                    debug!("socket {}: teardown request refused rc={}", id, rc);
                    socket.set_fault("teardown error", rc as i32);
                }
                socket.state = SocketState::Disconnecting;
                debug!("socket {}: disconnecting", id);
                Ok(())
            }
        }
    }

    /// Whether a fault is recorded on the socket. Stale ids report `false`.
    pub fn check_error(&self, id: SocketId) -> bool {
        self.table.get(id).map(|s| s.fault.is_some()).unwrap_or(false)
    }

    /// Read back the recorded fault, if any.
    pub fn last_error(&self, id: SocketId) -> Option<&Fault> {
        self.table.get(id).and_then(|s| s.fault.as_ref())
    }

    // === Stack event adapter ===

    /// Apply one vendor stack event.
    ///
    /// Events for stale socket ids (a slot released before a late callback
    /// landed) are silently dropped - the generation check stands in for
    /// nulling a back-pointer. An event that is impossible in the socket's
    /// current state returns [`Error::UnexpectedEvent`] and leaves the
    /// socket untouched.
    pub fn handle_event(&mut self, event: StackEvent) -> Result<(), Error> {
        match event {
            StackEvent::InboundConnect { listen_port, mut conn } => {
                let id = match self.table.allocate() {
                    Ok(id) => id,
                    Err(_) => {
                        warn!(
                            "inbound connection on port {} refused: table full",
                            listen_port
                        );
                        self.stack.disconnect(&conn);
                        return Ok(());
                    }
                };
                conn.backref = Some(id);

                let socket = self.table.lookup_mut(id)?;
                socket.role = Some(Role::Inbound { listen_port });
                socket.conn = Some(conn);
                socket.state = SocketState::UnacceptedInbound;
                debug!("socket {}: inbound connection on port {}", id, listen_port);
                Ok(())
            }
            StackEvent::ConnectEstablished { socket: id } => {
                let Some(socket) = self.table.get_mut(id) else {
                    trace!("connect event for stale socket {}", id);
                    return Ok(());
                };
                if socket.state != SocketState::Connecting {
                    return Err(Error::UnexpectedEvent {
                        event: "connect",
                        state: socket.state,
                    });
                }
                socket.state = SocketState::Idle;
                debug!("socket {}: connected", id);
                Ok(())
            }
            StackEvent::Disconnected { socket: id } => {
                self.on_disconnected(id);
                Ok(())
            }
            StackEvent::Reset { socket: id, code } => {
                let Some(socket) = self.table.get(id) else {
                    trace!("reset event for stale socket {}", id);
                    return Ok(());
                };
                debug!(
                    "socket {}: reset, {} ({})",
                    id,
                    stack_error_to_str(code),
                    code
                );
                let was_disconnecting = socket.state == SocketState::Disconnecting;

                self.on_disconnected(id);

                // A locally-initiated close that raced the reset released
                // the slot above and must not be clobbered into Error.
                if !was_disconnecting {
                    if let Some(socket) = self.table.get_mut(id) {
                        socket.set_fault(stack_error_to_str(code), code);
                    }
                }
                Ok(())
            }
            StackEvent::Sent { socket: id } => {
                let Some(socket) = self.table.get_mut(id) else {
                    trace!("sent event for stale socket {}", id);
                    return Ok(());
                };
                match socket.state {
                    SocketState::Transmitting => {
                        socket.tx.complete();
                        socket.state = SocketState::Idle;
                        trace!("socket {}: transmit complete", id);
                        Ok(())
                    }
                    SocketState::Disconnecting => {
                        // A send that was in flight when the close was
                        // issued; release the buffer, the state stands.
                        socket.tx.complete();
                        Ok(())
                    }
                    state => Err(Error::UnexpectedEvent {
                        event: "sent",
                        state,
                    }),
                }
            }
            StackEvent::Received { socket: id, data } => {
                let Some(socket) = self.table.get_mut(id) else {
                    trace!("recv event for stale socket {}", id);
                    return Ok(());
                };
                trace!("socket {}: received {} bytes", id, data.len());
                socket.rx.push(&data);
                Ok(())
            }
            StackEvent::Resolved { socket: id, addr } => {
                let Some(socket) = self.table.get_mut(id) else {
                    trace!("resolve event for stale socket {}", id);
                    return Ok(());
                };
                if socket.state != SocketState::ResolvingAddress {
                    return Err(Error::UnexpectedEvent {
                        event: "resolved",
                        state: socket.state,
                    });
                }
                match addr {
                    Some(ip) => {
                        if let Some(conn) = socket.conn.as_mut() {
                            conn.remote_ip = Some(ip);
                        }
                        debug!("socket {}: resolved to {}", id, ip);
                        start_connect(&mut self.stack, socket);
                    }
                    None => {
                        debug!("socket {}: hostname not found", id);
                        socket.release_connection();
                        socket.set_fault("hostname not found", 1);
                    }
                }
                Ok(())
            }
        }
    }

    /// Common disconnect handling for both the confirmation of a local
    /// close and a remote-initiated close. The connection handle is
    /// released first in either case.
    fn on_disconnected(&mut self, id: SocketId) {
        let Some(socket) = self.table.get_mut(id) else {
            trace!("disconnect event for stale socket {}", id);
            return;
        };

        socket.release_connection();

        if socket.state == SocketState::Disconnecting {
            // Locally-initiated: the caller already knows this close is in
            // progress, so the slot goes straight back to the free pool.
            debug!("socket {}: disconnect confirmed, slot freed", id);
            socket.rx.clear();
            socket.tx.clear();
            self.table.release(id);
        } else {
            // Remote-initiated: park in Closed until the caller sees the
            // -1 sentinel from send/recv and acknowledges with a close.
            socket.tx.clear();
            socket.state = SocketState::Closed;
            debug!("socket {}: closed by remote", id);
        }
    }
}

/// Kick off (or re-enter, after resolution) the outbound connect sequence.
fn start_connect<S: VendorStack>(stack: &mut S, socket: &mut Socket) {
    socket.state = SocketState::Connecting;
    if let Some(Role::Outbound { pending_host }) = socket.role.as_mut() {
        *pending_host = None;
    }

    let rc = match socket.conn.as_ref() {
        Some(conn) => stack.connect(conn),
        None => return,
    };
    if rc != 0 {
        debug!("socket {}: connect request refused rc={}", socket.id, rc);
        socket.set_fault("connect error", rc as i32);
    }
}
