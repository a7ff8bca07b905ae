//! Fixed-capacity socket table.
//!
//! The table is an arena of socket slots over a [`slab::Slab`], capped at a
//! configured capacity. Slot identity is a [`SocketId`] carrying the slot
//! index plus a generation counter assigned at allocation; lookups validate
//! the generation so that an id held across release and reuse of its slot
//! (a late stack callback, a buggy caller) fails cleanly instead of
//! addressing a different socket.

use crate::buffer::{RxBuffer, TxSlot};
use crate::error::Error;
use crate::stack::Connection;
use crate::state::SocketState;
use crate::types::{Role, SocketId};
use slab::Slab;

/// A recorded transport fault: low-level code plus a message. Set once per
/// fault and cleared only when the slot is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

/// One socket slot: lifecycle state, role, the vendor connection mirror,
/// and the two buffers.
#[derive(Debug, PartialEq)]
pub struct Socket {
    /// Full id (slot + generation) for the current occupancy.
    pub id: SocketId,
    pub state: SocketState,
    /// How the socket entered its connection; fixed once set.
    pub role: Option<Role>,
    /// The vendor connection handle. For inbound sockets the vendor retains
    /// allocation responsibility; we only ever drop our mirror.
    pub conn: Option<Connection>,
    /// The single in-flight transmit copy.
    pub tx: TxSlot,
    /// Unread inbound data.
    pub rx: RxBuffer,
    /// Recorded fault, if any.
    pub fault: Option<Fault>,
}

impl Socket {
    fn new(id: SocketId) -> Self {
        Self {
            id,
            state: SocketState::Unused,
            role: None,
            conn: None,
            tx: TxSlot::new(),
            rx: RxBuffer::new(),
            fault: None,
        }
    }

    /// Record a fault and move to the `Error` state. The first fault wins;
    /// later ones only log-worthy, never overwrite.
    pub fn set_fault(&mut self, message: impl Into<String>, code: i32) {
        self.state = SocketState::Error;
        if self.fault.is_none() {
            self.fault = Some(Fault {
                code,
                message: message.into(),
            });
        }
    }

    /// Drop the connection mirror. For connections the adapter allocated
    /// this releases them; for inbound connections the vendor stack owns
    /// the real object and we only forget our reference.
    pub fn release_connection(&mut self) {
        self.conn = None;
    }

    /// The listening port, for server and inbound sockets.
    pub fn listen_port(&self) -> Option<u16> {
        match self.role {
            Some(Role::Server { listen_port }) | Some(Role::Inbound { listen_port }) => {
                Some(listen_port)
            }
            _ => None,
        }
    }

    /// Whether this socket is a listening server socket.
    pub fn is_server(&self) -> bool {
        matches!(self.role, Some(Role::Server { .. }))
    }
}

/// Fixed-capacity arena of socket slots.
pub struct SocketTable {
    slots: Slab<Socket>,
    capacity: usize,
    /// Generation counter for socket ids, bumped on every allocation.
    next_generation: u32,
}

impl SocketTable {
    /// Create a table with the given maximum number of live sockets.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
            capacity,
            next_generation: 0,
        }
    }

    /// Number of live (non-free) slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check whether no sockets are live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The configured maximum number of live sockets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim a free slot. Fails explicitly with [`Error::TableFull`] when
    /// the table is at capacity.
    pub fn allocate(&mut self) -> Result<SocketId, Error> {
        if self.slots.len() >= self.capacity {
            return Err(Error::TableFull);
        }
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let entry = self.slots.vacant_entry();
        let id = SocketId::with_generation(entry.key(), generation);
        entry.insert(Socket::new(id));
        Ok(id)
    }

    /// Look up a socket, validating the id's generation.
    pub fn get(&self, id: SocketId) -> Option<&Socket> {
        self.slots
            .get(id.slot())
            .filter(|s| s.id.generation() == id.generation())
    }

    /// Mutable lookup, validating the id's generation.
    pub fn get_mut(&mut self, id: SocketId) -> Option<&mut Socket> {
        self.slots
            .get_mut(id.slot())
            .filter(|s| s.id.generation() == id.generation())
    }

    /// Mutable lookup that treats an unknown or stale id as a caller error.
    pub fn lookup_mut(&mut self, id: SocketId) -> Result<&mut Socket, Error> {
        self.get_mut(id).ok_or(Error::UnknownSocket)
    }

    /// Lookup that treats an unknown or stale id as a caller error.
    pub fn lookup(&self, id: SocketId) -> Result<&Socket, Error> {
        self.get(id).ok_or(Error::UnknownSocket)
    }

    /// Return a slot to the free pool. The connection handle must already
    /// be released; any remaining buffer contents are dropped here.
    pub fn release(&mut self, id: SocketId) -> bool {
        match self.get(id) {
            Some(socket) => debug_assert!(socket.conn.is_none()),
            None => return false,
        }
        self.slots.try_remove(id.slot()).is_some()
    }

    /// Iterate over all live sockets.
    pub fn iter(&self) -> impl Iterator<Item = &Socket> {
        self.slots.iter().map(|(_, s)| s)
    }

    /// Iterate mutably over all live sockets.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Socket> {
        self.slots.iter_mut().map(|(_, s)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_until_full() {
        let mut table = SocketTable::new(3);
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        let c = table.allocate().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.allocate(), Err(Error::TableFull));

        // ids are pairwise distinct
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_release_frees_capacity() {
        let mut table = SocketTable::new(1);
        let id = table.allocate().unwrap();
        assert_eq!(table.allocate(), Err(Error::TableFull));
        assert!(table.release(id));
        assert!(table.allocate().is_ok());
    }

    #[test]
    fn test_stale_id_fails_lookup_after_reuse() {
        let mut table = SocketTable::new(1);
        let old = table.allocate().unwrap();
        table.release(old);
        let new = table.allocate().unwrap();

        // Same slot, different generation
        assert_eq!(old.slot(), new.slot());
        assert!(table.get(old).is_none());
        assert!(table.get(new).is_some());
        assert_eq!(table.lookup_mut(old), Err(Error::UnknownSocket));
    }

    #[test]
    fn test_release_stale_id_is_noop() {
        let mut table = SocketTable::new(1);
        let old = table.allocate().unwrap();
        table.release(old);
        let new = table.allocate().unwrap();
        assert!(!table.release(old));
        assert!(table.get(new).is_some());
    }

    #[test]
    fn test_live_ids_pairwise_distinct_across_churn() {
        let mut table = SocketTable::new(4);
        let mut live = Vec::new();
        for round in 0..5 {
            if round % 2 == 1 {
                let id = live.remove(0);
                table.release(id);
            }
            while let Ok(id) = table.allocate() {
                live.push(id);
            }
            for i in 0..live.len() {
                for j in (i + 1)..live.len() {
                    assert_ne!(live[i], live[j]);
                }
            }
        }
    }

    #[test]
    fn test_new_socket_is_clean() {
        let mut table = SocketTable::new(2);
        let id = table.allocate().unwrap();
        let socket = table.get(id).unwrap();
        assert_eq!(socket.state, SocketState::Unused);
        assert!(socket.role.is_none());
        assert!(socket.conn.is_none());
        assert!(!socket.tx.is_inflight());
        assert!(socket.rx.is_empty());
        assert!(socket.fault.is_none());
    }

    #[test]
    fn test_fault_set_once() {
        let mut table = SocketTable::new(1);
        let id = table.allocate().unwrap();
        let socket = table.get_mut(id).unwrap();
        socket.set_fault("connect error", -9);
        socket.set_fault("late event", -3);
        assert_eq!(socket.state, SocketState::Error);
        let fault = socket.fault.as_ref().unwrap();
        assert_eq!(fault.code, -9);
        assert_eq!(fault.message, "connect error");
    }
}
