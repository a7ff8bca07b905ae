//! sockshim - poll-based sockets over a callback-driven vendor TCP stack.
//!
//! Some embedded TCP/IP stacks are purely event-driven: the application
//! registers callbacks and the stack pushes connect/disconnect/sent/received
//! notifications whenever it pleases. Higher-level socket libraries tend to
//! want the opposite: a synchronous surface they can poll from a single
//! control loop (`create`, `accept`, `send`, `recv`, `close`) that never
//! blocks and never calls back.
//!
//! This crate is the adapter between the two. It owns a fixed-capacity table
//! of socket slots, a per-socket lifecycle state machine, and the buffers
//! that bridge push-style stack events into pull-style consumer calls.
//!
//! # Quick Start
//!
//! ```ignore
//! use sockshim::{SocketDriver, SocketTarget, SendStatus, RecvStatus, StackEvent};
//!
//! let mut driver = SocketDriver::new(stack);
//!
//! // Outbound connection
//! let id = driver.create_socket(SocketTarget::Addr("10.0.0.1".parse()?), 80)?;
//!
//! loop {
//!     // The vendor stack delivers events between any two poll calls;
//!     // the integration glue forwards them here.
//!     for event in glue.pending_events() {
//!         driver.handle_event(event)?;
//!     }
//!
//!     match driver.send(id, b"GET /\n")? {
//!         SendStatus::Sent(n) => break,
//!         SendStatus::Busy => continue,        // retry next tick
//!         SendStatus::Closed => {
//!             driver.close_socket(id)?;        // reclaim the slot
//!             return Err(...);
//!         }
//!     }
//! }
//! ```
//!
//! # Design
//!
//! - **Single apply point**: both producers of state transitions - the poll
//!   calls above and [`SocketDriver::handle_event`] - require `&mut` access,
//!   so their interleaving is serialized by construction.
//! - **Stale handles are harmless**: a [`SocketId`] encodes a slot index plus
//!   a generation counter. A late stack event for a released socket fails the
//!   generation check and is dropped, never misattributed.
//! - **No blocking, no waiting**: every call returns immediately. "Not ready"
//!   is a status ([`SendStatus::Busy`], [`RecvStatus::Pending`]), not an
//!   error; the caller's retry loop is the only wait mechanism.
//! - **Asymmetric teardown**: a locally-initiated close frees the slot as
//!   soon as the stack confirms the disconnect. A remote-initiated close
//!   parks the socket in [`SocketState::Closed`] until the caller observes
//!   the end-of-stream status and closes it explicitly.

mod buffer;
mod driver;
mod error;
mod stack;
mod state;
mod table;
mod types;

pub use buffer::{RxBuffer, TxSlot};
pub use driver::{SocketDriver, DEFAULT_CAPACITY};
pub use error::Error;
pub use stack::{stack_error_to_str, Connection, StackEvent, StackStatus, VendorStack};
pub use state::SocketState;
pub use table::{Fault, Socket, SocketTable};
pub use types::{RecvStatus, ResolveToken, Role, SendStatus, SocketId, SocketTarget};
