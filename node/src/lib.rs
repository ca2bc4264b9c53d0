//! # Card Table Node
//!
//! One participant's process. A node is either the host of a table, a peer
//! seated at someone else's table, or idle; the `Supervisor` decides which
//! and routes every inbound message accordingly.
//!
//! ## Module Organization
//!
//! ### Supervisor Module (`supervisor`)
//! The session object: current role, connection registry, and dispatch of
//! transport events to the host authority or the peer replica.
//!
//! ### Network Module (`network`)
//! A TCP implementation of the transport contract: length-prefixed frames,
//! an identity handshake per stream, and one reader and one writer task per
//! connection.
//!
//! ### Config Module (`config`)
//! Command line options for the `card-node` binary.
//!
//! ## Event Flow
//!
//! ```text
//! socket -> reader task -> mpsc<TransportEvent> -> Supervisor::handle_event
//!        -> HostAuthority / PeerReplica -> ConnectionRegistry -> writer tasks
//! ```
//!
//! All state changes happen inside `Supervisor::handle_event` and the
//! host-side entry points, called from one loop. The transport tasks only
//! move bytes.

pub mod config;
pub mod network;
pub mod supervisor;

pub use supervisor::{seated_table, RoleKind, SessionNotice, Supervisor};
