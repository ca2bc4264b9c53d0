//! # Host Library
//!
//! This library provides the authoritative side of the card table. While the
//! local process hosts a room it owns the canonical `GameState`, decides who
//! gets a seat, and pushes every accepted change to the connected peers.
//!
//! ## Core Responsibilities
//!
//! ### Seat Management
//! Join requests are accepted in arrival order until the table's capacity is
//! reached. Each new player gets the next ordinal id; the joiner receives a
//! `Welcome` carrying the full state and everyone else a `GameStateUpdate`
//! with the identical snapshot. Requests beyond capacity receive `GameFull`
//! and leave the state untouched.
//!
//! ### Departure Handling
//! When the transport reports a closed channel, every seat bound to that peer
//! is dropped, a notice is appended to the turn history and the remaining
//! peers are updated. Seats are not held for reconnection.
//!
//! ### Rule-Driven Updates
//! The game rules live outside this crate. They change the table through
//! `HostAuthority::mutate_and_broadcast`, the only path by which host-side
//! changes reach peers. Changes that would overfill the table, rewrite the
//! turn history or move the room are refused.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! There is exactly one writer per room. Peers never mutate shared state; they
//! replace their copy with whatever the host last sent. Convergence therefore
//! only depends on every open channel eventually delivering the host's latest
//! snapshot.
//!
//! ### Explicit Registry
//! The authority does not own the connections. The caller passes the
//! `ConnectionRegistry` into each operation, so the session object that owns
//! both stays the single place where state lives.
//!
//! ## Module Organization
//!
//! ### Authority Module (`authority`)
//! The host state machine: join, departure, mutation, re-broadcast.
//!
//! ### Room Code Module (`room_code`)
//! Short human-shareable room identifiers.
//!
//! ## Usage Example
//!
//! ```rust
//! use host::authority::{HostAuthority, JoinOutcome};
//! use shared::{ConnectionRegistry, GameState, PeerIdentity};
//!
//! let registry = ConnectionRegistry::new();
//! let mut host = HostAuthority::start(
//!     GameState::new(4),
//!     PeerIdentity::from("127.0.0.1:7000"),
//!     host::room_code::fresh_room_code(),
//! )
//! .unwrap();
//!
//! let alice = PeerIdentity::from("127.0.0.1:7001");
//! let outcome = host.handle_join_request(&alice, &alice, "Alice", &registry);
//! assert_eq!(outcome, JoinOutcome::Accepted { ordinal_id: 0 });
//! assert_eq!(host.state().turn_history, vec!["Alice has joined."]);
//! ```

pub mod authority;
pub mod room_code;

pub use authority::{HostAuthority, JoinOutcome};
