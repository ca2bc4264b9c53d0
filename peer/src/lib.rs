//! # Peer Library
//!
//! The mirroring side of the card table. A peer asks the host for a seat and
//! from then on holds a cached copy of the table that it never edits itself.
//!
//! ## Lifecycle
//!
//! ```text
//! Joining --Welcome--> Synced --GameStateUpdate--> Synced
//!    |                   |
//!    +--GameFull-------->+--host channel lost--> Rejected
//! ```
//!
//! A peer is bound to one host identity when it starts joining. Envelopes
//! from any other sender are ignored, so a third party sharing a channel with
//! the peer cannot overwrite its view of the table. Every accepted snapshot
//! replaces the cached state wholesale; nothing is merged.
//!
//! Rejection is terminal. There are no automatic retries: playing again means
//! a fresh join.

pub mod replica;

pub use replica::{PeerReplica, ReplicaState, ReplicaUpdate};
