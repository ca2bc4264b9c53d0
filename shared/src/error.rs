//! Session error types.

use crate::PeerIdentity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("transport has no local identity yet")]
    TransportUnavailable,

    #[error("peer {0} is unreachable")]
    PeerUnreachable(PeerIdentity),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("the game is full")]
    CapacityExceeded,

    #[error("channel to {0} was lost")]
    ChannelLost(PeerIdentity),

    #[error("a session role is already active")]
    RoleConflict,

    #[error("invalid state change: {0}")]
    InvalidMutation(String),
}
