//! Cached table state for a joining or seated peer

use log::{debug, info, warn};
use shared::{ConnectionRegistry, Envelope, GameState, PeerIdentity, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaState {
    /// Waiting for the host to answer the join request.
    Joining,
    Synced(GameState),
    /// Terminal for this attempt. A fresh join is needed to play again.
    Rejected(SessionError),
}

/// What applying an event did to the replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaUpdate {
    /// First full state arrived. `ordinal_id` is our seat if the state has one.
    Seated { ordinal_id: Option<u32> },
    /// Cached state replaced by a newer host snapshot.
    Replaced { revision: u64 },
    Rejected(SessionError),
    /// The event did not apply in the current state.
    Ignored,
}

/// The peer side of the sync protocol
///
/// Bound at creation to one host identity. Only envelopes arriving on that
/// channel can change the cached state, and they always replace it wholesale.
#[derive(Debug)]
pub struct PeerReplica {
    host_identity: PeerIdentity,
    self_identity: PeerIdentity,
    display_name: String,
    state: ReplicaState,
    host_channel_opened: bool,
    join_sent: bool,
}

impl PeerReplica {
    pub fn joining(
        host_identity: PeerIdentity,
        self_identity: PeerIdentity,
        display_name: &str,
    ) -> Self {
        Self {
            host_identity,
            self_identity,
            display_name: display_name.to_string(),
            state: ReplicaState::Joining,
            host_channel_opened: false,
            join_sent: false,
        }
    }

    pub fn host_identity(&self) -> &PeerIdentity {
        &self.host_identity
    }

    pub fn state(&self) -> &ReplicaState {
        &self.state
    }

    pub fn game_state(&self) -> Option<&GameState> {
        match &self.state {
            ReplicaState::Synced(state) => Some(state),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.state, ReplicaState::Rejected(_))
    }

    pub fn host_channel_opened(&self) -> bool {
        self.host_channel_opened
    }

    /// Sends the join request once the host channel is open.
    ///
    /// Returns true if the request was queued by this call.
    pub fn on_channel_open(&mut self, peer: &PeerIdentity, registry: &ConnectionRegistry) -> bool {
        if peer != &self.host_identity {
            return false;
        }
        self.host_channel_opened = true;

        if self.state != ReplicaState::Joining || self.join_sent {
            return false;
        }

        let request = Envelope::JoinRequest {
            peer_identity: self.self_identity.clone(),
            display_name: self.display_name.clone(),
        };
        self.join_sent = registry.send(&self.host_identity, &request);
        if self.join_sent {
            info!("Requested a seat from {} as {}", self.host_identity, self.display_name);
        }
        self.join_sent
    }

    /// Applies an envelope received from `from`.
    pub fn apply(&mut self, from: &PeerIdentity, envelope: Envelope) -> ReplicaUpdate {
        if from != &self.host_identity {
            warn!(
                "Ignoring {} from {}: bound to host {}",
                envelope.kind(),
                from,
                self.host_identity
            );
            return ReplicaUpdate::Ignored;
        }

        if self.is_rejected() {
            debug!("Ignoring {} after rejection", envelope.kind());
            return ReplicaUpdate::Ignored;
        }
        let joining = self.state == ReplicaState::Joining;

        match envelope {
            Envelope::Welcome(state) => {
                let ordinal_id = state
                    .player_by_identity(&self.self_identity)
                    .map(|player| player.ordinal_id);
                info!(
                    "Welcomed to room {} (seat {:?}, {} players)",
                    state.room_code,
                    ordinal_id,
                    state.players.len()
                );
                self.state = ReplicaState::Synced(state);
                ReplicaUpdate::Seated { ordinal_id }
            }

            Envelope::GameStateUpdate(state) if !joining => {
                let revision = state.revision;
                debug!("Replacing cached state with revision {}", revision);
                self.state = ReplicaState::Synced(state);
                ReplicaUpdate::Replaced { revision }
            }

            Envelope::GameFull if joining => {
                info!("Host {} has no free seat", self.host_identity);
                self.state = ReplicaState::Rejected(SessionError::CapacityExceeded);
                ReplicaUpdate::Rejected(SessionError::CapacityExceeded)
            }

            envelope => {
                debug!("Ignoring {} while {}", envelope.kind(), self.state_name());
                ReplicaUpdate::Ignored
            }
        }
    }

    /// Handles the loss of a channel. Losing the host channel ends the
    /// session and discards the cached state.
    pub fn on_channel_lost(&mut self, peer: &PeerIdentity) -> ReplicaUpdate {
        if peer != &self.host_identity || self.is_rejected() {
            return ReplicaUpdate::Ignored;
        }

        let error = if self.host_channel_opened {
            SessionError::ChannelLost(peer.clone())
        } else {
            SessionError::PeerUnreachable(peer.clone())
        };
        warn!("Session with {} ended: {}", peer, error);
        self.state = ReplicaState::Rejected(error.clone());
        ReplicaUpdate::Rejected(error)
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            ReplicaState::Joining => "Joining",
            ReplicaState::Synced(_) => "Synced",
            ReplicaState::Rejected(_) => "Rejected",
        }
    }
}
