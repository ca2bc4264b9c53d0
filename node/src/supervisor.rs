//! Role supervision and inbound dispatch
//!
//! The `Supervisor` is the session object for one process. It owns the
//! connection registry and the current role, and it is the only thing that
//! sees transport events. Each event is handled to completion before the
//! next one, so neither the registry nor the game state needs a lock.
//!
//! Dispatch is decided by the role, never by the envelope alone: a
//! `JoinRequest` only means something to a host, a `Welcome` only to a peer,
//! and anything arriving while no role is active is dropped.

use host::room_code::fresh_room_code;
use host::{HostAuthority, JoinOutcome};
use log::{debug, info, warn};
use peer::{PeerReplica, ReplicaUpdate};
use shared::{
    decode, ConnectionRegistry, Envelope, GameState, PeerIdentity, Player, SessionError,
    Transport, TransportEvent,
};
use std::fmt;

/// The process's current role. Holding the role state inside the variant
/// makes it impossible to be host and peer at once.
#[derive(Debug)]
enum Role {
    None,
    Host(HostAuthority),
    Peer(PeerReplica),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    None,
    Host,
    Peer,
}

/// Something the presentation layer should tell the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    PlayerJoined { ordinal_id: u32, display_name: String },
    PlayerTurnedAway { peer: PeerIdentity },
    PlayersLeft { display_names: Vec<String> },
    Seated { ordinal_id: Option<u32> },
    StateReplaced { revision: u64 },
    /// The peer session is over. After `PeerUnreachable` the role is back to
    /// `None`.
    SessionEnded(SessionError),
    /// An inbound message was discarded; the channel stays up.
    Dropped(SessionError),
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::PlayerJoined {
                ordinal_id,
                display_name,
            } => write!(f, "{} took seat {}", display_name, ordinal_id),
            SessionNotice::PlayerTurnedAway { peer } => {
                write!(f, "{} was turned away: table is full", peer)
            }
            SessionNotice::PlayersLeft { display_names } => {
                write!(f, "{} left the table", display_names.join(", "))
            }
            SessionNotice::Seated {
                ordinal_id: Some(ordinal_id),
            } => write!(f, "Joined the table at seat {}", ordinal_id),
            SessionNotice::Seated { ordinal_id: None } => write!(f, "Joined the table"),
            SessionNotice::StateReplaced { revision } => {
                write!(f, "Table updated to revision {}", revision)
            }
            SessionNotice::SessionEnded(e) => write!(f, "Could not stay at the table: {}", e),
            SessionNotice::Dropped(e) => write!(f, "Dropped a message: {}", e),
        }
    }
}

/// A lobby of `capacity` seats with the local player already in seat 0.
pub fn seated_table(local: PeerIdentity, display_name: &str, capacity: usize) -> GameState {
    let mut state = GameState::new(capacity);
    state.players.push(Player::new(0, local, display_name));
    state
        .turn_history
        .push(format!("{} has joined.", display_name));
    state
}

pub struct Supervisor<T: Transport> {
    transport: T,
    display_name: String,
    role: Role,
    registry: ConnectionRegistry,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(transport: T, display_name: &str) -> Self {
        Self {
            transport,
            display_name: display_name.to_string(),
            role: Role::None,
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn role_kind(&self) -> RoleKind {
        match self.role {
            Role::None => RoleKind::None,
            Role::Host(_) => RoleKind::Host,
            Role::Peer(_) => RoleKind::Peer,
        }
    }

    pub fn host(&self) -> Option<&HostAuthority> {
        match &self.role {
            Role::Host(host) => Some(host),
            _ => None,
        }
    }

    pub fn peer(&self) -> Option<&PeerReplica> {
        match &self.role {
            Role::Peer(replica) => Some(replica),
            _ => None,
        }
    }

    /// The table as this process currently sees it.
    pub fn current_state(&self) -> Option<&GameState> {
        match &self.role {
            Role::None => None,
            Role::Host(host) => Some(host.state()),
            Role::Peer(replica) => replica.game_state(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Hosting and joining are allowed from no role, or after a peer session
    /// ended. Hosting is never left.
    fn ensure_can_switch(&self) -> Result<(), SessionError> {
        match &self.role {
            Role::None => Ok(()),
            Role::Peer(replica) if replica.is_rejected() => Ok(()),
            _ => Err(SessionError::RoleConflict),
        }
    }

    fn local_identity(&self) -> Result<PeerIdentity, SessionError> {
        self.transport
            .local_identity()
            .ok_or(SessionError::TransportUnavailable)
    }

    /// Becomes the host of a fresh room built from `initial`.
    pub fn start_hosting(&mut self, initial: GameState) -> Result<(), SessionError> {
        self.ensure_can_switch()?;
        let local = self.local_identity()?;

        let authority = HostAuthority::start(initial, local, fresh_room_code())?;
        self.role = Role::Host(authority);
        Ok(())
    }

    /// Starts joining the room hosted at `host_identity`.
    ///
    /// Opens a channel to the host unless one is already open; the join
    /// request goes out as soon as the channel is up.
    ///
    /// If the host cannot be reached (it is this process, or the transport
    /// refuses to dial) the role is reset to `Role::None`, even when called
    /// from an ended peer session, and `PeerUnreachable` is returned. The old
    /// session's cached state is gone either way.
    pub fn join_game(&mut self, host_identity: PeerIdentity) -> Result<(), SessionError> {
        self.ensure_can_switch()?;
        let local = self.local_identity()?;

        if host_identity == local {
            self.role = Role::None;
            return Err(SessionError::PeerUnreachable(host_identity));
        }

        let mut replica = PeerReplica::joining(host_identity.clone(), local, &self.display_name);

        if self.registry.is_open(&host_identity) {
            replica.on_channel_open(&host_identity, &self.registry);
        } else if let Err(e) = self.transport.connect(&host_identity) {
            warn!("Could not reach {}: {}", host_identity, e);
            self.role = Role::None;
            return Err(match e {
                SessionError::TransportUnavailable => e,
                _ => SessionError::PeerUnreachable(host_identity),
            });
        }

        info!("Joining {} as {}", host_identity, self.display_name);
        self.role = Role::Peer(replica);
        Ok(())
    }

    /// Applies a rule-driven change on the host and pushes it to every peer.
    pub fn mutate_and_broadcast<F>(&mut self, mutate: F) -> Result<&GameState, SessionError>
    where
        F: FnOnce(&mut GameState),
    {
        match &mut self.role {
            Role::Host(host) => host.mutate_and_broadcast(mutate, &self.registry),
            _ => Err(SessionError::RoleConflict),
        }
    }

    /// Re-sends the host's current state to every open channel.
    pub fn broadcast(&self) -> Result<usize, SessionError> {
        match &self.role {
            Role::Host(host) => Ok(host.broadcast(&self.registry)),
            _ => Err(SessionError::RoleConflict),
        }
    }

    /// Processes one transport event to completion.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<SessionNotice> {
        match event {
            TransportEvent::Opened { peer, channel } => {
                if self.registry.is_open(&peer) {
                    warn!("Refusing second channel claiming to be {}", peer);
                    return None;
                }
                debug!("Channel to {} opened", peer);
                self.registry.register(peer.clone(), channel);
                if let Role::Peer(replica) = &mut self.role {
                    replica.on_channel_open(&peer, &self.registry);
                }
                None
            }

            TransportEvent::Data { from, bytes } => match decode(&bytes) {
                Ok(envelope) => self.dispatch(&from, envelope),
                Err(e) => {
                    warn!("Dropping {} bytes from {}: {}", bytes.len(), from, e);
                    Some(SessionNotice::Dropped(e))
                }
            },

            TransportEvent::Closed { peer } => {
                info!("Channel to {} closed", peer);
                self.channel_lost(&peer)
            }

            TransportEvent::Failed { peer, reason } => {
                warn!("Channel to {} failed: {}", peer, reason);
                self.channel_lost(&peer)
            }
        }
    }

    fn channel_lost(&mut self, peer: &PeerIdentity) -> Option<SessionNotice> {
        self.registry.unregister(peer);

        let update = match &mut self.role {
            Role::None => return None,
            Role::Host(host) => {
                let removed = host.handle_channel_closed(peer, &self.registry);
                if removed.is_empty() {
                    return None;
                }
                return Some(SessionNotice::PlayersLeft {
                    display_names: removed.into_iter().map(|p| p.display_name).collect(),
                });
            }
            Role::Peer(replica) => replica.on_channel_lost(peer),
        };

        match update {
            ReplicaUpdate::Rejected(e @ SessionError::PeerUnreachable(_)) => {
                self.role = Role::None;
                Some(SessionNotice::SessionEnded(e))
            }
            ReplicaUpdate::Rejected(e) => Some(SessionNotice::SessionEnded(e)),
            _ => None,
        }
    }

    fn dispatch(&mut self, from: &PeerIdentity, envelope: Envelope) -> Option<SessionNotice> {
        match &mut self.role {
            Role::None => {
                warn!("Dropping {} from {}: no active role", envelope.kind(), from);
                None
            }

            Role::Host(host) => match envelope {
                Envelope::JoinRequest {
                    peer_identity,
                    display_name,
                } => match host.handle_join_request(from, &peer_identity, &display_name, &self.registry)
                {
                    JoinOutcome::Accepted { ordinal_id } => {
                        let display_name = host
                            .state()
                            .player_by_ordinal(ordinal_id)
                            .map(|p| p.display_name.clone())
                            .unwrap_or(display_name);
                        Some(SessionNotice::PlayerJoined {
                            ordinal_id,
                            display_name,
                        })
                    }
                    JoinOutcome::AlreadySeated { .. } => None,
                    JoinOutcome::Full => Some(SessionNotice::PlayerTurnedAway { peer: from.clone() }),
                },
                other => {
                    warn!("Host dropping {} from {}", other.kind(), from);
                    None
                }
            },

            Role::Peer(replica) => {
                if let Envelope::JoinRequest { .. } = envelope {
                    warn!("Peer dropping JoinRequest from {}", from);
                    return None;
                }
                match replica.apply(from, envelope) {
                    ReplicaUpdate::Seated { ordinal_id } => Some(SessionNotice::Seated { ordinal_id }),
                    ReplicaUpdate::Replaced { revision } => {
                        Some(SessionNotice::StateReplaced { revision })
                    }
                    ReplicaUpdate::Rejected(e) => Some(SessionNotice::SessionEnded(e)),
                    ReplicaUpdate::Ignored => None,
                }
            }
        }
    }
}
