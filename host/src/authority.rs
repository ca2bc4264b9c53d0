//! Authoritative table state for the hosting process
//!
//! This module owns the single source of truth while the local process hosts
//! a room. It handles:
//! - Seat requests from joining peers, including capacity rejection
//! - Departures reported by the transport as closed channels
//! - Rule-driven mutations and the broadcasts that follow them
//!
//! Every accepted change is validated, stamped with a new revision, pushed to
//! the open channels and only then adopted as the host's own state.

use log::{debug, info, warn};
use shared::{ConnectionRegistry, Envelope, GameState, PeerIdentity, Player, SessionError};

/// Result of a seat request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new seat was created for the requester.
    Accepted { ordinal_id: u32 },
    /// The requester already holds a seat; the current state was re-sent.
    AlreadySeated { ordinal_id: u32 },
    /// Every seat is taken; `GameFull` was sent to the requester only.
    Full,
}

/// The host side of the sync protocol
///
/// Holds the authoritative `GameState` plus the next ordinal id to hand out.
/// Ordinal ids are never reused within a session, so seats vacated by a
/// departure leave gaps rather than being renumbered.
#[derive(Debug)]
pub struct HostAuthority {
    state: GameState,
    next_ordinal: u32,
}

impl HostAuthority {
    /// Starts hosting `initial`, stamped with `room_code` and the local
    /// identity.
    ///
    /// Players already present in `initial` (typically the host's own seat)
    /// keep their ordinal ids. Fails if the initial roster already breaks the
    /// capacity or uniqueness rules.
    pub fn start(
        mut initial: GameState,
        local_identity: PeerIdentity,
        room_code: String,
    ) -> Result<Self, SessionError> {
        initial.room_code = room_code;
        initial.host_peer_identity = local_identity;
        initial.validate_successor(&initial)?;
        let next_ordinal = ordinal_after(&initial)?;

        info!(
            "Hosting room {} ({}/{} seats taken)",
            initial.room_code,
            initial.players.len(),
            initial.player_count
        );

        Ok(Self {
            state: initial,
            next_ordinal,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn room_code(&self) -> &str {
        &self.state.room_code
    }

    /// Processes a seat request that arrived on `from`'s channel
    ///
    /// The seat is bound to the channel identity, not to whatever identity
    /// the request claims. On acceptance the requester receives `Welcome`
    /// with a state that already contains its seat, and every other open
    /// channel receives the same snapshot as a `GameStateUpdate`.
    pub fn handle_join_request(
        &mut self,
        from: &PeerIdentity,
        claimed_identity: &PeerIdentity,
        player_name: &str,
        registry: &ConnectionRegistry,
    ) -> JoinOutcome {
        if claimed_identity != from {
            warn!(
                "Join request on channel {} claims identity {}, seating under {}",
                from, claimed_identity, from
            );
        }

        if let Some(player) = self.state.player_by_identity(from) {
            let ordinal_id = player.ordinal_id;
            debug!("{} already holds seat {}, re-sending welcome", from, ordinal_id);
            registry.send(from, &Envelope::Welcome(self.state.clone()));
            return JoinOutcome::AlreadySeated { ordinal_id };
        }

        if self.state.is_full() {
            info!(
                "Rejecting join from {}: room {} is full ({} seats)",
                from, self.state.room_code, self.state.player_count
            );
            registry.send(from, &Envelope::GameFull);
            return JoinOutcome::Full;
        }

        let ordinal_id = self.next_ordinal;
        let Some(following) = ordinal_id.checked_add(1) else {
            warn!("Ordinal ids exhausted in room {}, rejecting {}", self.state.room_code, from);
            registry.send(from, &Envelope::GameFull);
            return JoinOutcome::Full;
        };
        self.next_ordinal = following;

        let name = match player_name.trim() {
            "" => format!("Player {}", ordinal_id + 1),
            trimmed => trimmed.to_string(),
        };

        let mut next = self.state.clone();
        next.players.push(Player::new(ordinal_id, from.clone(), &name));
        next.turn_history.push(format!("{} has joined.", name));
        next.revision += 1;

        registry.send(from, &Envelope::Welcome(next.clone()));
        let others = registry.broadcast_except(&Envelope::GameStateUpdate(next.clone()), Some(from));

        info!(
            "{} joined as seat {} from {} ({} other channels updated)",
            name, ordinal_id, from, others
        );
        self.state = next;

        JoinOutcome::Accepted { ordinal_id }
    }

    /// Drops every seat bound to `peer` after its channel closed.
    ///
    /// Returns the removed players. When nothing was removed the state is
    /// left untouched and nothing is broadcast.
    pub fn handle_channel_closed(
        &mut self,
        peer: &PeerIdentity,
        registry: &ConnectionRegistry,
    ) -> Vec<Player> {
        let (removed, kept): (Vec<Player>, Vec<Player>) = self
            .state
            .players
            .iter()
            .cloned()
            .partition(|player| &player.peer_identity == peer);

        if removed.is_empty() {
            debug!("Channel {} closed without a seat", peer);
            return removed;
        }

        let mut next = self.state.clone();
        next.players = kept;
        for player in &removed {
            next.turn_history
                .push(format!("{} has disconnected.", player.display_name));
            info!(
                "{} (seat {}) left room {}",
                player.display_name, player.ordinal_id, next.room_code
            );
        }
        next.revision += 1;

        registry.broadcast(&Envelope::GameStateUpdate(next.clone()));
        self.state = next;

        removed
    }

    /// Applies a rule-driven change and pushes the result to every peer
    ///
    /// `mutate` works on a copy. If the result would break capacity, rewrite
    /// history, or move the room, the copy is discarded and the error is
    /// returned; nothing is sent in that case.
    pub fn mutate_and_broadcast<F>(
        &mut self,
        mutate: F,
        registry: &ConnectionRegistry,
    ) -> Result<&GameState, SessionError>
    where
        F: FnOnce(&mut GameState),
    {
        let mut next = self.state.clone();
        mutate(&mut next);
        self.state.validate_successor(&next)?;
        let next_ordinal = self.next_ordinal.max(ordinal_after(&next)?);
        next.revision = self.state.revision + 1;

        let delivered = registry.broadcast(&Envelope::GameStateUpdate(next.clone()));
        debug!("Revision {} sent to {} channels", next.revision, delivered);
        self.state = next;
        self.next_ordinal = next_ordinal;

        Ok(&self.state)
    }

    /// Re-sends the current state to every open channel.
    pub fn broadcast(&self, registry: &ConnectionRegistry) -> usize {
        registry.broadcast(&Envelope::GameStateUpdate(self.state.clone()))
    }
}

/// The lowest ordinal id above every seat in `state`.
fn ordinal_after(state: &GameState) -> Result<u32, SessionError> {
    match state.players.iter().map(|player| player.ordinal_id).max() {
        None => Ok(0),
        Some(highest) => highest.checked_add(1).ok_or_else(|| {
            SessionError::InvalidMutation(format!("no ordinal id left after {}", highest))
        }),
    }
}
