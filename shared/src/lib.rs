use serde::{Deserialize, Serialize};
use std::fmt;

pub mod envelope;
pub mod error;
pub mod registry;
pub mod transport;

pub use envelope::{decode, encode, Envelope};
pub use error::SessionError;
pub use registry::{ChannelHandle, Connection, ConnectionRegistry};
pub use transport::{Transport, TransportEvent};

pub const DEFAULT_PLAYER_COUNT: u8 = 4;
pub const MAX_ENVELOPE_BYTES: u64 = 1024 * 1024;

/// Opaque handle the transport assigns to a peer.
///
/// Used as the registry key and as the sender tag on every inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerIdentity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    /// 2..=14, aces high
    pub rank: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedCard {
    pub ordinal_id: u32,
    pub card: Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Lobby,
    Bidding,
    Playing,
    Scoring,
}

/// A seated participant.
///
/// `ordinal_id` is assigned by the host and never changes once assigned.
/// Everything after `display_name` belongs to the game rules and is carried
/// through the sync layer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub ordinal_id: u32,
    pub peer_identity: PeerIdentity,
    pub display_name: String,
    pub hand: Vec<Card>,
    pub bid: Option<u32>,
    pub tricks_won: u32,
    pub score: i32,
}

impl Player {
    pub fn new(ordinal_id: u32, peer_identity: PeerIdentity, display_name: &str) -> Self {
        Self {
            ordinal_id,
            peer_identity,
            display_name: display_name.to_string(),
            hand: Vec::new(),
            bid: None,
            tricks_won: 0,
            score: 0,
        }
    }
}

/// The replicated table.
///
/// The host's copy is authoritative; every peer holds a cached copy that is
/// only ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub room_code: String,
    pub host_peer_identity: PeerIdentity,
    /// Join order. Only authoritative on the host.
    pub players: Vec<Player>,
    /// Seat capacity.
    pub player_count: usize,
    /// Append-only.
    pub turn_history: Vec<String>,
    /// Bumped by the host every time it adopts a new state.
    pub revision: u64,
    pub phase: Phase,
    pub round: u32,
    pub trump: Option<Suit>,
    pub active_seat: Option<u32>,
    pub trick: Vec<PlayedCard>,
}

impl GameState {
    /// Empty lobby with room for `player_count` seats. Room code and host
    /// identity are stamped when hosting starts.
    pub fn new(player_count: usize) -> Self {
        Self {
            room_code: String::new(),
            host_peer_identity: PeerIdentity::default(),
            players: Vec::new(),
            player_count,
            turn_history: Vec::new(),
            revision: 0,
            phase: Phase::Lobby,
            round: 0,
            trump: None,
            active_seat: None,
            trick: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.player_count
    }

    pub fn player_by_identity(&self, identity: &PeerIdentity) -> Option<&Player> {
        self.players
            .iter()
            .find(|player| &player.peer_identity == identity)
    }

    pub fn player_by_ordinal(&self, ordinal_id: u32) -> Option<&Player> {
        self.players
            .iter()
            .find(|player| player.ordinal_id == ordinal_id)
    }

    /// Checks that `next` is a legal successor of `self`: capacity holds,
    /// history only grew, and the room identity did not move.
    pub fn validate_successor(&self, next: &GameState) -> Result<(), SessionError> {
        if next.players.len() > next.player_count {
            return Err(SessionError::InvalidMutation(format!(
                "{} players exceed capacity {}",
                next.players.len(),
                next.player_count
            )));
        }
        if !next.turn_history.starts_with(&self.turn_history) {
            return Err(SessionError::InvalidMutation(
                "turn history is append-only".to_string(),
            ));
        }
        if next.room_code != self.room_code || next.host_peer_identity != self.host_peer_identity
        {
            return Err(SessionError::InvalidMutation(
                "room code and host identity are fixed".to_string(),
            ));
        }
        let mut ids: Vec<u32> = next.players.iter().map(|p| p.ordinal_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != next.players.len() {
            return Err(SessionError::InvalidMutation(
                "ordinal ids must be unique".to_string(),
            ));
        }
        Ok(())
    }
}
