//! Wire messages exchanged between host and peers, and their codec.
//!
//! Every message travels as one bincode-encoded `Envelope`. The variant set is
//! closed: anything that does not decode to one of the four variants
//! (unknown tag, truncated payload, trailing garbage, oversized frame) is a
//! `MalformedEnvelope`. There is no persisted format, so no compatibility is
//! kept across versions.

use crate::{GameState, PeerIdentity, SessionError, MAX_ENVELOPE_BYTES};
use bincode::Options;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    /// Host to every peer: full-state replacement.
    GameStateUpdate(GameState),
    /// Joining peer to host: request a seat.
    JoinRequest {
        peer_identity: PeerIdentity,
        display_name: String,
    },
    /// Host to a rejected peer.
    GameFull,
    /// Host to a newly accepted peer: initial full state.
    Welcome(GameState),
}

impl Envelope {
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::GameStateUpdate(_) => "GameStateUpdate",
            Envelope::JoinRequest { .. } => "JoinRequest",
            Envelope::GameFull => "GameFull",
            Envelope::Welcome(_) => "Welcome",
        }
    }
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_ENVELOPE_BYTES)
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, SessionError> {
    options()
        .serialize(envelope)
        .map_err(|e| SessionError::MalformedEnvelope(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, SessionError> {
    options()
        .deserialize(bytes)
        .map_err(|e| SessionError::MalformedEnvelope(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Card, Phase, PlayedCard, Player, Suit};

    fn sample_state() -> GameState {
        let mut state = GameState::new(4);
        state.room_code = "HJKMN".to_string();
        state.host_peer_identity = PeerIdentity::from("127.0.0.1:9000");
        let mut alice = Player::new(0, PeerIdentity::from("127.0.0.1:9001"), "Alice");
        alice.hand = vec![
            Card {
                suit: Suit::Hearts,
                rank: 12,
            },
            Card {
                suit: Suit::Spades,
                rank: 14,
            },
        ];
        alice.bid = Some(2);
        state.players.push(alice);
        state.turn_history.push("Alice has joined.".to_string());
        state.phase = Phase::Playing;
        state.trump = Some(Suit::Spades);
        state.active_seat = Some(0);
        state.trick.push(PlayedCard {
            ordinal_id: 0,
            card: Card {
                suit: Suit::Clubs,
                rank: 3,
            },
        });
        state.revision = 7;
        state
    }

    #[test]
    fn test_envelope_serialization_game_state_update() {
        let envelope = Envelope::GameStateUpdate(sample_state());
        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_envelope_serialization_join_request() {
        let envelope = Envelope::JoinRequest {
            peer_identity: PeerIdentity::from("peer-b"),
            display_name: "Bob".to_string(),
        };
        let decoded = decode(&encode(&envelope).unwrap()).unwrap();

        match decoded {
            Envelope::JoinRequest {
                peer_identity,
                display_name,
            } => {
                assert_eq!(peer_identity.as_str(), "peer-b");
                assert_eq!(display_name, "Bob");
            }
            _ => panic!("Wrong envelope type after deserialization"),
        }
    }

    #[test]
    fn test_envelope_serialization_game_full() {
        let decoded = decode(&encode(&Envelope::GameFull).unwrap()).unwrap();
        assert_eq!(decoded, Envelope::GameFull);
    }

    #[test]
    fn test_decode_truncated_input() {
        let bytes = encode(&Envelope::Welcome(sample_state())).unwrap();
        let result = decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(SessionError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_decode_unknown_tag() {
        // fixint encoding puts the variant index in the first four bytes
        let bytes = 99u32.to_le_bytes();
        let result = decode(&bytes);
        assert!(matches!(result, Err(SessionError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(matches!(
            decode(&[]),
            Err(SessionError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = encode(&Envelope::GameFull).unwrap();
        bytes.push(0);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_envelope_kind() {
        assert_eq!(Envelope::GameFull.kind(), "GameFull");
        assert_eq!(
            Envelope::Welcome(GameState::new(2)).kind(),
            "Welcome"
        );
    }
}
