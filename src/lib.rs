//! # Scribble Room Library
//!
//! This library provides the authoritative session logic for a single
//! multiplayer drawing-and-guessing room: the phase state machine, the
//! reconnect-tolerant player roster, message-driven mutation of shared
//! state (word selection, drawing strokes, guesses, reactions), scoring,
//! and differential state projection (the drawer sees more than the
//! guessers).
//!
//! Transport, authentication, room lookup, and scheduling live in the
//! hosting environment: the engine consumes already-established
//! per-connection [`session::Tunnel`]s and already-authenticated
//! [`roster::Identity`] records, and is driven by a periodic call to
//! [`room::Room::tick`].

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

use serde::Serialize;

pub mod constants;
pub mod projection;
pub mod room;
pub mod roster;
pub mod session;
pub mod words;

use projection::RoomStateView;
use roster::PlayerId;

/// Full room-state messages sent to clients
///
/// Serialized as a `{type, payload}` envelope; the payload is the
/// per-recipient projection built by the broadcaster.
#[derive(Debug, Serialize, Clone, derive_more::From)]
#[serde(tag = "type", content = "payload")]
pub enum StateMessage {
    /// The current room state projected for the recipient's role
    #[serde(rename = "room:state")]
    RoomState(RoomStateView),
}

impl StateMessage {
    /// Converts the state message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Discrete event messages sent to clients outside the state broadcast
///
/// Same `{type, payload}` envelope shape as [`StateMessage`]; alerts and
/// reactions are broadcast, guess results are targeted to the guesser.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", content = "payload")]
pub enum UpdateMessage {
    /// A room-wide notice, e.g. naming a correct guesser
    #[serde(rename = "room:alert")]
    Alert {
        /// Emoji shown alongside the notice
        emoji: String,
        /// Human-readable notice text
        content: String,
    },
    /// A cosmetic reaction echoed to everyone
    #[serde(rename = "room:reaction")]
    Reaction {
        /// Fresh identifier so clients can animate duplicates
        id: uuid::Uuid,
        /// The reaction emoji
        emoji: String,
        /// The reacting player; the wire key keeps the client's camelCase
        /// spelling
        #[serde(rename = "fromPlayerId")]
        from_player_id: PlayerId,
    },
    /// Result of a guess, sent only to the guessing player
    #[serde(rename = "guess:result")]
    GuessResult {
        /// Whether the guess matched the secret word
        correct: bool,
    },
}

impl UpdateMessage {
    /// Converts the event message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_message_envelope_shape() {
        let message = UpdateMessage::GuessResult { correct: true };
        let json = message.to_message();

        assert!(json.contains("\"type\":\"guess:result\""));
        assert!(json.contains("\"payload\":{\"correct\":true}"));
    }

    #[test]
    fn test_alert_envelope_shape() {
        let message = UpdateMessage::Alert {
            emoji: "🎉".to_owned(),
            content: "Bob guessed the word!".to_owned(),
        };
        let json = message.to_message();

        assert!(json.contains("\"type\":\"room:alert\""));
        assert!(json.contains("Bob guessed the word!"));
    }

    #[test]
    fn test_reaction_envelope_shape() {
        let message = UpdateMessage::Reaction {
            id: uuid::Uuid::new_v4(),
            emoji: "🔥".to_owned(),
            from_player_id: PlayerId(12),
        };
        let json = message.to_message();

        assert!(json.contains("\"type\":\"room:reaction\""));
        assert!(json.contains("\"fromPlayerId\":12"));
    }
}
