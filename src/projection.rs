//! Differential state projections
//!
//! The same room state is projected differently depending on the
//! recipient's role: the drawer sees the candidate words and the secret
//! word at all times, guessers only learn the word during the results
//! phase. Spectators are not produced by the engine yet and receive the
//! guesser view.

use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::Duration;

use crate::{
    room::Phase,
    roster::{Player, PlayerId},
};

/// The recipient's role for projection purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The player currently drawing
    Drawer,
    /// Any other player
    Guesser,
    /// A non-playing observer (stub, never produced by the engine)
    Spectator,
}

/// Public identity fields of a player, safe for any recipient
#[derive(Debug, Serialize, Clone)]
pub struct PublicPlayer {
    /// Stable external identity
    pub id: PlayerId,
    /// Display name
    pub display_name: String,
    /// Avatar image URL
    pub avatar_url: String,
}

impl From<&Player> for PublicPlayer {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id(),
            display_name: player.display_name().to_owned(),
            avatar_url: player.avatar_url().to_owned(),
        }
    }
}

/// Per-player entry of the roster listing in a state projection
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct PlayerSummary {
    /// Stable external identity
    pub id: PlayerId,
    /// Display name
    pub display_name: String,
    /// Avatar image URL
    pub avatar_url: String,
    /// Score accumulated in the current game cycle
    pub score: u64,
    /// Whether the player guessed correctly this round
    pub has_guessed: bool,
    /// Seconds between drawing start and the correct guess
    pub guess_latency_seconds: Option<f64>,
    /// Whether the player currently has a live connection
    pub connected: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id(),
            display_name: player.display_name().to_owned(),
            avatar_url: player.avatar_url().to_owned(),
            score: player.score(),
            has_guessed: player.has_guessed(),
            guess_latency_seconds: player.guess_latency().map(|latency| latency.as_secs_f64()),
            connected: player.is_connected(),
        }
    }
}

/// A full room-state projection for one recipient
///
/// `selected_word` and `candidate_words` are the role-differentiated
/// fields; both serialize only when populated.
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct RoomStateView {
    /// Current round, 1-based
    pub round: u32,
    /// Current phase
    pub phase: Phase,
    /// Remaining time in the current phase
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub time_left: Duration,
    /// Public identity of the current drawer, if any
    pub drawer: Option<PublicPlayer>,
    /// All players in turn order
    pub players: Vec<PlayerSummary>,
    /// Latest drawing snapshot, opaque to the engine
    pub strokes_payload: String,
    /// Length of the secret word once one is selected
    pub word_length: Option<usize>,
    /// Letter-scramble hint for the secret word
    pub letter_board: Option<Vec<char>>,
    /// The secret word; drawer always, guessers only during results
    pub selected_word: Option<String>,
    /// Candidate words; drawer only
    pub candidate_words: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_summary_from_player() {
        let mut roster = crate::roster::Roster::new();
        let connection = crate::roster::ConnectionId::new();
        roster
            .join(
                crate::roster::Identity {
                    id: PlayerId(7),
                    display_name: "carol".to_owned(),
                    avatar_url: "https://avatars.example/7".to_owned(),
                },
                connection,
                web_time::SystemTime::now(),
            )
            .unwrap();
        roster
            .get_mut(PlayerId(7))
            .unwrap()
            .record_correct_guess(Duration::from_millis(2500));

        let summary = PlayerSummary::from(roster.get(PlayerId(7)).unwrap());
        assert_eq!(summary.id, PlayerId(7));
        assert_eq!(summary.score, 1);
        assert!(summary.has_guessed);
        assert_eq!(summary.guess_latency_seconds, Some(2.5));
        assert!(summary.connected);

        roster.detach(PlayerId(7), connection);
        let summary = PlayerSummary::from(roster.get(PlayerId(7)).unwrap());
        assert!(!summary.connected);
    }

    #[test]
    fn test_view_serializes_phase_and_skips_hidden_fields() {
        let view = RoomStateView {
            round: 2,
            phase: Phase::WordDrawing,
            time_left: Duration::from_secs(42),
            drawer: None,
            players: Vec::new(),
            strokes_payload: String::new(),
            word_length: Some(3),
            letter_board: None,
            selected_word: None,
            candidate_words: None,
        };

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"WORD_DRAWING\""));
        assert!(json.contains("\"time_left\":42000"));
        assert!(!json.contains("selected_word"));
        assert!(!json.contains("candidate_words"));
    }
}
