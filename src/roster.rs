//! Player roster and connection management
//!
//! This module tracks the players of a room and their active connections.
//! A player is keyed by a stable external identity and may hold several
//! connections at once (multi-tab, reconnects). A player whose last
//! connection drops stays in the roster until the grace period elapses,
//! so brief network drops do not disrupt scoring or turn order.
//!
//! Insertion order is the canonical turn sequence used by the phase
//! automaton for drawer rotation.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;
use web_time::{Duration, SystemTime};

use super::{StateMessage, UpdateMessage, session::Tunnel};

/// Stable external identity of a player
///
/// Supplied by the authentication collaborator; unique within a room.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub i64);

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a single accepted connection
///
/// Ephemeral and owned by exactly one player for its lifetime; its only
/// job is to find the tunnel and to remove itself from the player's
/// connection set on close.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// An already-authenticated identity record supplied at join time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Stable external identity
    pub id: PlayerId,
    /// Display name chosen by the authentication layer
    pub display_name: String,
    /// URL of the player's avatar image
    pub avatar_url: String,
}

/// A player in the room
///
/// Holds the public identity, the set of live connections, and the
/// per-round guessing state.
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    display_name: String,
    avatar_url: String,
    connections: HashSet<ConnectionId>,
    score: u64,
    has_guessed: bool,
    guess_latency: Option<Duration>,
    joined_at: SystemTime,
}

impl Player {
    /// The player's stable identity
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The player's display name (censored and title-cased at join)
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// URL of the player's avatar image
    pub fn avatar_url(&self) -> &str {
        &self.avatar_url
    }

    /// Total score accumulated across the game cycle
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Whether the player guessed correctly this round
    pub fn has_guessed(&self) -> bool {
        self.has_guessed
    }

    /// Time between drawing-phase start and the correct guess, if any
    pub fn guess_latency(&self) -> Option<Duration> {
        self.guess_latency
    }

    /// When the player first joined the room
    pub fn joined_at(&self) -> SystemTime {
        self.joined_at
    }

    /// Whether the player currently has at least one live connection
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// The player's live connection set
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.iter().copied()
    }

    /// Marks a correct guess, recording latency and awarding one point
    ///
    /// Returns `false` if the player already guessed this round; repeat
    /// correct guesses must not double-score.
    pub(crate) fn record_correct_guess(&mut self, latency: Duration) -> bool {
        if self.has_guessed {
            return false;
        }
        self.has_guessed = true;
        self.guess_latency = Some(latency);
        self.score += 1;
        true
    }

    /// Clears the per-round guessing state (score persists)
    pub(crate) fn clear_round_state(&mut self) {
        self.has_guessed = false;
        self.guess_latency = None;
    }

    /// Resets the score at the end of a game cycle
    pub(crate) fn reset_score(&mut self) {
        self.score = 0;
        self.clear_round_state();
    }
}

/// Errors that can occur when managing the roster
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The room has reached the maximum number of allowed players
    #[error("maximum number of players reached")]
    MaximumPlayers,
}

/// Tracks the players of a room and their connections
///
/// The primary mapping is keyed by player ID; a separate ordered list
/// preserves join order, which the phase automaton uses as the turn
/// sequence.
#[derive(Debug, Default)]
pub struct Roster {
    /// Primary mapping from player ID to the player record
    players: HashMap<PlayerId, Player>,
    /// Player IDs in join order; removal keeps survivors' relative order
    order: Vec<PlayerId>,
}

impl Roster {
    /// Creates an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a connection to a player, inserting the player if new
    ///
    /// Re-joining with a known identity is idempotent: the connection is
    /// added to the existing player and score and turn position are kept.
    /// New players are appended to the end of the turn order with their
    /// display name censored and title-cased.
    ///
    /// # Errors
    ///
    /// Returns `Error::MaximumPlayers` if the player is new and the room
    /// is full.
    pub fn join(
        &mut self,
        identity: Identity,
        connection: ConnectionId,
        now: SystemTime,
    ) -> Result<&Player, Error> {
        let id = identity.id;

        if let Some(player) = self.players.get_mut(&id) {
            player.connections.insert(connection);
        } else {
            if self.players.len() >= crate::constants::room::MAX_PLAYER_COUNT {
                return Err(Error::MaximumPlayers);
            }

            let player = Player {
                id,
                display_name: identity.display_name.censor().to_title_case(),
                avatar_url: identity.avatar_url,
                connections: HashSet::from([connection]),
                score: 0,
                has_guessed: false,
                guess_latency: None,
                joined_at: now,
            };
            self.players.insert(id, player);
            self.order.push(id);
        }

        Ok(&self.players[&id])
    }

    /// Removes one connection from a player
    ///
    /// Returns `true` if the player is now fully disconnected; the caller
    /// is then responsible for scheduling the grace-delay reap.
    pub fn detach(&mut self, player_id: PlayerId, connection: ConnectionId) -> bool {
        match self.players.get_mut(&player_id) {
            Some(player) => {
                player.connections.remove(&connection);
                player.connections.is_empty()
            }
            None => false,
        }
    }

    /// Removes a player if they still have zero connections
    ///
    /// Invoked after the grace delay. A reconnect during the grace window
    /// leaves the player untouched.
    pub fn reap_if_still_absent(&mut self, player_id: PlayerId) -> Option<Player> {
        if self.players.get(&player_id)?.is_connected() {
            return None;
        }
        self.order.retain(|id| *id != player_id);
        self.players.remove(&player_id)
    }

    /// Number of players in the roster, including disconnected ones
    /// still inside their grace window
    pub fn count(&self) -> usize {
        self.order.len()
    }

    /// Whether the roster has no players
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a player with this ID is in the roster
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    /// Looks up a player by ID
    pub fn get(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    pub(crate) fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&player_id)
    }

    /// Player IDs in join order; the canonical turn sequence
    pub fn ordered_ids(&self) -> &[PlayerId] {
        &self.order
    }

    /// Players in join order
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }

    /// Players in arbitrary order, mutably
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Sends an event message to every connection of every player
    ///
    /// # Arguments
    ///
    /// * `message` - The event message to broadcast
    /// * `tunnel_finder` - Function to retrieve the tunnel for a connection
    pub fn announce<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        for player in self.iter_ordered() {
            for connection in player.connections() {
                if let Some(tunnel) = tunnel_finder(connection) {
                    tunnel.send_message(message);
                }
            }
        }
    }

    /// Sends an event message to every connection of one player
    pub fn send_to_player<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        player_id: PlayerId,
        tunnel_finder: F,
    ) {
        let Some(player) = self.players.get(&player_id) else {
            return;
        };
        for connection in player.connections() {
            if let Some(tunnel) = tunnel_finder(connection) {
                tunnel.send_message(message);
            }
        }
    }

    /// Sends a state message to every connection of one player
    pub fn send_state_to_player<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        message: &StateMessage,
        player_id: PlayerId,
        tunnel_finder: F,
    ) {
        let Some(player) = self.players.get(&player_id) else {
            return;
        };
        for connection in player.connections() {
            if let Some(tunnel) = tunnel_finder(connection) {
                tunnel.send_state(message);
            }
        }
    }

    /// Sends per-player state messages using a builder function
    ///
    /// The builder is called once per player and the resulting state is
    /// delivered to each of that player's connections, so a player's tabs
    /// always see the same projection.
    ///
    /// # Arguments
    ///
    /// * `builder` - Function producing the state message for each player
    /// * `tunnel_finder` - Function to retrieve the tunnel for a connection
    pub fn sync_with<B, T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        builder: B,
        tunnel_finder: F,
    ) where
        B: Fn(&Player) -> StateMessage,
    {
        for player in self.iter_ordered() {
            let message = builder(player);
            for connection in player.connections() {
                if let Some(tunnel) = tunnel_finder(connection) {
                    tunnel.send_state(&message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i64, name: &str) -> Identity {
        Identity {
            id: PlayerId(id),
            display_name: name.to_owned(),
            avatar_url: format!("https://avatars.example/{id}"),
        }
    }

    fn now() -> SystemTime {
        SystemTime::now()
    }

    #[test]
    fn test_join_inserts_new_player() {
        let mut roster = Roster::new();
        let conn = ConnectionId::new();

        let player = roster.join(identity(1, "alice cooper"), conn, now()).unwrap();

        assert_eq!(player.id(), PlayerId(1));
        assert_eq!(player.display_name(), "Alice Cooper");
        assert_eq!(player.score(), 0);
        assert!(player.is_connected());
        assert_eq!(roster.count(), 1);
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        let mut roster = Roster::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        roster.join(identity(1, "alice"), first, now()).unwrap();
        roster.get_mut(PlayerId(1)).unwrap().record_correct_guess(Duration::from_secs(3));
        roster.join(identity(1, "alice"), second, now()).unwrap();

        assert_eq!(roster.count(), 1);
        let player = roster.get(PlayerId(1)).unwrap();
        assert_eq!(player.score(), 1);
        assert_eq!(player.connections().count(), 2);
    }

    #[test]
    fn test_join_preserves_insertion_order() {
        let mut roster = Roster::new();
        for id in [3, 1, 2] {
            roster
                .join(identity(id, &format!("p{id}")), ConnectionId::new(), now())
                .unwrap();
        }

        assert_eq!(
            roster.ordered_ids(),
            &[PlayerId(3), PlayerId(1), PlayerId(2)]
        );
    }

    #[test]
    fn test_join_rejects_when_full() {
        let mut roster = Roster::new();
        for id in 0..crate::constants::room::MAX_PLAYER_COUNT as i64 {
            roster
                .join(identity(id, "p"), ConnectionId::new(), now())
                .unwrap();
        }

        let err = roster
            .join(identity(999, "late"), ConnectionId::new(), now())
            .unwrap_err();
        assert_eq!(err, Error::MaximumPlayers);

        // existing player may still attach another connection
        assert!(roster.join(identity(0, "p"), ConnectionId::new(), now()).is_ok());
    }

    #[test]
    fn test_detach_reports_full_disconnect() {
        let mut roster = Roster::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        roster.join(identity(1, "alice"), first, now()).unwrap();
        roster.join(identity(1, "alice"), second, now()).unwrap();

        assert!(!roster.detach(PlayerId(1), first));
        assert!(roster.detach(PlayerId(1), second));
        assert!(!roster.get(PlayerId(1)).unwrap().is_connected());
    }

    #[test]
    fn test_reap_removes_only_if_still_absent() {
        let mut roster = Roster::new();
        let conn = ConnectionId::new();
        roster.join(identity(1, "alice"), conn, now()).unwrap();
        roster.join(identity(2, "bob"), ConnectionId::new(), now()).unwrap();

        assert!(roster.detach(PlayerId(1), conn));
        // reconnect during the grace window blocks the reap
        roster.join(identity(1, "alice"), ConnectionId::new(), now()).unwrap();
        assert!(roster.reap_if_still_absent(PlayerId(1)).is_none());
        assert_eq!(roster.count(), 2);
    }

    #[test]
    fn test_reap_preserves_survivor_order() {
        let mut roster = Roster::new();
        let conn = ConnectionId::new();
        roster.join(identity(1, "a"), ConnectionId::new(), now()).unwrap();
        roster.join(identity(2, "b"), conn, now()).unwrap();
        roster.join(identity(3, "c"), ConnectionId::new(), now()).unwrap();

        roster.detach(PlayerId(2), conn);
        let reaped = roster.reap_if_still_absent(PlayerId(2)).unwrap();

        assert_eq!(reaped.id(), PlayerId(2));
        assert_eq!(roster.ordered_ids(), &[PlayerId(1), PlayerId(3)]);
        assert!(!roster.contains(PlayerId(2)));
    }

    #[test]
    fn test_record_correct_guess_scores_once() {
        let mut roster = Roster::new();
        roster.join(identity(1, "alice"), ConnectionId::new(), now()).unwrap();
        let player = roster.get_mut(PlayerId(1)).unwrap();

        assert!(player.record_correct_guess(Duration::from_secs(5)));
        assert!(!player.record_correct_guess(Duration::from_secs(6)));
        assert_eq!(player.score(), 1);
        assert_eq!(player.guess_latency(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_clear_round_state_keeps_score() {
        let mut roster = Roster::new();
        roster.join(identity(1, "alice"), ConnectionId::new(), now()).unwrap();
        let player = roster.get_mut(PlayerId(1)).unwrap();
        player.record_correct_guess(Duration::from_secs(5));

        player.clear_round_state();
        assert!(!player.has_guessed());
        assert_eq!(player.guess_latency(), None);
        assert_eq!(player.score(), 1);

        player.reset_score();
        assert_eq!(player.score(), 0);
    }
}
