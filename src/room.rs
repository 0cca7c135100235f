//! Core room logic and phase state machine
//!
//! This module contains the main room struct for a single
//! drawing-and-guessing session: the phase automaton with its timers, the
//! routing of inbound client messages against the current phase, scoring,
//! and the per-role state broadcast.
//!
//! The room is sans-io and single-writer: the hosting environment owns
//! the periodic tick and the grace-delay scheduling, serializes all calls
//! into one room, and passes the current time in. The room itself never
//! spawns background work.

use enum_map::{Enum, EnumMap, enum_map};
use garde::Validate;
use serde::{Deserialize, Serialize};
use web_time::{Duration, SystemTime};

use crate::{
    StateMessage, UpdateMessage, constants,
    projection::{PlayerSummary, PublicPlayer, Role, RoomStateView},
    roster::{ConnectionId, Identity, Player, PlayerId, Roster},
    session::Tunnel,
    words::{WordBank, letter_board},
};

/// The current phase of the room
///
/// Phases cycle `RoomGathering → WordSelection → WordDrawing →
/// RoundResults → WordSelection → …` for a fixed number of rounds, with a
/// `WordNotSelected` side branch when the drawer never picks a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting for enough players to join
    RoomGathering,
    /// The drawer is choosing among candidate words
    WordSelection,
    /// The drawer draws while everyone else guesses
    WordDrawing,
    /// Nobody picked a word in time; shown before resetting
    WordNotSelected,
    /// The word is revealed together with the round's scores
    RoundResults,
}

/// Messages received from clients
///
/// Deserialized from the `{type, payload}` JSON envelope. Every variant is
/// a no-op unless the room is in a phase where it is semantically valid;
/// unknown types fail deserialization and are dropped by the router.
#[derive(Debug, Deserialize, Clone, Validate)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// Drawer picks one of the candidate words
    WordSelect {
        /// The chosen word; must be among the current candidates
        #[garde(length(chars, max = constants::payload::MAX_WORD_LENGTH))]
        word: String,
    },
    /// Drawer replaces the drawing snapshot
    WordDraw {
        /// Opaque serialized strokes; the wire key keeps the client's
        /// camelCase spelling
        #[serde(rename = "strokesPayload")]
        #[garde(length(bytes, max = constants::payload::MAX_STROKES_BYTES))]
        strokes_payload: String,
    },
    /// Guesser submits a guess at the secret word
    WordGuess {
        /// The guessed word, compared case-insensitively
        #[garde(length(chars, max = constants::payload::MAX_WORD_LENGTH))]
        word: String,
    },
    /// Drawer asks for a fresh set of candidate words
    NewWords {},
    /// Cosmetic reaction echoed to the whole room
    Reaction {
        /// The reaction emoji
        #[garde(length(chars, max = constants::payload::MAX_EMOJI_LENGTH))]
        emoji: String,
    },
}

impl IncomingMessage {
    /// Parses a raw JSON envelope into a message
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` for non-parseable envelopes and
    /// unknown message types.
    pub fn from_message(message: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(message)
    }
}

/// The authoritative session for one drawing-and-guessing room
///
/// Owns the roster, the phase automaton, and all per-round state. All
/// mutation goes through [`Room::tick`], [`Room::receive_message`],
/// [`Room::join`], [`Room::detach`] and [`Room::reap_if_still_absent`],
/// which the host must call from a single writer per room.
#[derive(Debug)]
pub struct Room {
    roster: Roster,
    word_bank: WordBank,
    phase: Phase,
    round: u32,
    phase_started_at: SystemTime,
    phase_ends_at: SystemTime,
    drawer: Option<PlayerId>,
    candidate_words: Vec<String>,
    selected_word: Option<String>,
    strokes_payload: String,
    guess_letter_board: Option<Vec<char>>,
    turn_cursor: usize,
    durations: EnumMap<Phase, Duration>,
}

impl Room {
    /// Creates a new room in the gathering phase
    ///
    /// # Arguments
    ///
    /// * `word_bank` - The vocabulary candidate words are sampled from
    /// * `now` - The current time, supplied by the host
    pub fn new(word_bank: WordBank, now: SystemTime) -> Self {
        let durations = enum_map! {
            Phase::RoomGathering => {
                Duration::from_secs(constants::phase::ROOM_GATHERING_SECONDS)
            }
            Phase::WordSelection => {
                Duration::from_secs(constants::phase::WORD_SELECTION_SECONDS)
            }
            Phase::WordDrawing => Duration::from_secs(constants::phase::WORD_DRAWING_SECONDS),
            Phase::WordNotSelected => {
                Duration::from_secs(constants::phase::WORD_NOT_SELECTED_SECONDS)
            }
            Phase::RoundResults => Duration::from_secs(constants::phase::ROUND_RESULTS_SECONDS),
        };

        Self {
            roster: Roster::new(),
            word_bank,
            phase: Phase::RoomGathering,
            round: 1,
            phase_started_at: now,
            phase_ends_at: now + durations[Phase::RoomGathering],
            drawer: None,
            candidate_words: Vec::new(),
            selected_word: None,
            strokes_payload: String::new(),
            guess_letter_board: None,
            turn_cursor: 0,
            durations,
        }
    }

    /// The current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The current round, 1-based
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The current drawer, if any
    pub fn drawer(&self) -> Option<PlayerId> {
        self.drawer
    }

    /// When the current phase times out
    pub fn phase_ends_at(&self) -> SystemTime {
        self.phase_ends_at
    }

    /// The candidate words offered to the drawer
    pub fn candidate_words(&self) -> &[String] {
        &self.candidate_words
    }

    /// The secret word, once selected
    pub fn selected_word(&self) -> Option<&str> {
        self.selected_word.as_deref()
    }

    /// The latest drawing snapshot
    pub fn strokes_payload(&self) -> &str {
        &self.strokes_payload
    }

    /// The letter-scramble board for the current word
    pub fn guess_letter_board(&self) -> Option<&[char]> {
        self.guess_letter_board.as_deref()
    }

    /// The player roster
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    // Network

    /// Attaches a new connection for an authenticated identity
    ///
    /// Idempotent per identity: a reconnect attaches to the existing
    /// player. Triggers a full state broadcast so everyone sees the
    /// updated roster and the new connection gets its initial view.
    ///
    /// # Errors
    ///
    /// Returns `roster::Error::MaximumPlayers` if the identity is new and
    /// the room is full.
    pub fn join<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        identity: Identity,
        connection: ConnectionId,
        now: SystemTime,
        tunnel_finder: F,
    ) -> Result<(), crate::roster::Error> {
        let player_id = self.roster.join(identity, connection, now)?.id();
        tracing::debug!(%player_id, %connection, "connection joined");

        self.broadcast_state(now, &tunnel_finder);
        Ok(())
    }

    /// Removes a closed or errored connection from its player
    ///
    /// If the player has no connections left, asks the host to schedule a
    /// [`Room::reap_if_still_absent`] call after the grace delay. Never
    /// cancels in-flight timers.
    ///
    /// # Arguments
    ///
    /// * `schedule_reap` - Host callback scheduling the delayed reap check
    pub fn detach<S: FnMut(PlayerId, Duration)>(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        mut schedule_reap: S,
    ) {
        if self.roster.detach(player_id, connection) {
            tracing::debug!(%player_id, %connection, "player fully disconnected");
            schedule_reap(
                player_id,
                Duration::from_secs(constants::room::DISCONNECT_GRACE_SECONDS),
            );
        }
    }

    /// Removes a player whose grace window elapsed without a reconnect
    ///
    /// Tolerates the reaped player being the current drawer: word
    /// selection re-enters with the next drawer in rotation, an active
    /// drawing round is cut short to results.
    pub fn reap_if_still_absent<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: PlayerId,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        let Some(player) = self.roster.reap_if_still_absent(player_id) else {
            return;
        };
        tracing::debug!(%player_id, "player reaped after grace period");

        if self.drawer == Some(player.id()) {
            self.drawer = None;
            match self.phase {
                Phase::WordSelection => self.enter_word_selection(now),
                Phase::WordDrawing => self.enter_phase(Phase::RoundResults, now),
                _ => (),
            }
        }

        // the reaped player may have been the last one still guessing
        if self.phase == Phase::WordDrawing && self.all_guessers_done() {
            self.wind_down(now);
        }

        self.broadcast_state(now, &tunnel_finder);
    }

    /// Drives the room forward one tick
    ///
    /// Runs phase-transition logic strictly before the state broadcast so
    /// clients never observe a stale phase after a transition in the same
    /// tick.
    pub fn tick<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        self.advance(now, &tunnel_finder);
        self.broadcast_state(now, &tunnel_finder);
    }

    /// Routes a raw inbound envelope from a connection
    ///
    /// Malformed envelopes and payloads failing validation are logged and
    /// dropped; the connection stays open.
    pub fn receive_message<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        sender: PlayerId,
        message: &str,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        match IncomingMessage::from_message(message) {
            Ok(message) => self.apply_message(sender, message, now, tunnel_finder),
            Err(error) => {
                tracing::warn!(%sender, %error, "dropping malformed message");
            }
        }
    }

    /// Applies an already-parsed message against the current phase
    ///
    /// Messages that are invalid in the current phase, or sent by a player
    /// without the required role, are silently ignored.
    pub fn apply_message<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        sender: PlayerId,
        message: IncomingMessage,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        if !self.roster.contains(sender) {
            tracing::warn!(%sender, "dropping message from unknown player");
            return;
        }

        if let Err(report) = message.validate() {
            tracing::warn!(%sender, %report, "dropping message failing validation");
            return;
        }

        match message {
            // Only the drawer's selection is applied; the candidate list is
            // drawer-only information, so accepting another player's pick
            // would leak it.
            IncomingMessage::WordSelect { word }
                if self.phase == Phase::WordSelection && self.drawer == Some(sender) =>
            {
                let word = word.to_lowercase();
                if self.candidate_words.contains(&word) {
                    self.selected_word = Some(word);
                    self.enter_word_drawing(now);
                    self.broadcast_state(now, &tunnel_finder);
                }
            }
            IncomingMessage::WordDraw { strokes_payload }
                if self.phase == Phase::WordDrawing && self.drawer == Some(sender) =>
            {
                self.strokes_payload = strokes_payload;
                self.broadcast_state(now, &tunnel_finder);
            }
            IncomingMessage::WordGuess { word }
                if self.phase == Phase::WordDrawing && self.drawer != Some(sender) =>
            {
                self.apply_guess(sender, &word, now, &tunnel_finder);
            }
            IncomingMessage::NewWords {}
                if self.phase == Phase::WordSelection && self.drawer == Some(sender) =>
            {
                self.candidate_words = self.word_bank.sample(constants::words::CANDIDATE_COUNT);
                // refreshed candidates reach the drawer without waiting a tick
                self.roster.send_state_to_player(
                    &self.state_message(Role::Drawer, now),
                    sender,
                    &tunnel_finder,
                );
            }
            IncomingMessage::Reaction { emoji }
                if matches!(self.phase, Phase::WordDrawing | Phase::RoundResults) =>
            {
                self.roster.announce(
                    &UpdateMessage::Reaction {
                        id: uuid::Uuid::new_v4(),
                        emoji,
                        from_player_id: sender,
                    },
                    &tunnel_finder,
                );
            }
            message => {
                tracing::debug!(%sender, ?message, "ignoring message invalid in current phase");
            }
        }
    }

    // Phase automaton

    /// Evaluates the transition rules for the current phase
    fn advance<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: &F,
    ) {
        match self.phase {
            Phase::RoomGathering => {
                // eager on quorum; the gathering duration is display only
                if self.roster.count() >= constants::room::QUORUM {
                    self.enter_word_selection(now);
                }
            }
            Phase::WordSelection => {
                if now >= self.phase_ends_at {
                    self.handle_selection_timeout(now, tunnel_finder);
                }
            }
            Phase::WordDrawing => {
                if now >= self.phase_ends_at {
                    self.enter_phase(Phase::RoundResults, now);
                }
            }
            Phase::RoundResults => {
                if now >= self.phase_ends_at {
                    self.round += 1;
                    if self.round > constants::room::ROUND_LIMIT {
                        self.reset_to_gathering(now);
                    } else {
                        self.enter_word_selection(now);
                    }
                }
            }
            Phase::WordNotSelected => {
                if now >= self.phase_ends_at {
                    self.reset_to_gathering(now);
                }
            }
        }
    }

    /// Handles the selection timer elapsing with no word chosen
    fn handle_selection_timeout<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: &F,
    ) {
        let drawer_name = self
            .drawer
            .and_then(|id| self.roster.get(id))
            .map(|player| player.display_name().to_owned());
        if let Some(name) = drawer_name {
            self.roster.announce(
                &UpdateMessage::Alert {
                    emoji: "⏰".to_owned(),
                    content: format!("{name} did not pick a word in time"),
                },
                tunnel_finder,
            );
        }

        self.round += 1;
        if self.round > constants::room::ROUND_LIMIT {
            self.enter_phase(Phase::WordNotSelected, now);
        } else {
            self.enter_word_selection(now);
        }
    }

    /// Moves to `phase` and arms its timer
    fn enter_phase(&mut self, phase: Phase, now: SystemTime) {
        self.phase = phase;
        self.phase_started_at = now;
        self.phase_ends_at = now + self.durations[phase];
    }

    /// Starts a word-selection phase with the next drawer in rotation
    fn enter_word_selection(&mut self, now: SystemTime) {
        if self.roster.is_empty() {
            self.reset_to_gathering(now);
            return;
        }

        self.selected_word = None;
        self.guess_letter_board = None;
        self.candidate_words = self.word_bank.sample(constants::words::CANDIDATE_COUNT);
        for player in self.roster.iter_mut() {
            player.clear_round_state();
        }
        self.drawer = self.next_drawer();
        self.enter_phase(Phase::WordSelection, now);
    }

    /// Starts the drawing phase for the selected word
    fn enter_word_drawing(&mut self, now: SystemTime) {
        self.strokes_payload.clear();
        self.guess_letter_board = self.selected_word.as_deref().map(letter_board);
        self.enter_phase(Phase::WordDrawing, now);
    }

    /// Resets the room to a fresh game cycle
    ///
    /// Scores, round counter, canvas, board, and word are cleared; the
    /// rotation cursor and roster order persist.
    fn reset_to_gathering(&mut self, now: SystemTime) {
        self.round = 1;
        self.drawer = None;
        self.candidate_words.clear();
        self.selected_word = None;
        self.strokes_payload.clear();
        self.guess_letter_board = None;
        for player in self.roster.iter_mut() {
            player.reset_score();
        }
        self.enter_phase(Phase::RoomGathering, now);
    }

    /// Picks the next drawer, round-robin over join order
    ///
    /// The cursor persists across rounds and game cycles and wraps over
    /// the live roster, so players that left are skipped naturally.
    fn next_drawer(&mut self) -> Option<PlayerId> {
        let order = self.roster.ordered_ids();
        if order.is_empty() {
            return None;
        }
        let index = self.turn_cursor % order.len();
        self.turn_cursor = index + 1;
        Some(order[index])
    }

    // Guessing

    /// Scores a guess against the selected word
    fn apply_guess<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        sender: PlayerId,
        word: &str,
        now: SystemTime,
        tunnel_finder: &F,
    ) {
        let Some(selected) = self.selected_word.clone() else {
            return;
        };

        if word.trim().to_lowercase() != selected {
            self.roster.send_to_player(
                &UpdateMessage::GuessResult { correct: false },
                sender,
                tunnel_finder,
            );
            return;
        }

        let latency = now
            .duration_since(self.phase_started_at)
            .unwrap_or_default();
        let Some(player) = self.roster.get_mut(sender) else {
            return;
        };
        if !player.record_correct_guess(latency) {
            // already guessed this round; never double-score
            return;
        }
        let display_name = player.display_name().to_owned();

        self.roster.send_to_player(
            &UpdateMessage::GuessResult { correct: true },
            sender,
            tunnel_finder,
        );
        self.roster.announce(
            &UpdateMessage::Alert {
                emoji: "🎉".to_owned(),
                content: format!("{display_name} guessed the word!"),
            },
            tunnel_finder,
        );

        if self.all_guessers_done() {
            self.wind_down(now);
        }
    }

    /// Whether every non-drawer player has guessed correctly
    fn all_guessers_done(&self) -> bool {
        let mut any_guesser = false;
        for player in self.roster.iter_ordered() {
            if Some(player.id()) == self.drawer {
                continue;
            }
            any_guesser = true;
            if !player.has_guessed() {
                return false;
            }
        }
        any_guesser
    }

    /// Clamps the remaining drawing time; only ever shortens it
    fn wind_down(&mut self, now: SystemTime) {
        let cap = now + Duration::from_secs(constants::phase::WIND_DOWN_SECONDS);
        if self.phase_ends_at > cap {
            self.phase_ends_at = cap;
        }
    }

    // Broadcasting

    /// The projection role of a player
    fn role_of(&self, player_id: PlayerId) -> Role {
        if self.drawer == Some(player_id) {
            Role::Drawer
        } else {
            Role::Guesser
        }
    }

    /// Builds the state projection for one recipient role
    pub fn state_view(&self, role: Role, now: SystemTime) -> RoomStateView {
        let reveal_word = match role {
            Role::Drawer => true,
            Role::Guesser | Role::Spectator => self.phase == Phase::RoundResults,
        };

        RoomStateView {
            round: self.round,
            phase: self.phase,
            time_left: self.phase_ends_at.duration_since(now).unwrap_or_default(),
            drawer: self
                .drawer
                .and_then(|id| self.roster.get(id))
                .map(PublicPlayer::from),
            players: self.roster.iter_ordered().map(PlayerSummary::from).collect(),
            strokes_payload: self.strokes_payload.clone(),
            word_length: self
                .selected_word
                .as_ref()
                .map(|word| word.chars().count()),
            letter_board: self.guess_letter_board.clone(),
            selected_word: if reveal_word {
                self.selected_word.clone()
            } else {
                None
            },
            candidate_words: if matches!(role, Role::Drawer) {
                Some(self.candidate_words.clone())
            } else {
                None
            },
        }
    }

    /// Builds the full state message for one recipient role
    pub fn state_message(&self, role: Role, now: SystemTime) -> StateMessage {
        self.state_view(role, now).into()
    }

    /// Sends every connection its role-appropriate state projection
    fn broadcast_state<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        now: SystemTime,
        tunnel_finder: &F,
    ) {
        self.roster.sync_with(
            |player: &Player| self.state_message(self.role_of(player.id()), now),
            tunnel_finder,
        );
    }
}
