//! Configuration constants for the scribble room engine
//!
//! This module contains the fixed timings and limits used throughout the
//! room engine. Phase durations and the round limit define the shape of a
//! game cycle; the remaining groups bound inbound payloads.

/// Room-level limits and cadences
pub mod room {
    /// Maximum number of players allowed in a single room
    pub const MAX_PLAYER_COUNT: usize = 16;
    /// Minimum number of players required to leave the gathering phase
    pub const QUORUM: usize = 2;
    /// Number of rounds in one game cycle before a full reset
    pub const ROUND_LIMIT: u32 = 4;
    /// Cadence of the host-driven tick in seconds
    pub const TICK_SECONDS: u64 = 1;
    /// Grace period before a fully disconnected player is reaped
    pub const DISCONNECT_GRACE_SECONDS: u64 = 10;
}

/// Phase durations in seconds
pub mod phase {
    /// Waiting for players; advisory only, quorum overrides the timer
    pub const ROOM_GATHERING_SECONDS: u64 = 5;
    /// Time the drawer has to pick a word
    pub const WORD_SELECTION_SECONDS: u64 = 20;
    /// Time the drawer has to draw while others guess
    pub const WORD_DRAWING_SECONDS: u64 = 60;
    /// Notice shown when no word was picked in time
    pub const WORD_NOT_SELECTED_SECONDS: u64 = 10;
    /// Reveal of the word and the round's scores
    pub const ROUND_RESULTS_SECONDS: u64 = 12;
    /// Remaining drawing time once every guesser has guessed correctly
    pub const WIND_DOWN_SECONDS: u64 = 5;
}

/// Word bank and guess-letter board constants
pub mod words {
    /// Number of candidate words offered to the drawer
    pub const CANDIDATE_COUNT: usize = 3;
    /// Maximum length of a word accepted into the bank
    pub const MAX_WORD_LENGTH: usize = 50;
    /// Alphabet used to sample filler letters for the guess-letter board
    pub const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";
}

/// Bounds on inbound message payloads
pub mod payload {
    /// Maximum length of a guessed or selected word
    pub const MAX_WORD_LENGTH: usize = 100;
    /// Maximum size of a drawing snapshot in bytes
    pub const MAX_STROKES_BYTES: usize = 262_144;
    /// Maximum length of a reaction emoji string
    pub const MAX_EMOJI_LENGTH: usize = 16;
}
