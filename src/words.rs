//! Word bank sampling and guess-letter boards
//!
//! The bank holds the candidate vocabulary for a room; its content comes
//! from the hosting environment. Words are normalized to lowercase on the
//! way in so selection and guess comparison stay case-insensitive.

use itertools::Itertools;

use crate::constants::words::{ALPHABET, MAX_WORD_LENGTH};

/// The vocabulary a room draws its candidate words from
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    words: Vec<String>,
}

impl WordBank {
    /// Builds a bank from an iterator of words
    ///
    /// Words are lowercased, trimmed, deduplicated, and bounded in length;
    /// empty entries are discarded.
    pub fn new<I: IntoIterator<Item = String>>(words: I) -> Self {
        Self {
            words: words
                .into_iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty() && word.chars().count() <= MAX_WORD_LENGTH)
                .unique()
                .collect(),
        }
    }

    /// Number of words in the bank
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the bank holds no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Samples up to `count` distinct words uniformly at random
    pub fn sample(&self, count: usize) -> Vec<String> {
        let mut indices = (0..self.words.len()).collect_vec();
        fastrand::shuffle(&mut indices);
        indices
            .into_iter()
            .take(count)
            .map(|index| self.words[index].clone())
            .collect_vec()
    }
}

/// Generates the guess-letter board for a secret word
///
/// Samples as many filler letters as the word is long from the alphabet
/// letters absent from the word, mixes them with the word's own letters,
/// and shuffles the result. Clients render this as a letter-scramble hint
/// that reveals neither order nor position.
pub fn letter_board(word: &str) -> Vec<char> {
    let mut board = word.chars().collect_vec();
    let absent = ALPHABET
        .chars()
        .filter(|letter| !word.contains(*letter))
        .collect_vec();

    for _ in 0..board.len() {
        if let Some(filler) = fastrand::choice(&absent) {
            board.push(*filler);
        }
    }

    fastrand::shuffle(&mut board);
    board
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> WordBank {
        WordBank::new(
            ["dog", "Elephant", "car", "dog", "  house "]
                .into_iter()
                .map(str::to_owned),
        )
    }

    #[test]
    fn test_bank_normalizes_and_dedupes() {
        let bank = bank();
        assert_eq!(bank.len(), 4);
        assert!(bank.sample(10).contains(&"elephant".to_owned()));
    }

    #[test]
    fn test_bank_drops_empty_and_oversized_words() {
        let bank = WordBank::new(
            ["", "   ", &"a".repeat(MAX_WORD_LENGTH + 1), "ok"]
                .into_iter()
                .map(str::to_owned),
        );
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn test_sample_returns_distinct_words() {
        let bank = bank();
        let sampled = bank.sample(3);
        assert_eq!(sampled.len(), 3);
        assert_eq!(sampled.iter().unique().count(), 3);
        for word in &sampled {
            assert!(bank.sample(bank.len()).contains(word));
        }
    }

    #[test]
    fn test_sample_is_capped_by_bank_size() {
        let bank = bank();
        assert_eq!(bank.sample(100).len(), bank.len());
        assert!(WordBank::default().sample(3).is_empty());
    }

    #[test]
    fn test_letter_board_is_twice_the_word_length() {
        let board = letter_board("dog");
        assert_eq!(board.len(), 6);
    }

    #[test]
    fn test_letter_board_contains_the_word_letters() {
        let board = letter_board("elephant");
        let mut remaining = board.clone();
        for letter in "elephant".chars() {
            let position = remaining
                .iter()
                .position(|candidate| *candidate == letter)
                .expect("board is missing a word letter");
            remaining.remove(position);
        }
        // the leftovers are fillers sampled from letters absent in the word
        assert_eq!(remaining.len(), "elephant".chars().count());
        for filler in remaining {
            assert!(!"elephant".contains(filler));
            assert!(ALPHABET.contains(filler));
        }
    }
}
