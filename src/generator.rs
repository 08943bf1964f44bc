//! Candidate phrase enumeration from word slots

use crate::config::SearchConfig;
use crate::error::{ConfigError, Result};

/// Upper bound on enumerable search spaces
const MAX_SEARCH_SPACE: u64 = 1_000_000_000_000;

/// A candidate phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The words of the phrase
    pub words: Vec<String>,
    /// The phrase as a space-separated string
    pub phrase: String,
    /// Sequence number within the run
    pub id: u64,
}

impl Candidate {
    /// Create a new candidate from words
    pub fn new(words: Vec<String>, id: u64) -> Self {
        let phrase = words.join(" ");
        Self { words, phrase, id }
    }

    /// Get the phrase as a string slice
    pub fn as_str(&self) -> &str {
        &self.phrase
    }
}

/// Lazy enumerator over the cartesian product of the configured word slots
///
/// Candidates are produced in lexicographic product order, the last slot
/// varying fastest. The sequence is finite and non-restartable. A configured
/// fixed phrase short-circuits enumeration to that single candidate.
#[derive(Debug)]
pub struct CandidateGenerator {
    /// Word choices ordered by position
    slots: Vec<Vec<String>>,
    /// Fixed phrase override
    fixed: Option<String>,
    /// Odometer state, one index per slot
    current_indices: Vec<usize>,
    /// Total number of combinations
    total_combinations: u64,
    /// Candidates produced so far
    produced: u64,
    /// Whether the generator is exhausted
    exhausted: bool,
}

impl CandidateGenerator {
    /// Create a new generator from configuration
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let slots = config.ordered_slots();
        let total_combinations = config.total_combinations();

        if total_combinations > MAX_SEARCH_SPACE {
            return Err(ConfigError::SearchSpaceTooLarge(total_combinations).into());
        }

        let current_indices = vec![0; slots.len()];

        Ok(Self {
            slots,
            fixed: config.fixed_phrase.clone(),
            current_indices,
            total_combinations,
            produced: 0,
            exhausted: false,
        })
    }

    /// Get the total number of combinations
    pub fn total_combinations(&self) -> u64 {
        self.total_combinations
    }

    /// Get the number of candidates produced so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Check if the generator is exhausted
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Produce the next candidate, or `None` once the space is exhausted
    pub fn next_candidate(&mut self) -> Option<Candidate> {
        if self.exhausted {
            return None;
        }

        if let Some(phrase) = &self.fixed {
            let words = phrase.split_whitespace().map(str::to_string).collect();
            self.exhausted = true;
            self.produced = 1;
            return Some(Candidate::new(words, 0));
        }

        let words: Vec<String> = self
            .current_indices
            .iter()
            .enumerate()
            .map(|(position, &word_index)| self.slots[position][word_index].clone())
            .collect();
        let candidate = Candidate::new(words, self.produced);

        self.produced += 1;
        self.advance_indices();

        Some(candidate)
    }

    /// Advance the odometer, last position fastest
    fn advance_indices(&mut self) {
        for position in (0..self.slots.len()).rev() {
            self.current_indices[position] += 1;
            if self.current_indices[position] < self.slots[position].len() {
                return;
            }
            self.current_indices[position] = 0;
        }
        // Carry rippled past the first slot: every combination was produced
        self.exhausted = true;
    }
}

impl Iterator for CandidateGenerator {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_candidate()
    }
}
