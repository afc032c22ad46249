//! Bounded conversation memory.
//!
//! Holds the most recent question/answer [`Turn`]s of one session in a
//! ring buffer. Once `max_turns` is reached, each append evicts the oldest
//! turn, which keeps the rewrite prompt from growing without limit.

use std::collections::VecDeque;

use crate::models::Turn;

pub const DEFAULT_MAX_TURNS: usize = 20;

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns),
            max_turns,
        }
    }

    /// Record a completed turn, evicting the oldest one when full.
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        if self.turns.len() == self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Turns in insertion order, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Render the transcript for prompting: a `Human:` line followed by an
    /// `AI:` line per turn, oldest first. Empty when there is no history.
    pub fn buffer_string(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("Human: {}\nAI: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
