use musea_core::types::ConversationTurn;
use std::collections::{HashSet, VecDeque};

/// Bounded FIFO window over completed question/answer turns.
///
/// Only successful turns enter the window; a failed generation leaves it
/// untouched. When full, appending evicts the oldest turn.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Turns oldest-first, the order chat history is replayed in.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn as_slice(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Media URLs already surfaced to this session. A URL registers once; the
/// second sighting is suppressed until the session resets.
#[derive(Debug, Clone, Default)]
pub struct MediaRegistry {
    shown: HashSet<String>,
}

impl MediaRegistry {
    /// Returns true when the URL was not yet shown, marking it as shown.
    pub fn register(&mut self, url: &str) -> bool {
        self.shown.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.shown.contains(url)
    }

    pub fn clear(&mut self) {
        self.shown.clear();
    }
}
