//! Ordered turn history for one identification request.

use partscan_gemini::{Part, Role, Turn};

/// Append-only conversation history, cleared between requests.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    turns: Vec<Turn>,
}

impl ConversationSession {
    /// An empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Records a completed exchange: the request parts and the service reply.
    pub fn record_exchange(&mut self, request: Vec<Part>, reply: impl Into<String>) {
        self.turns.push(Turn::requester(request));
        self.turns.push(Turn::service(reply));
    }

    /// Turns in order, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of recorded turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the session holds no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Text of the most recent service turn.
    #[must_use]
    pub fn last_reply(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Service)
            .and_then(|t| t.parts.iter().find_map(Part::as_text))
    }

    /// Drops all turns.
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}
