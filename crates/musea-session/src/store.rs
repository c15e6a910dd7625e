use std::collections::HashMap;

use crate::window::{ConversationWindow, MediaRegistry};

/// All mutable state belonging to one conversation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub window: ConversationWindow,
    pub shown_media: MediaRegistry,
}

impl SessionContext {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: ConversationWindow::new(window_size),
            shown_media: MediaRegistry::default(),
        }
    }

    /// Reset drops the window and the shown-media registry together; this is
    /// the only operation that clears the registry.
    pub fn reset(&mut self) {
        self.window.clear();
        self.shown_media.clear();
    }
}

/// In-memory session registry keyed by caller-chosen session ids.
pub struct SessionStore {
    sessions: HashMap<String, SessionContext>,
    window_size: usize,
}

impl SessionStore {
    pub fn new(window_size: usize) -> Self {
        Self { sessions: HashMap::new(), window_size }
    }

    pub fn get_or_create(&mut self, session_id: &str) -> &mut SessionContext {
        let window_size = self.window_size;
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionContext::new(window_size))
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionContext> {
        self.sessions.get(session_id)
    }

    pub fn reset(&mut self, session_id: &str) {
        if let Some(ctx) = self.sessions.get_mut(session_id) {
            ctx.reset();
        }
    }

    pub fn remove(&mut self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}
