//! musea-session
//!
//! Per-session conversational state: the bounded question/answer window the
//! contextualizer reads, and the registry of media already shown to the
//! user. Both live and die together with the session.

pub mod store;
pub mod window;

pub use store::{SessionContext, SessionStore};
pub use window::{ConversationWindow, MediaRegistry};
