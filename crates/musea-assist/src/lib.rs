//! musea-assist
//!
//! The conversational layer on top of hybrid retrieval: question
//! contextualization against the session window, grounded answer assembly
//! with citations and media, and the chat generators behind it.

pub mod assembler;
pub mod assistant;
pub mod contextualize;
pub mod generator;
pub mod lang;

pub use assembler::{AnswerPayload, Citation};
pub use assistant::Assistant;
pub use generator::{generator_from_settings, GeneratorRegistry, OllamaGenerator, OpenAiGenerator};
