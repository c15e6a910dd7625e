use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use musea_core::config::PromptSettings;
use musea_core::traits::Generator;
use musea_core::types::ConversationTurn;
use musea_core::Error;
use musea_hybrid::HybridEngine;
use musea_session::SessionStore;

use crate::assembler::{self, AnswerPayload};
use crate::contextualize::contextualize;
use crate::lang;

/// The conversational front of the engine. One assistant serves many
/// sessions; each session keeps its own window and shown-media registry.
pub struct Assistant {
    engine: HybridEngine,
    generator: Arc<dyn Generator>,
    sessions: Mutex<SessionStore>,
    // One turn at a time per session, so window append order stays defined.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    prompts: PromptSettings,
}

impl Assistant {
    pub fn new(
        engine: HybridEngine,
        generator: Arc<dyn Generator>,
        prompts: PromptSettings,
        window_size: usize,
    ) -> Self {
        Self {
            engine,
            generator,
            sessions: Mutex::new(SessionStore::new(window_size)),
            turn_locks: Mutex::new(HashMap::new()),
            prompts,
        }
    }

    /// Answer one question in `session_id`'s conversation.
    ///
    /// The rewritten question only drives retrieval; the model answers the
    /// question as the user asked it. A failed generation fails the turn and
    /// leaves the window untouched, so a retry sees the same history.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<AnswerPayload> {
        let turn_lock = {
            let mut locks = self.turn_locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _turn = turn_lock.lock().await;

        let history: Vec<ConversationTurn> = {
            let mut sessions = self.sessions.lock().await;
            sessions.get_or_create(session_id).window.as_slice()
        };

        let retrieval_query = contextualize(
            self.generator.as_ref(),
            &self.prompts.contextualize,
            &history,
            question,
        )
        .await;
        let results = self.engine.search(&retrieval_query).await?;
        info!(
            session = session_id,
            retrieved = results.len(),
            "retrieval complete"
        );

        let context = assembler::build_context(&results);
        let system = assembler::render_system_prompt(&self.prompts.system, &context);
        let answer = self
            .generator
            .generate(&system, &history, question)
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let citations = assembler::citations(&results, lang::detect(question));
        let mut sessions = self.sessions.lock().await;
        let ctx = sessions.get_or_create(session_id);
        let media = assembler::select_media(&results, &mut ctx.shown_media);
        ctx.window.append(ConversationTurn::new(question, answer.clone()));

        Ok(AnswerPayload { answer, citations, media })
    }

    /// Drop the session's window and shown-media registry.
    pub async fn reset(&self, session_id: &str) {
        self.sessions.lock().await.reset(session_id);
    }
}
