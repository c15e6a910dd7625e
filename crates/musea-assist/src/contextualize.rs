//! Rewrites follow-up questions into standalone retrieval queries.
//!
//! With an empty window there is nothing to resolve, so the question passes
//! through without a generation call. A failed or empty rewrite falls back
//! to the original question; contextualization never fails a turn.

use tracing::warn;

use musea_core::traits::Generator;
use musea_core::types::ConversationTurn;

pub async fn contextualize(
    generator: &dyn Generator,
    prompt: &str,
    history: &[ConversationTurn],
    question: &str,
) -> String {
    if history.is_empty() {
        return question.to_string();
    }
    match generator.generate(prompt, history, question).await {
        Ok(rewritten) => {
            let rewritten = rewritten.trim();
            if rewritten.is_empty() {
                warn!("contextualizer returned an empty rewrite, keeping the original question");
                question.to_string()
            } else {
                rewritten.to_string()
            }
        }
        Err(e) => {
            warn!(error = %e, "contextualizer failed, keeping the original question");
            question.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted generator: returns a fixed reply and counts invocations.
    struct Scripted {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), calls: AtomicUsize::new(0) }
        }

        fn failing(message: &str) -> Self {
            Self { reply: Err(message.to_string()), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            _system: &str,
            _history: &[ConversationTurn],
            _user: &str,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(m) => Err(anyhow!(m.clone())),
            }
        }
    }

    #[tokio::test]
    async fn empty_history_passes_the_question_through_without_a_call() {
        let generator = Scripted::replying("rewritten");
        let out = contextualize(&generator, "prompt", &[], "who painted it?").await;
        assert_eq!(out, "who painted it?");
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn non_empty_history_uses_the_rewrite() {
        let generator = Scripted::replying("who painted the portrait of Leopold I?");
        let history = vec![ConversationTurn::new("show me Leopold I", "here it is")];
        let out = contextualize(&generator, "prompt", &history, "who painted it?").await;
        assert_eq!(out, "who painted the portrait of Leopold I?");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn empty_rewrite_falls_back_to_the_original() {
        let generator = Scripted::replying("   ");
        let history = vec![ConversationTurn::new("q", "a")];
        let out = contextualize(&generator, "prompt", &history, "who painted it?").await;
        assert_eq!(out, "who painted it?");
    }

    #[tokio::test]
    async fn failed_rewrite_falls_back_to_the_original() {
        let generator = Scripted::failing("connection refused");
        let history = vec![ConversationTurn::new("q", "a")];
        let out = contextualize(&generator, "prompt", &history, "who painted it?").await;
        assert_eq!(out, "who painted it?");
        assert_eq!(generator.calls(), 1);
    }
}
