//! Turn handling: relay one user message to the model and record the answer
//!
//! Each call appends exactly two turns: the user's message, then either the
//! model's reply or the fixed fallback reply. A failed completion never
//! escapes as an error; its detail goes to the operator instead.

use crate::llm::{LlmRequest, LlmService};
use crate::persona::{build_prompt, operator_error, FALLBACK_REPLY};
use crate::transcript::{Transcript, Turn};
use std::sync::Arc;

/// Result of relaying one user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model's text was appended as the assistant turn
    Replied,
    /// The fallback reply was appended; `operator_error` describes the failure
    Fallback { operator_error: String },
}

impl TurnOutcome {
    pub fn operator_error(&self) -> Option<&str> {
        match self {
            TurnOutcome::Replied => None,
            TurnOutcome::Fallback { operator_error } => Some(operator_error),
        }
    }
}

/// Relays user turns to the completion service
pub struct TurnOrchestrator {
    llm: Arc<dyn LlmService>,
    max_output_tokens: Option<u32>,
}

impl TurnOrchestrator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            max_output_tokens: None,
        }
    }

    /// Cap the length of every reply; `None` leaves it to the model
    pub fn with_max_output_tokens(mut self, max: Option<u32>) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Append the user's message, ask the model, append its reply.
    ///
    /// `text` must be non-empty; the HTTP layer rejects blank input.
    pub async fn handle_user_message(&self, transcript: &mut Transcript, text: &str) -> TurnOutcome {
        debug_assert!(!transcript.is_empty(), "transcripts start seeded");
        transcript.append(Turn::user(text));

        let mut request = LlmRequest::new(build_prompt(text));
        if let Some(max) = self.max_output_tokens {
            request = request.with_max_output_tokens(max);
        }

        match self.llm.complete(&request).await {
            Ok(response) => {
                transcript.append(Turn::assistant(response.text));
                TurnOutcome::Replied
            }
            Err(e) => {
                let operator_error = operator_error(&e.message);
                tracing::error!(kind = ?e.kind, error = %e.message, "Completion failed, using fallback reply");
                transcript.append(Turn::assistant(FALLBACK_REPLY));
                TurnOutcome::Fallback { operator_error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlmService;
    use crate::llm::{LlmError, LlmResponse, Usage};
    use crate::persona::{GREETING, PERSONA_INSTRUCTIONS};
    use proptest::prelude::*;

    fn orchestrator() -> (TurnOrchestrator, Arc<MockLlmService>) {
        let mock = Arc::new(MockLlmService::new("mock-model"));
        (TurnOrchestrator::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_hello_hi_there() {
        let (orch, mock) = orchestrator();
        mock.queue_text("Hi there");
        let mut transcript = Transcript::seeded();

        let outcome = orch.handle_user_message(&mut transcript, "Hello").await;

        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(outcome.operator_error(), None);
        assert_eq!(
            transcript.all(),
            &[
                Turn::assistant(GREETING),
                Turn::user("Hello"),
                Turn::assistant("Hi there"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_appends_fallback() {
        let (orch, mock) = orchestrator();
        mock.queue_error(LlmError::auth("Authentication failed: API key not valid"));
        let mut transcript = Transcript::seeded();

        let outcome = orch.handle_user_message(&mut transcript, "Hello").await;

        assert_eq!(
            transcript.all(),
            &[
                Turn::assistant(GREETING),
                Turn::user("Hello"),
                Turn::assistant(FALLBACK_REPLY),
            ]
        );
        assert_eq!(
            outcome.operator_error(),
            Some("An error occurred: Authentication failed: API key not valid")
        );
        assert!(transcript
            .all()
            .iter()
            .all(|t| !t.content.contains("API key not valid")));
    }

    #[tokio::test]
    async fn test_reply_is_not_transformed() {
        let (orch, mock) = orchestrator();
        let reply = "  Here you go:\n\n```css\n.box { display: grid; }\n```\n\n";
        mock.queue_response(LlmResponse {
            text: reply.to_string(),
            finish_reason: Some("MAX_TOKENS".to_string()),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        });
        let mut transcript = Transcript::seeded();

        orch.handle_user_message(&mut transcript, "grid?").await;

        assert_eq!(transcript.last().map(|t| t.content.as_str()), Some(reply));
    }

    #[tokio::test]
    async fn test_only_latest_message_is_sent() {
        let (orch, mock) = orchestrator();
        mock.queue_text("first answer");
        mock.queue_text("second answer");
        let mut transcript = Transcript::seeded();

        orch.handle_user_message(&mut transcript, "first question").await;
        orch.handle_user_message(&mut transcript, "second question").await;

        let prompts = mock.recorded_prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1], build_prompt("second question"));
        assert!(prompts[1].starts_with(PERSONA_INSTRUCTIONS));
        assert!(!prompts[1].contains("first question"));
        assert!(!prompts[1].contains("first answer"));
        assert!(!prompts[1].contains(GREETING));
    }

    #[tokio::test]
    async fn test_output_token_cap_is_sent() {
        let mock = Arc::new(MockLlmService::new("mock-model"));
        mock.queue_text("short");
        mock.queue_text("unbounded");
        let capped = TurnOrchestrator::new(mock.clone()).with_max_output_tokens(Some(256));
        let uncapped = TurnOrchestrator::new(mock.clone());
        let mut transcript = Transcript::seeded();

        capped.handle_user_message(&mut transcript, "one").await;
        uncapped.handle_user_message(&mut transcript, "two").await;

        let requests = mock.recorded_requests();
        assert_eq!(requests[0].max_output_tokens, Some(256));
        assert_eq!(requests[1].max_output_tokens, None);
    }

    #[tokio::test]
    async fn test_session_usable_after_failure() {
        let (orch, mock) = orchestrator();
        mock.queue_error(LlmError::network("Connection failed"));
        mock.queue_text("Back online");
        let mut transcript = Transcript::seeded();

        orch.handle_user_message(&mut transcript, "one").await;
        let outcome = orch.handle_user_message(&mut transcript, "two").await;

        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript.last(), Some(&Turn::assistant("Back online")));
    }

    proptest! {
        #[test]
        fn prop_two_turns_per_message(
            script in proptest::collection::vec(
                ("[a-zA-Z0-9 ?]{1,30}", proptest::option::of("[a-zA-Z0-9 .]{1,30}")),
                0..12,
            )
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let (orch, mock) = orchestrator();
            for (_, reply) in &script {
                match reply {
                    Some(text) => mock.queue_text(text.clone()),
                    None => mock.queue_error(LlmError::server_error("boom")),
                }
            }

            let mut transcript = Transcript::seeded();
            runtime.block_on(async {
                for (message, _) in &script {
                    orch.handle_user_message(&mut transcript, message).await;
                }
            });

            prop_assert_eq!(transcript.len(), 1 + 2 * script.len());
            for (i, (message, reply)) in script.iter().enumerate() {
                let user = &transcript.all()[1 + 2 * i];
                let assistant = &transcript.all()[2 + 2 * i];
                prop_assert_eq!(user, &Turn::user(message.clone()));
                let expected = reply.clone().unwrap_or_else(|| FALLBACK_REPLY.to_string());
                prop_assert_eq!(assistant, &Turn::assistant(expected));
            }
        }
    }
}
