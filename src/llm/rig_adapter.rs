//! Bridges a rig `CompletionModel` to [`LlmProvider`].

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};
use tracing::debug;

use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};
use crate::error::LlmError;

/// Anthropic rejects requests without a token budget.
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }

    fn map_error(&self, err: CompletionError) -> LlmError {
        let provider = self.model_name.clone();
        let reason = err.to_string();
        let lower = reason.to_lowercase();
        if lower.contains("rate_limit") || lower.contains("429") {
            LlmError::RateLimited {
                provider,
                retry_after: None,
            }
        } else if lower.contains("authentication") || lower.contains("401") {
            LlmError::AuthFailed { provider }
        } else if matches!(err, CompletionError::ResponseError(_)) {
            LlmError::InvalidResponse { provider, reason }
        } else {
            LlmError::RequestFailed { provider, reason }
        }
    }
}

/// System messages become the preamble; the rest become rig chat history.
fn split_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let chat = messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant => Some(Message::assistant(m.content.clone())),
            Role::System => None,
        })
        .collect();
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));
    (preamble, chat)
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, mut history) = split_messages(&request.messages);
        let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: "completion request has no messages".to_string(),
        })?;

        let mut builder = self
            .model
            .completion_request(prompt)
            .messages(history)
            .max_tokens(u64::from(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)));
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let content = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");
        let input_tokens = u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX);
        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);
        debug!(
            model = %self.model_name,
            input_tokens,
            output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
        })
    }
}
