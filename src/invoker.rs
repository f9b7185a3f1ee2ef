//! Sub-query invoker: the single choke point for sub-model calls.
//!
//! Every strategy goes through [`SubQueryInvoker`]; nothing else talks to
//! the client. Each dispatch produces a [`SubCallRecord`] whether the call
//! succeeded or failed, so the telemetry log stays complete even when a
//! strategy aborts. Failures are real `Err` values, never error-shaped
//! answer text, and every call runs under the configured deadline.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::config::RlmConfig;
use crate::context::{ContextEnvironment, SubCallRecord};
use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, LlmClient};

/// Delimiter separating the instruction from an attached context chunk.
const CONTEXT_DELIMITER: (&str, &str) = ("\n\n---\nCONTEXT:\n", "\n---");

/// One sub-call request.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    /// The query/instruction for the sub-model
    pub prompt: String,
    /// Optional context chunk appended to the prompt with a delimiter
    pub context: Option<String>,
    /// Model override (defaults to the configured sub-model)
    pub model: Option<String>,
    /// Max output tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}

impl InvokeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
            model: None,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Makes sub-model calls and records cost/telemetry.
#[derive(Clone)]
pub struct SubQueryInvoker {
    client: Arc<dyn LlmClient>,
    config: RlmConfig,
}

impl SubQueryInvoker {
    pub fn new(client: Arc<dyn LlmClient>, config: RlmConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RlmConfig {
        &self.config
    }

    /// Dispatch one sub-call and record it into the environment.
    pub async fn invoke(
        &self,
        request: InvokeRequest,
        env: &mut ContextEnvironment,
    ) -> Result<String> {
        let (result, record) = self.dispatch(request).await;
        env.record_sub_call(record);
        result
    }

    /// Dispatch one sub-call without touching any environment. Used by the
    /// parallel map phase: workers return their own records, and the caller
    /// folds them into the environment in order after the parallel section.
    pub async fn dispatch(&self, request: InvokeRequest) -> (Result<String>, SubCallRecord) {
        let model = request
            .model
            .unwrap_or_else(|| self.config.sub_model.clone());
        let context_chars = request
            .context
            .as_deref()
            .map(|c| c.chars().count())
            .unwrap_or(0);

        let full_prompt = match &request.context {
            Some(context) => format!(
                "{}{}{}{}",
                request.prompt, CONTEXT_DELIMITER.0, context, CONTEXT_DELIMITER.1
            ),
            None => request.prompt.clone(),
        };

        let completion = CompletionRequest::new(full_prompt)
            .with_model(model.clone())
            .with_max_tokens(request.max_tokens)
            .with_temperature(request.temperature);

        let deadline = Duration::from_secs(self.config.timeout_secs);
        let outcome = match tokio::time::timeout(deadline, self.client.complete(completion)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(self.config.timeout_secs)),
        };

        match outcome {
            Ok(response) => {
                let record = SubCallRecord::new(
                    model,
                    &request.prompt,
                    context_chars,
                    &response.content,
                    response.usage.input_tokens,
                    response.usage.output_tokens,
                );
                (Ok(response.content), record)
            }
            Err(err) => {
                error!(%err, "sub-call failed");
                // Best-effort record with zero token counts.
                let record = SubCallRecord::new(
                    model,
                    &request.prompt,
                    context_chars,
                    &err.to_string(),
                    0,
                    0,
                );
                (Err(err), record)
            }
        }
    }
}
