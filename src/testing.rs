//! Scripted mock client for strategy and engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, TokenUsage};

enum Scripted {
    Reply(String),
    Fail(String),
    Hang(Duration),
}

/// In-memory [`LlmClient`] driven by a scripted response queue. When the
/// queue is exhausted it falls back to numbered `"mock response N"` replies,
/// so tests only script the calls they care about. Every call reports a
/// fixed usage of 10 input / 5 output tokens.
pub(crate) struct MockClient {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(message.into()));
    }

    pub fn push_hang(&self, duration: Duration) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Hang(duration));
    }

    /// Prompts of every request seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let call_num = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        let next = self.script.lock().unwrap().pop_front();
        let content = match next {
            Some(Scripted::Reply(text)) => text,
            Some(Scripted::Fail(message)) => return Err(Error::Llm(message)),
            Some(Scripted::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                "late response".to_string()
            }
            None => format!("mock response {}", call_num),
        };

        Ok(CompletionResponse {
            model: request
                .model
                .unwrap_or_else(|| "mock-model".to_string()),
            content,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
            timestamp: Utc::now(),
        })
    }
}
