//! Mock Completion Service
//!
//! Returns pre-configured replies in order and records every request it sees.
//! Useful for tests and for wiring an agent without a live backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{ChatReply, ChatRequest, CompletionService};
use crate::error::{AgentError, Result};

enum Script {
    Queue(VecDeque<Result<ChatReply>>),
    Repeat(ChatReply),
}

/// A mock provider that returns pre-configured replies
pub struct MockProvider {
    script: Mutex<Script>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    /// Create a mock provider with a sequence of replies
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    /// Create a mock provider whose calls may also fail
    pub fn with_results(results: Vec<Result<ChatReply>>) -> Self {
        Self {
            script: Mutex::new(Script::Queue(results.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock provider that answers every call with the same reply
    pub fn repeat(reply: ChatReply) -> Self {
        Self {
            script: Mutex::new(Script::Repeat(reply)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of `complete` calls made so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionService for MockProvider {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        request: &ChatRequest,
    ) -> Result<ChatReply> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        self.requests
            .lock()
            .map_err(|_| AgentError::Provider("mock request log poisoned".into()))?
            .push(request.clone());

        let mut script = self
            .script
            .lock()
            .map_err(|_| AgentError::Provider("mock script poisoned".into()))?;

        match &mut *script {
            // An exhausted script answers with an empty reply
            Script::Queue(queue) => queue.pop_front().unwrap_or_else(|| Ok(ChatReply::default())),
            Script::Repeat(reply) => Ok(reply.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenUsage;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".into(),
            turns: Vec::new(),
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_replies_in_order_then_empty() {
        let provider = MockProvider::new(vec![
            ChatReply::text("one", TokenUsage::new(1, 1, 2)),
            ChatReply::text("two", TokenUsage::new(1, 1, 2)),
        ]);
        let cancel = CancellationToken::new();

        let first = provider.complete(&cancel, &request()).await.unwrap();
        let second = provider.complete(&cancel, &request()).await.unwrap();
        let third = provider.complete(&cancel, &request()).await.unwrap();

        assert_eq!(first.content_text(), Some("one"));
        assert_eq!(second.content_text(), Some("two"));
        assert!(third.is_empty());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let provider =
            MockProvider::with_results(vec![Err(AgentError::RateLimited("429".into()))]);
        let err = provider
            .complete(&CancellationToken::new(), &request())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let provider = MockProvider::repeat(ChatReply::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = provider.complete(&cancel, &request()).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(provider.call_count(), 0);
    }
}
