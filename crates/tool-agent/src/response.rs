//! Response Events
//!
//! Events emitted by the agent during one run, plus the non-streaming
//! [`Completion`] aggregate folded from them.

use futures::{Stream, StreamExt};

use crate::error::{AgentError, Result};
use crate::provider::TokenUsage;

/// An event emitted by the reasoning loop.
///
/// - `Usage`: token counts of one completion call
/// - `Content`: text the model produced in one reply
/// - `Error`: terminal failure; always the last event of a run
#[derive(Debug)]
pub enum Response {
    Usage(TokenUsage),
    Content(String),
    Error(AgentError),
}

impl Response {
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub const fn is_content(&self) -> bool {
        matches!(self, Self::Content(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Usage counts, or zero usage for other events
    pub fn usage(&self) -> TokenUsage {
        match self {
            Self::Usage(usage) => *usage,
            _ => TokenUsage::default(),
        }
    }

    /// Content text, or `""` for other events
    pub fn content(&self) -> &str {
        match self {
            Self::Content(text) => text,
            _ => "",
        }
    }

    pub const fn error(&self) -> Option<&AgentError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Event name, for logs and wire framing
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::Content(_) => "content",
            Self::Error(_) => "error",
        }
    }
}

/// Aggregated result of a full run
#[derive(Debug, Default)]
pub struct Completion {
    /// Content texts in emission order
    pub messages: Vec<String>,

    /// Every event in emission order
    pub responses: Vec<Response>,

    /// Usage summed over every completion call
    pub usage: TokenUsage,
}

impl Completion {
    /// Drain a response stream into a completion.
    ///
    /// The first `Error` event discards everything collected so far and is
    /// returned as the outcome.
    pub async fn collect<S>(stream: S) -> Result<Self>
    where
        S: Stream<Item = Response>,
    {
        let mut completion = Self::default();
        let mut stream = std::pin::pin!(stream);

        while let Some(response) = stream.next().await {
            match response {
                Response::Error(err) => return Err(err),
                Response::Usage(usage) => completion.usage += usage,
                Response::Content(ref text) => completion.messages.push(text.clone()),
            }
            completion.responses.push(response);
        }

        Ok(completion)
    }

    /// All content joined with blank lines
    pub fn text(&self) -> String {
        self.messages.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_on_matching_variant() {
        let usage = Response::Usage(TokenUsage::new(10, 2, 12));
        assert!(usage.is_usage());
        assert_eq!(usage.usage().total_tokens, 12);

        let content = Response::Content("4".into());
        assert!(content.is_content());
        assert_eq!(content.content(), "4");

        let error = Response::Error(AgentError::Cancelled);
        assert!(error.is_error());
        assert!(matches!(error.error(), Some(AgentError::Cancelled)));
    }

    #[test]
    fn test_accessors_on_wrong_variant_return_zero() {
        let content = Response::Content("hi".into());
        assert!(content.usage().is_zero());
        assert!(content.error().is_none());

        let usage = Response::Usage(TokenUsage::new(1, 1, 2));
        assert_eq!(usage.content(), "");
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(Response::Usage(TokenUsage::default()).event_type(), "usage");
        assert_eq!(Response::Content(String::new()).event_type(), "content");
        assert_eq!(Response::Error(AgentError::Cancelled).event_type(), "error");
    }

    #[tokio::test]
    async fn test_collect_sums_usage() {
        let events = vec![
            Response::Usage(TokenUsage::new(10, 2, 12)),
            Response::Content("first".into()),
            Response::Usage(TokenUsage::new(20, 5, 25)),
            Response::Content("second".into()),
        ];

        let completion = Completion::collect(futures::stream::iter(events)).await.unwrap();

        assert_eq!(completion.messages, vec!["first", "second"]);
        assert_eq!(completion.responses.len(), 4);
        assert_eq!(completion.usage, TokenUsage::new(30, 7, 37));
        assert_eq!(completion.text(), "first\n\nsecond");
    }

    #[tokio::test]
    async fn test_collect_error_discards_partial() {
        let events = vec![
            Response::Usage(TokenUsage::new(10, 2, 12)),
            Response::Content("partial".into()),
            Response::Error(AgentError::Provider("boom".into())),
        ];

        let err = Completion::collect(futures::stream::iter(events))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }
}
