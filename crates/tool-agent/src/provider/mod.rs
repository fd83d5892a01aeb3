//! Completion Service Contract
//!
//! The reasoning loop talks to the remote model exclusively through
//! [`CompletionService`]. Transport, authentication and wire encoding belong
//! to implementations of that trait.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tool_agent::provider::{ChatRequest, CompletionService};
//!
//! let reply = service.complete(&cancel, &request).await?;
//! for call in &reply.tool_calls {
//!     println!("{} wants {}", call.id, call.name);
//! }
//! ```

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::message::{Content, Message, Role};
use crate::tool::ToolSchema;

/// A model-issued request to run a tool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call identifier, echoed back on the tool-result turn
    pub id: String,

    /// Tool name
    pub name: String,

    /// Raw JSON argument payload
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub const fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    pub const fn is_zero(&self) -> bool {
        self.prompt_tokens == 0 && self.completion_tokens == 0 && self.total_tokens == 0
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

/// One piece of a user turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    File { name: String, data: Vec<u8> },
    Image { name: String, data: Vec<u8> },
}

/// One entry of the conversation history as sent to the completion service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        parts: Vec<ContentPart>,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::User {
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Convert a caller message.
    ///
    /// System and assistant turns are text-only; a non-text payload on those
    /// roles degrades to empty text.
    pub fn from_message(message: &Message) -> Self {
        match message.role() {
            Role::System => Self::system(message.text()),
            Role::Assistant => Self::Assistant {
                content: Some(message.text().to_owned()),
                tool_calls: Vec::new(),
            },
            Role::User => {
                let part = match message.content() {
                    Content::Text { text } => ContentPart::Text { text: text.clone() },
                    Content::File(file) => ContentPart::File {
                        name: file.name.clone(),
                        data: file.data.clone(),
                    },
                    Content::Image(image) => ContentPart::Image {
                        name: image.name.clone(),
                        data: image.data.clone(),
                    },
                };
                Self::User { parts: vec![part] }
            }
        }
    }

    pub const fn role_name(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }
}

impl From<&Message> for Turn {
    fn from(message: &Message) -> Self {
        Self::from_message(message)
    }
}

/// Outbound request for one completion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// Ordered conversation history
    pub turns: Vec<Turn>,

    /// Tools advertised to the model
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
}

/// One reply from the completion service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Generated text, if any
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls in the order the model issued them
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Token usage for this call
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ChatReply {
    /// A text-only reply
    pub fn text(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            usage,
        }
    }

    /// A reply requesting tool calls
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>, usage: TokenUsage) -> Self {
        Self {
            content: None,
            tool_calls,
            usage,
        }
    }

    /// Non-empty text content
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|text| !text.is_empty())
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether the reply is worth keeping in history
    pub fn is_empty(&self) -> bool {
        self.content_text().is_none() && !self.has_tool_calls()
    }

    /// The assistant turn this reply contributes to history
    pub fn to_turn(&self) -> Turn {
        Turn::Assistant {
            content: self.content_text().map(str::to_owned),
            tool_calls: self.tool_calls.clone(),
        }
    }
}

/// Remote chat-completion service
///
/// Implement this trait to connect the agent to a model backend. Failures
/// should be reported through the transport variants of
/// [`AgentError`](crate::AgentError). Implementations must abandon the
/// in-flight request once `cancel` fires.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Produce one reply for the given history
    async fn complete(
        &self,
        cancel: &CancellationToken,
        request: &ChatRequest,
    ) -> Result<ChatReply>;

    /// Provider name, used in logs
    fn name(&self) -> &str {
        "completion-service"
    }
}
