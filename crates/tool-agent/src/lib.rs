//! # tool-agent
//!
//! Conversation orchestrator that interleaves chat completions with
//! caller-supplied tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │  CompletionService  │  │
//! │  │    Loop     │──│   Registry  │──│     (Strategy)      │  │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘  │
//! │         │ Usage / Content / Error                            │
//! │  ┌──────▼──────┐                                             │
//! │  │  Response   │                                             │
//! │  │   Stream    │                                             │
//! │  └─────────────┘                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `CompletionService` trait keeps the loop independent of any particular
//! backend, wire format or transport.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use tool_agent::{Agent, Message};
//!
//! let agent = Agent::builder()
//!     .provider(service)
//!     .model("gpt-4o-mini")
//!     .system_prompt("You are a helpful assistant.")
//!     .tool(WeatherTool)
//!     .build()?;
//!
//! let mut stream = agent.stream_chat_completion(&cancel, &[Message::user("Weather in Tokyo?")]);
//! while let Some(event) = stream.next().await {
//!     println!("{}: {:?}", event.event_type(), event);
//! }
//! ```

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod response;
pub mod stream;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Attachment, Content, Message, MessageKind, Role};
pub use provider::{ChatReply, ChatRequest, CompletionService, TokenUsage, ToolCallRequest, Turn};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, UnknownToolPolicy};
pub use response::{Completion, Response};
pub use stream::ResponseStream;
pub use tool::{Arguments, Parameters, Tool, ToolOutput, ToolRegistry, ToolSchema};
pub use tokio_util::sync::CancellationToken;
