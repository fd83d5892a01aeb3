//! Reasoning Loop
//!
//! Drives one conversation against a [`CompletionService`]: request a
//! completion, report usage and content, run any requested tools, append
//! their results to history, and repeat until the model stops asking for
//! tools or the iteration cap is hit.
//!
//! Each call to [`Agent::stream_chat_completion`] runs on its own background
//! task with its own history; the agent itself is read-only and can serve
//! concurrent calls.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{ChatReply, ChatRequest, CompletionService, TokenUsage, ToolCallRequest, Turn};
use crate::response::{Completion, Response};
use crate::stream::{self, EventSender, ResponseStream};
use crate::tool::{Arguments, Tool, ToolRegistry};

/// Default cap on completion calls per run
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// What to do when the model names a tool that is not registered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownToolPolicy {
    /// Log and move on without a tool-result turn
    #[default]
    Skip,
    /// End the run with [`AgentError::ToolNotFound`]
    Fail,
}

impl FromStr for UnknownToolPolicy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(AgentError::Config(format!(
                "Unknown tool policy '{other}' (expected 'skip' or 'fail')"
            ))),
        }
    }
}

/// Agent configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier passed to the completion service
    pub model: String,

    /// Sent as the first system turn
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Sent as the first user turn, after the system prompt
    #[serde(default)]
    pub instructions: Option<String>,

    /// Maximum completion calls per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default)]
    pub unknown_tools: UnknownToolPolicy,
}

const fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            instructions: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            unknown_tools: UnknownToolPolicy::default(),
        }
    }

    /// Read configuration from `AGENT_*` environment variables.
    ///
    /// `AGENT_MODEL` is required; `AGENT_SYSTEM_PROMPT`, `AGENT_INSTRUCTIONS`,
    /// `AGENT_MAX_ITERATIONS` and `AGENT_UNKNOWN_TOOLS` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let model = lookup("AGENT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| AgentError::Config("AGENT_MODEL is not set".into()))?;

        let max_iterations = match lookup("AGENT_MAX_ITERATIONS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                AgentError::Config(format!("AGENT_MAX_ITERATIONS '{raw}' is invalid: {e}"))
            })?,
            None => DEFAULT_MAX_ITERATIONS,
        };

        let unknown_tools = lookup("AGENT_UNKNOWN_TOOLS")
            .map(|raw| raw.parse::<UnknownToolPolicy>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            model,
            system_prompt: lookup("AGENT_SYSTEM_PROMPT"),
            instructions: lookup("AGENT_INSTRUCTIONS"),
            max_iterations,
            unknown_tools,
        })
    }

    /// System prompt, if set and non-empty
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|p| !p.is_empty())
    }

    /// Instructions, if set and non-empty
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref().filter(|i| !i.is_empty())
    }
}

/// The main Agent struct
#[derive(Clone)]
pub struct Agent {
    provider: Arc<dyn CompletionService>,
    tools: Arc<ToolRegistry>,
    config: Arc<AgentConfig>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.name())
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish()
    }
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn CompletionService>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config: Arc::new(config),
        }
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Initial history: system prompt, instructions, then the caller's messages
    pub fn build_turns(&self, messages: &[Message]) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(messages.len() + 2);

        if let Some(prompt) = self.config.system_prompt() {
            turns.push(Turn::system(prompt));
        }
        if let Some(instructions) = self.config.instructions() {
            turns.push(Turn::user_text(instructions));
        }
        turns.extend(messages.iter().map(Turn::from_message));

        turns
    }

    /// Run the loop on a background task and stream its events.
    ///
    /// Cancelling `cancel` (or dropping the returned stream) aborts the
    /// in-flight completion call or tool execution; the stream then ends with
    /// a single `Error(Cancelled)` event. Must be called within a Tokio runtime.
    pub fn stream_chat_completion(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
    ) -> ResponseStream {
        let run_id = Uuid::new_v4();
        let run_cancel = cancel.child_token();
        let (events, stream) = stream::channel(run_id, run_cancel.clone());

        let run = Run {
            provider: self.provider.clone(),
            tools: self.tools.clone(),
            config: self.config.clone(),
            cancel: run_cancel,
            request: ChatRequest {
                model: self.config.model.clone(),
                turns: self.build_turns(messages),
                tools: self.tools.schemas(),
            },
            usage: TokenUsage::default(),
        };

        let span = tracing::info_span!(
            "agent_run",
            %run_id,
            model = %self.config.model,
            provider = self.provider.name(),
        );
        tokio::spawn(run.drive(events).instrument(span));

        stream
    }

    /// Run to completion and aggregate every event.
    ///
    /// Any error discards partial results; use
    /// [`stream_chat_completion`](Self::stream_chat_completion) to observe
    /// content emitted before a failure.
    pub async fn chat_completion(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
    ) -> Result<Completion> {
        Completion::collect(self.stream_chat_completion(cancel, messages)).await
    }

    /// Run with a single user question and return the joined content
    pub async fn ask(&self, cancel: &CancellationToken, question: &str) -> Result<String> {
        let completion = self
            .chat_completion(cancel, &[Message::user(question)])
            .await?;
        Ok(completion.text())
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy)]
enum Outcome {
    /// The model replied without tool calls
    Answered { iterations: usize },
    /// `max_iterations` completion calls were made
    CapReached,
}

/// State owned by one background run
struct Run {
    provider: Arc<dyn CompletionService>,
    tools: Arc<ToolRegistry>,
    config: Arc<AgentConfig>,
    cancel: CancellationToken,
    request: ChatRequest,
    usage: TokenUsage,
}

impl Run {
    async fn drive(mut self, events: EventSender) {
        match self.run_loop(&events).await {
            Ok(Outcome::Answered { iterations }) => info!(
                iterations,
                prompt_tokens = self.usage.prompt_tokens,
                completion_tokens = self.usage.completion_tokens,
                total_tokens = self.usage.total_tokens,
                "Run finished"
            ),
            Ok(Outcome::CapReached) => warn!(
                max_iterations = self.config.max_iterations,
                total_tokens = self.usage.total_tokens,
                "Iteration cap reached, stopping"
            ),
            Err(err) => {
                warn!(error = %err, total_tokens = self.usage.total_tokens, "Run failed");
                // consumer may be gone already
                let _ = events.send(Response::Error(err)).await;
            }
        }
        // `events` drops here, closing the stream
    }

    async fn run_loop(&mut self, events: &EventSender) -> Result<Outcome> {
        for iteration in 0..self.config.max_iterations {
            debug!(iteration, turns = self.request.turns.len(), "Requesting completion");
            let reply = self.complete().await?;

            self.usage += reply.usage;
            events.send(Response::Usage(reply.usage)).await?;

            if !reply.is_empty() {
                self.request.turns.push(reply.to_turn());
            }
            if let Some(text) = reply.content_text() {
                events.send(Response::Content(text.to_owned())).await?;
            }

            if !reply.has_tool_calls() {
                return Ok(Outcome::Answered {
                    iterations: iteration + 1,
                });
            }

            for call in &reply.tool_calls {
                self.dispatch(call).await?;
            }
        }

        Ok(Outcome::CapReached)
    }

    async fn complete(&self) -> Result<ChatReply> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(AgentError::Cancelled),
            reply = self.provider.complete(&self.cancel, &self.request) => reply,
        }
    }

    async fn dispatch(&mut self, call: &ToolCallRequest) -> Result<()> {
        let tool = self.lookup(call)?;
        // arguments are decoded even for a skipped tool
        let arguments = decode_arguments(call)?;
        let Some(tool) = tool else {
            return Ok(());
        };

        debug!(tool = %call.name, call_id = %call.id, "Executing tool");

        let executed = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(AgentError::Cancelled),
            output = tool.execute(&self.cancel, arguments) => output,
        };
        let output = executed.map_err(|source| AgentError::ToolExecution {
            tool: call.name.clone(),
            source,
        })?;

        let content = output.into_turn_content()?;
        self.request
            .turns
            .push(Turn::tool_result(call.id.clone(), content));
        Ok(())
    }

    fn lookup(&self, call: &ToolCallRequest) -> Result<Option<Arc<dyn Tool>>> {
        match (self.tools.get(&call.name), self.config.unknown_tools) {
            (Some(tool), _) => Ok(Some(tool)),
            (None, UnknownToolPolicy::Skip) => {
                warn!(tool = %call.name, call_id = %call.id, "Model requested unknown tool, skipping");
                Ok(None)
            }
            (None, UnknownToolPolicy::Fail) => Err(AgentError::ToolNotFound(call.name.clone())),
        }
    }
}

/// Decode a tool call's JSON arguments; `null` means no arguments
fn decode_arguments(call: &ToolCallRequest) -> Result<Arguments> {
    serde_json::from_str::<Option<Arguments>>(&call.arguments)
        .map(Option::unwrap_or_default)
        .map_err(|source| AgentError::ArgumentDecode {
            tool: call.name.clone(),
            source,
        })
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn CompletionService>>,
    tools: Vec<Arc<dyn Tool>>,
    config: Option<AgentConfig>,
    model: Option<String>,
    system_prompt: Option<String>,
    instructions: Option<String>,
    max_iterations: Option<usize>,
    unknown_tools: Option<UnknownToolPolicy>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionService>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Start from an existing configuration; later setters override it
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub const fn unknown_tools(mut self, policy: UnknownToolPolicy) -> Self {
        self.unknown_tools = Some(policy);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut config = self
            .config
            .unwrap_or_else(|| AgentConfig::new(String::new()));
        if let Some(model) = self.model {
            config.model = model;
        }
        if self.system_prompt.is_some() {
            config.system_prompt = self.system_prompt;
        }
        if self.instructions.is_some() {
            config.instructions = self.instructions;
        }
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }
        if let Some(policy) = self.unknown_tools {
            config.unknown_tools = policy;
        }
        if config.model.trim().is_empty() {
            return Err(AgentError::Config("Model is required".into()));
        }

        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register_arc(tool)?;
        }

        Ok(Agent::new(provider, Arc::new(registry), config))
    }
}
