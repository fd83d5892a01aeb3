//! Conversation Messages
//!
//! Caller-facing message model. A [`Message`] pairs a [`Role`] with exactly one
//! [`Content`] payload; accessors for a payload of the wrong kind return an
//! empty value instead of failing.

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Kind of payload a message carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    Image,
}

/// Named binary payload for file and image messages
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.data.is_empty()
    }
}

static EMPTY_ATTACHMENT: Attachment = Attachment {
    name: String::new(),
    data: Vec::new(),
};

/// Message payload, one variant per kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
    File(Attachment),
    Image(Attachment),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::File(Attachment::new(name, data))
    }

    pub fn image(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Image(Attachment::new(name, data))
    }

    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::File(_) => MessageKind::File,
            Self::Image(_) => MessageKind::Image,
        }
    }
}

/// A single caller-supplied message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: Content,
}

impl Message {
    /// Create a new message
    pub const fn new(role: Role, content: Content) -> Self {
        Self { role, content }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Content::text(text))
    }

    /// Create a user text message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }

    /// Create a user message carrying a file
    pub fn user_file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(Role::User, Content::file(name, data))
    }

    /// Create a user message carrying an image
    pub fn user_image(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(Role::User, Content::image(name, data))
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub const fn kind(&self) -> MessageKind {
        self.content.kind()
    }

    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Text payload, or `""` for file and image messages
    pub fn text(&self) -> &str {
        match &self.content {
            Content::Text { text } => text,
            _ => "",
        }
    }

    /// File payload, or an empty attachment for other kinds
    pub fn file(&self) -> &Attachment {
        match &self.content {
            Content::File(file) => file,
            _ => &EMPTY_ATTACHMENT,
        }
    }

    /// Image payload, or an empty attachment for other kinds
    pub fn image(&self) -> &Attachment {
        match &self.content {
            Content::Image(image) => image,
            _ => &EMPTY_ATTACHMENT,
        }
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        let len = match &self.content {
            Content::Text { text } => text.len(),
            Content::File(a) | Content::Image(a) => a.data.len(),
        };
        // ~4 characters per token, +4 for role overhead
        u32::try_from(len / 4).unwrap_or(u32::MAX).saturating_add(4)
    }
}
