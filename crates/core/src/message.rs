//! Conversation message types.
//!
//! A request carries an ordered list of messages from the caller; the agent
//! loop extends it with assistant turns and tool results while it runs. None
//! of this is persisted here.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
///
/// Tool results travel with the `User` role: the completion service expects
/// them as the counterpart of the assistant turn that requested them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One typed block inside a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Prose.
    Text { text: String },

    /// A tool invocation requested by the assistant.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The result of one invocation, keyed by the invocation id.
    ToolResult {
        tool_use_id: String,
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Message content: plain text, or a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// An assistant turn kept verbatim, prose and tool invocations mixed.
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// The combined tool-results message answering one assistant turn.
    pub fn tool_results(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// All prose in this message, concatenated in order.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Whether this is a user-authored message rather than tool results.
    pub fn is_user_text(&self) -> bool {
        self.role == Role::User && matches!(self.content, MessageContent::Text(_))
    }
}

/// An append-only conversation transcript.
///
/// Appending consumes the transcript and hands back the extended one, so a
/// turn can never observe a list that someone else is mutating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Return this transcript with `message` appended.
    #[must_use]
    pub fn with(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Text of the newest user-authored message.
    pub fn latest_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_user_text())
            .map(Message::text)
    }

    /// Up to `limit` user-authored texts preceding the newest one, oldest first.
    pub fn prior_user_texts(&self, limit: usize) -> Vec<String> {
        let mut texts: Vec<String> = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.is_user_text())
            .skip(1)
            .take(limit)
            .map(Message::text)
            .collect();
        texts.reverse();
        texts
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}
