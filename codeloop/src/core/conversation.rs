//! Append-only chat history shared with the generator.

use serde::{Deserialize, Serialize};

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered chat log. Messages are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation with a single system message.
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message {
                role: Role::System,
                content: prompt.into(),
            }],
        }
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

    /// Append one user request and the assistant reply it produced.
    pub fn push_exchange(&mut self, request: impl Into<String>, reply: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: request.into(),
        });
        self.messages.push(Message {
            role: Role::Assistant,
            content: reply.into(),
        });
    }

    /// Number of user messages sent so far.
    pub fn exchanges(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.role == Role::User)
            .count()
    }

    /// Render as `<role>: <content>` lines.
    pub fn render_transcript(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str(message.role.as_str());
            out.push_str(": ");
            out.push_str(&message.content);
            out.push('\n');
        }
        out
    }
}
