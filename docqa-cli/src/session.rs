//! Chat history for the interactive `chat` command

use std::fmt;

/// Characters of a source chunk shown under an answer.
pub const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Chunks the answer was grounded on (assistant turns only)
    pub sources: Vec<String>,
}

/// Append-only conversation log, dropped with the document on `/clear`.
#[derive(Debug, Default)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, sources: Vec<String>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: content.into(),
            sources,
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// First `max` characters of `text`, with `...` appended if it was cut.
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
