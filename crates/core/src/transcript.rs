//! Conversation transcript.
//!
//! An ordered log of role-tagged messages. Everything after index 0 is
//! append-only. Index 0 is the system message, which carries no history of
//! its own: it is overwritten from current memory before every model call.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        let mut transcript = Self { messages };
        transcript.normalize();
        transcript
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages without the system entry, as shown to a user.
    pub fn visible(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect()
    }

    /// Appends a user or assistant message.
    ///
    /// System messages never go through here; they are written with
    /// [`Transcript::refresh_system`] so that only index 0 can hold one.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.refresh_system(message.content);
            return;
        }
        self.messages.push(message);
    }

    /// Replaces the content of the system message at index 0, inserting it
    /// if the transcript does not start with one.
    pub fn refresh_system(&mut self, content: impl Into<String>) {
        let content = content.into();
        match self.messages.first_mut() {
            Some(first) if first.role == Role::System => first.content = content,
            _ => self.messages.insert(0, ChatMessage::system(content)),
        }
    }

    /// The trailing `n` messages, oldest first.
    pub fn tail(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Drops stray system messages past index 0. Loaded transcripts written by
    /// older builds may carry them.
    fn normalize(&mut self) {
        let mut seen_system = false;
        self.messages.retain(|m| {
            if m.role != Role::System {
                return true;
            }
            let keep = !seen_system;
            seen_system = true;
            keep
        });
        if let Some(pos) = self.messages.iter().position(|m| m.role == Role::System) {
            if pos != 0 {
                let system = self.messages.remove(pos);
                self.messages.insert(0, system);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_system_replaces_in_place() {
        let mut t = Transcript::new();
        t.refresh_system("v1");
        t.push(ChatMessage::assistant("hello"));
        t.push(ChatMessage::user("hi"));
        t.refresh_system("v2");

        assert_eq!(t.len(), 3);
        assert_eq!(t.messages()[0], ChatMessage::system("v2"));
        assert_eq!(
            t.messages().iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[test]
    fn test_refresh_system_inserts_when_missing() {
        let mut t = Transcript::new();
        t.push(ChatMessage::user("first"));
        t.refresh_system("prompt");
        assert_eq!(t.messages()[0].role, Role::System);
        assert_eq!(t.messages()[1].content, "first");
    }

    #[test]
    fn test_push_system_routes_to_index_zero() {
        let mut t = Transcript::new();
        t.push(ChatMessage::user("a"));
        t.push(ChatMessage::system("sys"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].content, "sys");
    }

    #[test]
    fn test_visible_and_tail() {
        let mut t = Transcript::new();
        t.refresh_system("sys");
        for i in 0..6 {
            t.push(ChatMessage::user(format!("u{i}")));
        }
        assert_eq!(t.visible().len(), 6);
        let tail = t.tail(2);
        assert_eq!(tail[0].content, "u4");
        assert_eq!(tail[1].content, "u5");
        assert_eq!(t.tail(100).len(), 7);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }

    #[test]
    fn test_from_messages_normalizes_system_entries() {
        let t = Transcript::from_messages(vec![
            ChatMessage::user("u"),
            ChatMessage::system("s1"),
            ChatMessage::system("s2"),
        ]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0], ChatMessage::system("s1"));
    }
}
