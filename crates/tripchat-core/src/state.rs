//! UI-agnostic conversation state
//!
//! This module contains the session state shared by every front end: the
//! visible message list, the user-message history sent as request context,
//! and the current location and weather.

use serde::{Deserialize, Serialize};

use crate::weather::WeatherSnapshot;

/// A chat message shown in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    history: Vec<String>,
    location: Option<String>,
    weather: Option<WeatherSnapshot>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user message for display and as request context.
    pub fn append_user_message(&mut self, text: &str) -> &Message {
        self.history.push(text.to_string());
        self.push(Message::user(text))
    }

    pub fn append_bot_message(&mut self, text: &str) -> &Message {
        self.push(Message::bot(text))
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Drop the message list and the history together.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.history.clear();
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
    }

    pub fn set_weather(&mut self, weather: Option<WeatherSnapshot>) {
        self.weather = weather;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.weather.as_ref()
    }
}
