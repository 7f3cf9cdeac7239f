//! The display boundary between the chat controller and a front end.

use crate::markdown;
use crate::state::{Message, Sender};
use crate::weather::BadgeDisplay;

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub message: Message,
    /// Formatted HTML for bot messages; user text is shown verbatim.
    pub html: Option<String>,
    /// Raw text offered by the copy-to-clipboard affordance.
    pub copy_text: Option<String>,
}

impl RenderedMessage {
    pub fn from_message(message: &Message) -> Self {
        match message.sender {
            Sender::Bot => Self {
                html: Some(markdown::format(&message.text)),
                copy_text: Some(message.text.clone()),
                message: message.clone(),
            },
            Sender::User => Self {
                html: None,
                copy_text: None,
                message: message.clone(),
            },
        }
    }
}

pub trait RenderSink {
    fn render_message(&mut self, message: RenderedMessage);

    fn clear_messages(&mut self);

    fn show_loading(&mut self);

    fn remove_loading(&mut self);

    /// `None` hides the badge.
    fn set_badge(&mut self, badge: Option<BadgeDisplay>);

    /// Unlocking also hands focus back to the input.
    fn set_input_locked(&mut self, locked: bool);
}

/// Keeps everything it is told to show. Useful headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<RenderedMessage>,
    pub loading: bool,
    pub badge: Option<BadgeDisplay>,
    pub input_locked: bool,
    pub focus_requests: usize,
}

impl RenderSink for RecordingSink {
    fn render_message(&mut self, message: RenderedMessage) {
        self.messages.push(message);
    }

    fn clear_messages(&mut self) {
        self.messages.clear();
        self.loading = false;
    }

    fn show_loading(&mut self) {
        self.loading = true;
    }

    fn remove_loading(&mut self) {
        self.loading = false;
    }

    fn set_badge(&mut self, badge: Option<BadgeDisplay>) {
        self.badge = badge;
    }

    fn set_input_locked(&mut self, locked: bool) {
        self.input_locked = locked;
        if !locked {
            self.focus_requests += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_message_is_formatted_and_copyable() {
        let rendered = RenderedMessage::from_message(&Message::bot("**Day 1:** $40"));
        assert_eq!(
            rendered.html.as_deref(),
            Some("<strong>Day 1:</strong> <span class=\"cost-badge\">$40</span>")
        );
        assert_eq!(rendered.copy_text.as_deref(), Some("**Day 1:** $40"));
    }

    #[test]
    fn test_user_message_is_verbatim() {
        let rendered = RenderedMessage::from_message(&Message::user("<b>hi</b>"));
        assert!(rendered.html.is_none());
        assert!(rendered.copy_text.is_none());
        assert_eq!(rendered.message.text, "<b>hi</b>");
    }
}
