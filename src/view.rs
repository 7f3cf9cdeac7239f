use std::time::{Duration, Instant};

use ratatui::text::Line;
use tripchat_core::{BadgeDisplay, RenderSink, RenderedMessage};

use crate::markup;

/// How long the copy check mark stays on a message.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

pub struct ChatEntry {
    pub rendered: RenderedMessage,
    /// Styled lines for bot markup, built once on arrival.
    pub lines: Vec<Line<'static>>,
}

/// Terminal-side display state driven by the chat controller.
#[derive(Default)]
pub struct ChatView {
    pub entries: Vec<ChatEntry>,
    pub loading: bool,
    pub badge: Option<BadgeDisplay>,
    pub input_locked: bool,
    pub copied: Option<(usize, Instant)>,
    focus_requested: bool,
    content_changed: bool,
}

impl ChatView {
    /// True once after the controller asked for the input to be refocused.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    /// True once after messages were added or removed.
    pub fn take_content_changed(&mut self) -> bool {
        std::mem::take(&mut self.content_changed)
    }

    /// Index and text of the newest message with a copy affordance.
    pub fn latest_copyable(&self) -> Option<(usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, entry)| entry.rendered.copy_text.as_deref().map(|text| (i, text)))
    }

    pub fn mark_copied(&mut self, index: usize) {
        self.copied = Some((index, Instant::now()));
    }

    pub fn is_copied(&self, index: usize) -> bool {
        matches!(self.copied, Some((i, _)) if i == index)
    }

    /// Drop the copy mark once it has been shown long enough.
    pub fn expire_copied(&mut self, now: Instant) {
        if let Some((_, at)) = self.copied {
            if now.duration_since(at) >= COPY_FEEDBACK {
                self.copied = None;
            }
        }
    }
}

impl RenderSink for ChatView {
    fn render_message(&mut self, rendered: RenderedMessage) {
        let lines = rendered
            .html
            .as_deref()
            .map(markup::to_lines)
            .unwrap_or_default();
        self.entries.push(ChatEntry { rendered, lines });
        self.content_changed = true;
    }

    fn clear_messages(&mut self) {
        self.entries.clear();
        self.loading = false;
        self.copied = None;
        self.content_changed = true;
    }

    fn show_loading(&mut self) {
        self.loading = true;
        self.content_changed = true;
    }

    fn remove_loading(&mut self) {
        self.loading = false;
        self.content_changed = true;
    }

    fn set_badge(&mut self, badge: Option<BadgeDisplay>) {
        self.badge = badge;
    }

    fn set_input_locked(&mut self, locked: bool) {
        self.input_locked = locked;
        if !locked {
            self.focus_requested = true;
        }
    }
}
