use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tripchat_core::{
    controller, Backend, ChatController, ChatReply, Config, HttpBackend, SendTicket,
    WeatherSnapshot, WeatherTicket,
};

use crate::tui::AppEvent;
use crate::view::ChatView;

pub const NO_LOCATION: &str = "(no location)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Locations,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub chat: ChatController<HttpBackend, ChatView>,
    events: UnboundedSender<AppEvent>,

    // Location selector
    pub locations: Vec<String>,
    pub location_state: ListState,
    pub default_location: Option<String>,
    pub remember_location: bool,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat scroll state
    pub chat_scroll: u16,
    pub follow_bottom: bool,

    // Background requests
    chat_task: Option<JoinHandle<()>>,
    weather_task: Option<JoinHandle<()>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub locations_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(
        backend_url: &str,
        default_location: Option<String>,
        remember_location: bool,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let chat = ChatController::new(HttpBackend::new(backend_url), ChatView::default());

        let mut location_state = ListState::default();
        location_state.select(Some(0));

        Self {
            should_quit: false,
            focus: FocusPane::Locations,
            chat,
            events,

            locations: Vec::new(),
            location_state,
            default_location,
            remember_location,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            follow_bottom: true,

            chat_task: None,
            weather_task: None,

            animation_frame: 0,

            locations_area: None,
            chat_area: None,
        }
    }

    pub fn view(&self) -> &ChatView {
        self.chat.sink()
    }

    pub fn current_location(&self) -> Option<&str> {
        self.chat.store().location()
    }

    /// Fetch the location list in the background.
    pub fn request_locations(&self) {
        let backend = self.chat.backend();
        let events = self.events.clone();
        tokio::spawn(async move {
            let locations = controller::load_locations(backend.as_ref()).await;
            let _ = events.send(AppEvent::Locations(locations));
        });
    }

    pub fn set_locations(&mut self, locations: Vec<String>) {
        info!(count = locations.len(), "Locations loaded");
        self.locations = locations;
        self.location_state.select(Some(0));

        let preselect = self
            .default_location
            .take()
            .and_then(|name| self.locations.iter().position(|l| *l == name));
        if let Some(idx) = preselect {
            self.location_state.select(Some(idx + 1));
            self.choose_selected_location();
            self.focus = FocusPane::Input;
        }
    }

    // Location selector: index 0 is the "no location" entry
    pub fn location_count(&self) -> usize {
        self.locations.len() + 1
    }

    pub fn location_nav_down(&mut self) {
        let i = self.location_state.selected().unwrap_or(0);
        self.location_state.select(Some((i + 1).min(self.location_count() - 1)));
    }

    pub fn location_nav_up(&mut self) {
        let i = self.location_state.selected().unwrap_or(0);
        self.location_state.select(Some(i.saturating_sub(1)));
    }

    pub fn choose_selected_location(&mut self) {
        let name = self
            .location_state
            .selected()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.locations.get(i))
            .cloned();

        if name.as_deref() == self.current_location() {
            return;
        }
        self.change_location(name);
    }

    /// Start a fresh conversation for `location`, dropping any in-flight send.
    pub fn change_location(&mut self, location: Option<String>) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
        if let Some(task) = self.weather_task.take() {
            task.abort();
        }

        if let Some(ticket) = self.chat.select_location(location.as_deref()) {
            let backend = self.chat.backend();
            let events = self.events.clone();
            self.weather_task = Some(tokio::spawn(async move {
                let result = backend.weather(ticket.location()).await;
                let _ = events.send(AppEvent::WeatherDone(ticket, result));
            }));
        }

        if self.remember_location {
            if let Err(e) = Config::save_default_location(location.as_deref()) {
                warn!("Could not save default location: {:#}", e);
            }
        }

        self.follow_bottom = true;
    }

    /// Send the input box contents. Ignored while a send is in flight.
    pub fn submit(&mut self) {
        let Some(pending) = self.chat.begin_send(&self.input) else {
            return;
        };

        self.input.clear();
        self.cursor = 0;
        self.follow_bottom = true;

        let backend = self.chat.backend();
        let events = self.events.clone();
        self.chat_task = Some(tokio::spawn(async move {
            let result = backend.chat(&pending.request).await;
            let _ = events.send(AppEvent::ChatDone(pending.ticket, result));
        }));
    }

    pub fn on_chat_done(&mut self, ticket: SendTicket, result: anyhow::Result<ChatReply>) {
        self.chat.complete_send(ticket, result);
        if !self.chat.is_locked() {
            self.chat_task = None;
        }
    }

    pub fn on_weather_done(
        &mut self,
        ticket: WeatherTicket,
        result: anyhow::Result<WeatherSnapshot>,
    ) {
        if self.chat.apply_weather(&ticket, result) {
            self.weather_task = None;
        }
    }

    /// Copy the newest bot message to the clipboard.
    pub fn copy_latest(&mut self) {
        let Some((index, text)) = self.view().latest_copyable() else {
            return;
        };

        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.chat.sink_mut().mark_copied(index),
            Err(e) => warn!("Failed to copy: {}", e),
        }
    }

    /// Apply view requests raised by the controller since the last event.
    pub fn sync_view(&mut self) {
        let view = self.chat.sink_mut();
        let refocus = view.take_focus_request();
        let changed = view.take_content_changed();

        if refocus {
            self.focus = FocusPane::Input;
        }
        if changed {
            self.follow_bottom = true;
        }
    }

    /// Tick animation frame and expire copy feedback (called by Tick event)
    pub fn tick(&mut self) {
        if self.view().loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.chat.sink_mut().expire_copied(Instant::now());
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Rendering clamps the offset and re-enables following at the bottom.
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn input_enabled(&self) -> bool {
        !self.chat.is_locked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new("http://127.0.0.1:9", None, false, tx)
    }

    #[tokio::test]
    async fn test_location_nav_is_clamped() {
        let mut app = app();
        app.locations = vec!["Rome".to_string(), "Kyoto".to_string()];

        app.location_nav_up();
        assert_eq!(app.location_state.selected(), Some(0));

        for _ in 0..5 {
            app.location_nav_down();
        }
        assert_eq!(app.location_state.selected(), Some(2));
    }

    #[tokio::test]
    async fn test_preselects_default_location() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new("http://127.0.0.1:9", Some("Kyoto".to_string()), false, tx);

        app.set_locations(vec!["Rome".to_string(), "Kyoto".to_string()]);

        assert_eq!(app.location_state.selected(), Some(2));
        assert_eq!(app.current_location(), Some("Kyoto"));
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.view().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_choosing_no_location_clears_chat() {
        let mut app = app();
        app.set_locations(vec!["Rome".to_string()]);
        app.location_state.select(Some(1));
        app.choose_selected_location();
        assert_eq!(app.current_location(), Some("Rome"));

        app.location_state.select(Some(0));
        app.choose_selected_location();

        assert_eq!(app.current_location(), None);
        assert!(app.view().entries.is_empty());
        assert!(app.view().badge.is_none());
    }

    #[tokio::test]
    async fn test_submit_locks_until_reply() {
        let mut app = app();
        app.input = "Where to eat?".to_string();
        app.cursor = app.input.chars().count();

        app.submit();
        assert!(!app.input_enabled());
        assert!(app.input.is_empty());
        assert!(app.view().loading);

        app.input = "again".to_string();
        app.submit();
        assert_eq!(app.view().entries.len(), 1);
    }
}
