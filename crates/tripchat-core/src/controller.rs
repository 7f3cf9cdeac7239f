//! Chat send/receive cycle and location lifecycle.
//!
//! The controller owns the [`ConversationStore`] and drives a [`RenderSink`].
//! A send is split in two halves so a front end can run the network call on
//! its own task: [`ChatController::begin_send`] locks the input and hands back
//! the request, [`ChatController::complete_send`] takes the result and unlocks.
//! [`ChatController::send`] does both against the controller's backend.
//!
//! Every location change starts a new session epoch. Completions carrying an
//! older epoch belong to a conversation that no longer exists and are dropped
//! without rendering anything.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::backend::{Backend, ChatReply, ChatRequest};
use crate::render::{RenderSink, RenderedMessage};
use crate::state::ConversationStore;
use crate::weather::{self, WeatherSnapshot};

pub const UNABLE_TO_RESPOND: &str = "Error: Unable to get response";
pub const CONNECTION_ERROR: &str = "Connection error. Please try again.";

pub fn welcome_message(location: &str) -> String {
    format!(
        "Great! I'm ready to help you plan your {} trip. What would you like to know?",
        location
    )
}

/// Location names for the selector. Failures leave the selector empty.
pub async fn load_locations<B: Backend + ?Sized>(backend: &B) -> Vec<String> {
    match backend.locations().await {
        Ok(locations) => locations,
        Err(e) => {
            warn!("Error loading locations: {:#}", e);
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    /// Idle, but the last send ended in an error message.
    IdleWithError,
}

/// Identifies one send attempt within one session epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    id: u64,
    epoch: u64,
}

#[derive(Debug)]
pub struct PendingSend {
    pub ticket: SendTicket,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherTicket {
    epoch: u64,
    location: String,
}

impl WeatherTicket {
    pub fn location(&self) -> &str {
        &self.location
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Replied,
    EmptyReply,
    TransportError,
    /// The send was superseded by a location change.
    Discarded,
}

pub struct ChatController<B, S> {
    backend: Arc<B>,
    sink: S,
    store: ConversationStore,
    phase: Phase,
    epoch: u64,
    in_flight: Option<SendTicket>,
    next_send_id: u64,
}

impl<B: Backend, S: RenderSink> ChatController<B, S> {
    pub fn new(backend: B, sink: S) -> Self {
        Self::with_backend(Arc::new(backend), sink)
    }

    pub fn with_backend(backend: Arc<B>, sink: S) -> Self {
        Self {
            backend,
            sink,
            store: ConversationStore::new(),
            phase: Phase::Idle,
            epoch: 0,
            in_flight: None,
            next_send_id: 0,
        }
    }

    /// Shared handle for running backend calls off the controller.
    pub fn backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_locked(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// Start a send. Returns `None` for blank input or while a send is in flight.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingSend> {
        let message = input.trim();
        if message.is_empty() {
            debug!("Ignoring blank message");
            return None;
        }
        if self.is_locked() {
            debug!("Ignoring message while a send is in flight");
            return None;
        }

        self.phase = Phase::Sending;
        self.sink.set_input_locked(true);

        let user = self.store.append_user_message(message).clone();
        self.sink.render_message(RenderedMessage::from_message(&user));
        self.sink.show_loading();

        let ticket = SendTicket {
            id: self.next_send_id,
            epoch: self.epoch,
        };
        self.next_send_id += 1;
        self.in_flight = Some(ticket);

        let request = ChatRequest {
            message: message.to_string(),
            location: self.store.location().unwrap_or_default().to_string(),
            history: self.store.history().to_vec(),
        };
        debug!(history = request.history.len(), "Sending chat message");

        Some(PendingSend { ticket, request })
    }

    /// Finish a send started with [`begin_send`](Self::begin_send).
    pub fn complete_send(&mut self, ticket: SendTicket, result: Result<ChatReply>) -> SendOutcome {
        if self.in_flight != Some(ticket) {
            debug!(?ticket, "Discarding stale chat completion");
            return SendOutcome::Discarded;
        }
        self.in_flight = None;

        self.sink.remove_loading();

        let (text, outcome) = match result {
            Ok(reply) => match reply.content() {
                Some(text) => (text.to_string(), SendOutcome::Replied),
                None => {
                    warn!("Chat backend returned no response");
                    (UNABLE_TO_RESPOND.to_string(), SendOutcome::EmptyReply)
                }
            },
            Err(e) => {
                warn!("Chat request failed: {:#}", e);
                (CONNECTION_ERROR.to_string(), SendOutcome::TransportError)
            }
        };

        let bot = self.store.append_bot_message(&text).clone();
        self.sink.render_message(RenderedMessage::from_message(&bot));

        self.phase = match outcome {
            SendOutcome::Replied => Phase::Idle,
            _ => Phase::IdleWithError,
        };
        self.sink.set_input_locked(false);

        outcome
    }

    pub async fn send(&mut self, input: &str) -> Option<SendOutcome> {
        let pending = self.begin_send(input)?;
        let result = self.backend.chat(&pending.request).await;
        Some(self.complete_send(pending.ticket, result))
    }

    /// Switch location. A non-empty location starts a fresh conversation and
    /// returns the ticket for its weather fetch; `None` or an empty name
    /// clears everything and hides the badge.
    pub fn select_location(&mut self, location: Option<&str>) -> Option<WeatherTicket> {
        self.epoch += 1;
        self.abandon_send();

        self.store.reset();
        self.sink.clear_messages();

        match location.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                info!(location = name, "Location selected");
                self.store.set_location(Some(name.to_string()));

                let welcome = self.store.append_bot_message(&welcome_message(name)).clone();
                self.sink.render_message(RenderedMessage::from_message(&welcome));

                Some(WeatherTicket {
                    epoch: self.epoch,
                    location: name.to_string(),
                })
            }
            None => {
                info!("Location cleared");
                self.store.set_location(None);
                self.store.set_weather(None);
                self.sink.set_badge(None);
                None
            }
        }
    }

    /// Apply a weather fetch result. Returns `false` if the ticket is stale.
    pub fn apply_weather(
        &mut self,
        ticket: &WeatherTicket,
        result: Result<WeatherSnapshot>,
    ) -> bool {
        if ticket.epoch != self.epoch {
            debug!(location = %ticket.location, "Discarding stale weather");
            return false;
        }

        match result {
            Ok(snapshot) => {
                self.sink.set_badge(Some(weather::present(&snapshot)));
                self.store.set_weather(Some(snapshot));
            }
            Err(e) => {
                warn!(location = %ticket.location, "Weather unavailable: {:#}", e);
                self.sink.set_badge(None);
                self.store.set_weather(None);
            }
        }
        true
    }

    pub async fn change_location(&mut self, location: Option<&str>) {
        if let Some(ticket) = self.select_location(location) {
            let result = self.backend.weather(ticket.location()).await;
            self.apply_weather(&ticket, result);
        }
    }

    pub async fn load_locations(&self) -> Vec<String> {
        load_locations(self.backend.as_ref()).await
    }

    fn abandon_send(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            debug!(?ticket, "Abandoning in-flight send");
            self.sink.remove_loading();
            self.sink.set_input_locked(false);
        }
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingSink;
    use crate::state::Sender;
    use crate::weather::TempBand;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<ChatReply>>>,
        weather: Mutex<VecDeque<Result<WeatherSnapshot>>>,
        requests: Mutex<Vec<ChatRequest>>,
        locations: Option<Vec<String>>,
    }

    impl ScriptedBackend {
        fn with_reply(self, reply: Result<ChatReply>) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        fn with_weather(self, weather: Result<WeatherSnapshot>) -> Self {
            self.weather.lock().unwrap().push_back(weather);
            self
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn locations(&self) -> Result<Vec<String>> {
            self.locations
                .clone()
                .ok_or_else(|| anyhow!("connection refused"))
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted reply")))
        }

        async fn weather(&self, _location: &str) -> Result<WeatherSnapshot> {
            self.weather
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("404 Not Found")))
        }
    }

    fn controller(backend: ScriptedBackend) -> ChatController<ScriptedBackend, RecordingSink> {
        ChatController::new(backend, RecordingSink::default())
    }

    fn texts(sink: &RecordingSink) -> Vec<&str> {
        sink.messages.iter().map(|m| m.message.text.as_str()).collect()
    }

    fn snapshot(location: &str, temperature: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            location: location.to_string(),
            temperature,
            temperature_unit: "°C".to_string(),
            weather_code: 0,
            is_day: true,
            weather_description: "Clear sky".to_string(),
            humidity: 40.0,
            wind_speed: 8.0,
            wind_unit: "km/h".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_renders_reply() {
        let mut chat = controller(
            ScriptedBackend::default().with_reply(Ok(ChatReply::text("**Day 1:** Colosseum"))),
        );
        chat.change_location(Some("Rome")).await;

        let outcome = chat.send("  Plan 2 days  ").await;

        assert_eq!(outcome, Some(SendOutcome::Replied));
        assert_eq!(chat.phase(), Phase::Idle);
        assert!(!chat.sink().loading);
        assert!(!chat.sink().input_locked);

        let messages = &chat.sink().messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].message.sender, Sender::User);
        assert_eq!(messages[1].message.text, "Plan 2 days");
        assert_eq!(messages[2].message.sender, Sender::Bot);
        assert_eq!(
            messages[2].html.as_deref(),
            Some("<strong>Day 1:</strong> Colosseum")
        );
        assert!(messages[2].copy_text.is_some());

        let requests = chat.backend().requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![ChatRequest {
                message: "Plan 2 days".to_string(),
                location: "Rome".to_string(),
                history: vec!["Plan 2 days".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_history_accumulates_in_send_order() {
        let backend = ScriptedBackend::default()
            .with_reply(Ok(ChatReply::text("one")))
            .with_reply(Ok(ChatReply::text("two")));
        let mut chat = controller(backend);

        chat.send("first").await;
        chat.send("second").await;

        assert_eq!(chat.store().history(), ["first", "second"]);
        let requests = chat.backend().requests.lock().unwrap().clone();
        assert_eq!(requests[1].history, ["first", "second"]);
        assert_eq!(requests[1].location, "");
    }

    #[tokio::test]
    async fn test_blank_send_is_ignored() {
        let mut chat = controller(ScriptedBackend::default());

        assert_eq!(chat.send("").await, None);
        assert_eq!(chat.send(" \n\t ").await, None);

        assert!(chat.sink().messages.is_empty());
        assert!(chat.store().history().is_empty());
        assert!(chat.backend().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_send_while_sending_is_noop() {
        let mut chat = controller(ScriptedBackend::default());

        let first = chat.begin_send("hello").expect("first send starts");
        assert!(chat.is_locked());
        assert!(chat.sink().input_locked);
        assert!(chat.sink().loading);

        assert!(chat.begin_send("hello again").is_none());
        assert_eq!(chat.sink().messages.len(), 1);
        assert_eq!(chat.store().history(), ["hello"]);

        chat.complete_send(first.ticket, Ok(ChatReply::text("hi")));
        assert!(!chat.is_locked());
        assert_eq!(texts(chat.sink()), ["hello", "hi"]);
    }

    #[tokio::test]
    async fn test_transport_failure_renders_one_error() {
        let mut chat = controller(
            ScriptedBackend::default().with_reply(Err(anyhow!("connection reset"))),
        );

        let outcome = chat.send("hello").await;

        assert_eq!(outcome, Some(SendOutcome::TransportError));
        assert_eq!(chat.phase(), Phase::IdleWithError);
        assert!(!chat.sink().loading);
        assert!(!chat.sink().input_locked);
        assert_eq!(chat.sink().focus_requests, 1);
        assert_eq!(texts(chat.sink()), ["hello", CONNECTION_ERROR]);
    }

    #[tokio::test]
    async fn test_empty_reply_renders_unable_message() {
        let mut chat = controller(ScriptedBackend::default().with_reply(Ok(ChatReply::default())));

        let outcome = chat.send("hello").await;

        assert_eq!(outcome, Some(SendOutcome::EmptyReply));
        assert_eq!(texts(chat.sink()), ["hello", UNABLE_TO_RESPOND]);
    }

    #[tokio::test]
    async fn test_recovers_after_error() {
        let backend = ScriptedBackend::default()
            .with_reply(Err(anyhow!("timeout")))
            .with_reply(Ok(ChatReply::text("back online")));
        let mut chat = controller(backend);

        chat.send("hello").await;
        let outcome = chat.send("hello").await;

        assert_eq!(outcome, Some(SendOutcome::Replied));
        assert_eq!(chat.phase(), Phase::Idle);
        assert_eq!(chat.store().history(), ["hello", "hello"]);
    }

    #[tokio::test]
    async fn test_location_change_clears_before_welcome() {
        let backend = ScriptedBackend::default()
            .with_reply(Ok(ChatReply::text("Tapas!")))
            .with_weather(Ok(snapshot("Madrid", 31.0)))
            .with_weather(Ok(snapshot("Oslo", -4.0)));
        let mut chat = controller(backend);

        chat.change_location(Some("Madrid")).await;
        chat.send("Food?").await;
        assert_eq!(chat.store().history(), ["Food?"]);

        chat.change_location(Some("Oslo")).await;

        assert_eq!(texts(chat.sink()), [welcome_message("Oslo").as_str()]);
        assert!(chat.store().history().is_empty());
        assert_eq!(chat.store().messages().len(), 1);
        assert_eq!(chat.store().location(), Some("Oslo"));
        let badge = chat.sink().badge.as_ref().expect("badge shown");
        assert_eq!(badge.location, "Oslo");
        assert_eq!(badge.band, TempBand::Cold);
    }

    #[tokio::test]
    async fn test_weather_failure_hides_badge_silently() {
        let backend = ScriptedBackend::default()
            .with_weather(Ok(snapshot("Paris", 18.0)))
            .with_weather(Err(anyhow!("Weather not available for Atlantis: 404 Not Found")));
        let mut chat = controller(backend);

        chat.change_location(Some("Paris")).await;
        assert!(chat.sink().badge.is_some());

        chat.change_location(Some("Atlantis")).await;

        assert!(chat.sink().badge.is_none());
        assert!(chat.store().weather().is_none());
        assert_eq!(texts(chat.sink()), [welcome_message("Atlantis").as_str()]);
        assert_eq!(chat.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_clearing_location_hides_badge_without_message() {
        let mut chat = controller(
            ScriptedBackend::default().with_weather(Ok(snapshot("Cairo", 35.0))),
        );
        chat.change_location(Some("Cairo")).await;
        assert!(chat.sink().badge.is_some());

        chat.change_location(None).await;

        assert!(chat.sink().messages.is_empty());
        assert!(chat.sink().badge.is_none());
        assert!(chat.store().location().is_none());
        assert!(chat.store().weather().is_none());
    }

    #[test]
    fn test_location_change_discards_in_flight_send() {
        let mut chat = controller(ScriptedBackend::default());
        chat.select_location(Some("Lima"));
        let pending = chat.begin_send("Machu Picchu?").expect("send starts");

        chat.select_location(Some("Cusco"));
        assert!(!chat.is_locked());
        assert!(!chat.sink().loading);
        assert!(!chat.sink().input_locked);

        let outcome = chat.complete_send(pending.ticket, Ok(ChatReply::text("stale answer")));

        assert_eq!(outcome, SendOutcome::Discarded);
        assert_eq!(texts(chat.sink()), [welcome_message("Cusco").as_str()]);
        assert!(chat.store().history().is_empty());
    }

    #[test]
    fn test_stale_weather_is_discarded() {
        let mut chat = controller(ScriptedBackend::default());
        let lima = chat.select_location(Some("Lima")).expect("ticket");
        let cusco = chat.select_location(Some("Cusco")).expect("ticket");

        assert!(!chat.apply_weather(&lima, Ok(snapshot("Lima", 22.0))));
        assert!(chat.sink().badge.is_none());

        assert!(chat.apply_weather(&cusco, Ok(snapshot("Cusco", 12.0))));
        assert_eq!(chat.sink().badge.as_ref().map(|b| b.band), Some(TempBand::Mild));
    }

    #[test]
    fn test_empty_location_name_clears() {
        let mut chat = controller(ScriptedBackend::default());
        assert!(chat.select_location(Some("   ")).is_none());
        assert!(chat.store().location().is_none());
    }

    #[tokio::test]
    async fn test_load_locations_failure_is_empty() {
        let chat = controller(ScriptedBackend::default());
        assert!(chat.load_locations().await.is_empty());

        let chat = controller(ScriptedBackend {
            locations: Some(vec!["Rome".to_string(), "Kyoto".to_string()]),
            ..Default::default()
        });
        assert_eq!(chat.load_locations().await, ["Rome", "Kyoto"]);
    }
}
