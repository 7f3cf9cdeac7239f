pub mod backend;
pub mod config;
pub mod controller;
pub mod markdown;
pub mod render;
pub mod state;
pub mod weather;

// Re-export main types for convenience
pub use backend::{Backend, ChatReply, ChatRequest, HttpBackend};
pub use config::Config;
pub use controller::{ChatController, PendingSend, Phase, SendOutcome, SendTicket, WeatherTicket};
pub use render::{RecordingSink, RenderSink, RenderedMessage};
pub use state::{ConversationStore, Message, Sender};
pub use weather::{BadgeDisplay, TempBand, WeatherSnapshot};
