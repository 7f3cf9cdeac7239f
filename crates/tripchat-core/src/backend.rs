use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::weather::WeatherSnapshot;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub location: String,
    pub history: Vec<String>,
}

/// Reply from `POST /api/chat`. The backend may omit `response`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
}

impl ChatReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
        }
    }

    /// The reply text, if there is any worth showing.
    pub fn content(&self) -> Option<&str> {
        self.response.as_deref().filter(|text| !text.is_empty())
    }
}

/// The travel backend the chat talks to.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn locations(&self) -> Result<Vec<String>>;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    async fn weather(&self, location: &str) -> Result<WeatherSnapshot>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| anyhow!("Invalid backend URL {}: {}", self.base_url, e))?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("Backend URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn locations(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["api", "locations"])?;

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list locations: {}", response.status()));
        }

        let locations: Vec<String> = response.json().await?;
        Ok(locations)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint(&["api", "chat"])?;

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat request failed with status {}: {}", status, text));
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply)
    }

    async fn weather(&self, location: &str) -> Result<WeatherSnapshot> {
        let url = self.endpoint(&["api", "weather", location])?;

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Weather not available for {}: {}",
                location,
                response.status()
            ));
        }

        let snapshot: WeatherSnapshot = response.json().await?;
        Ok(snapshot)
    }
}
