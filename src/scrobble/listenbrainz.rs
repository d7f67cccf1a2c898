use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Listen, ListenSubmitter};

pub struct ListenBrainzClient {
    client: Client,
    api_url: String,
    token: String,
}

impl ListenBrainzClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn track_metadata(listen: &Listen) -> Value {
        let mut metadata = json!({
            "artist_name": listen.artist,
            "track_name": listen.track,
            "additional_info": {
                "submission_client": crate::config::APP_NAME,
                "duration_ms": (listen.duration * 1000.0).round() as u64,
            },
        });
        if let Some(release) = &listen.release {
            metadata["release_name"] = json!(release);
        }
        metadata
    }

    /// Body for `/1/submit-listens`. A `playing_now` listen carries no
    /// timestamp.
    pub fn payload(listen_type: &str, listen: &Listen) -> Value {
        let mut entry = json!({ "track_metadata": Self::track_metadata(listen) });
        if listen_type != "playing_now" {
            entry["listened_at"] = json!(listen.listened_at);
        }
        json!({
            "listen_type": listen_type,
            "payload": [entry],
        })
    }

    async fn submit(&self, listen_type: &str, listen: &Listen) -> Result<()> {
        let url = format!("{}/1/submit-listens", self.api_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.token))
            .json(&Self::payload(listen_type, listen))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("ListenBrainz returned {}: {}", status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl ListenSubmitter for ListenBrainzClient {
    fn name(&self) -> &str {
        "ListenBrainz"
    }

    async fn now_playing(&self, listen: &Listen) -> Result<()> {
        self.submit("playing_now", listen).await
    }

    async fn submit_listen(&self, listen: &Listen) -> Result<()> {
        self.submit("single", listen).await
    }
}
