use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{Listen, ListenSubmitter};
use crate::config::LastFmConfig;

/// `api_sig` as Last.fm defines it: every parameter except `format` and
/// `callback`, sorted by name, concatenated as name+value, followed by the
/// shared secret, md5 hashed.
pub fn sign(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let mut input = String::new();
    for (key, value) in params {
        if *key == "format" || *key == "callback" {
            continue;
        }
        input.push_str(key);
        input.push_str(value);
    }
    input.push_str(secret);
    format!("{:x}", md5::compute(input.as_bytes()))
}

async fn call(
    client: &Client,
    api_url: &str,
    secret: &str,
    mut params: BTreeMap<&str, String>,
) -> Result<Value> {
    let api_sig = sign(&params, secret);
    params.insert("api_sig", api_sig);
    params.insert("format", "json".to_string());

    let resp: Value = client.post(api_url).form(&params).send().await?.json().await?;
    if let Some(code) = resp.get("error") {
        let message = resp
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(anyhow!("Last.fm error {}: {}", code, message));
    }
    Ok(resp)
}

/// Trades a token the user authorised in the browser for a session key.
pub async fn get_session(config: &LastFmConfig, token: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("method", "auth.getSession".to_string());
    params.insert("api_key", config.api_key.clone());
    params.insert("token", token.to_string());

    let resp = call(&Client::new(), &config.api_url, &config.api_secret, params).await?;
    resp["session"]["key"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Last.fm session response had no key"))
}

pub struct LastFmClient {
    client: Client,
    api_url: String,
    api_key: String,
    api_secret: String,
    session_key: String,
}

impl LastFmClient {
    /// `None` until the session exchange has been done.
    pub fn from_config(config: &LastFmConfig) -> Option<Self> {
        let session_key = config
            .session_key
            .as_deref()
            .filter(|k| !k.is_empty())?
            .to_string();
        Some(Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            session_key,
        })
    }

    fn track_params(&self, method: &str, listen: &Listen) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("method", method.to_string());
        params.insert("api_key", self.api_key.clone());
        params.insert("sk", self.session_key.clone());
        params.insert("artist", listen.artist.clone());
        params.insert("track", listen.track.clone());
        if let Some(album) = &listen.release {
            params.insert("album", album.clone());
        }
        if listen.duration > 0.0 {
            params.insert("duration", (listen.duration.round() as u64).to_string());
        }
        params
    }
}

#[async_trait]
impl ListenSubmitter for LastFmClient {
    fn name(&self) -> &str {
        "Last.fm"
    }

    async fn now_playing(&self, listen: &Listen) -> Result<()> {
        let params = self.track_params("track.updateNowPlaying", listen);
        call(&self.client, &self.api_url, &self.api_secret, params).await?;
        Ok(())
    }

    async fn submit_listen(&self, listen: &Listen) -> Result<()> {
        let mut params = self.track_params("track.scrobble", listen);
        params.insert("timestamp", listen.listened_at.to_string());
        call(&self.client, &self.api_url, &self.api_secret, params).await?;
        Ok(())
    }
}
