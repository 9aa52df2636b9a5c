use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::tts::{preprocess_text, TtsClient};
use super::NarrationAsset;
use crate::error::{SessionError, SessionResult};
use crate::settings::{NarrationSettings, VoiceSettings};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

pub const API_KEY_ENV: &str = "ELEVEN_LABS_API_KEY";
const API_BASE: &str = "https://api.elevenlabs.io/v1/text-to-speech";

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: String,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

/// ElevenLabs text-to-speech over HTTP. Rendered audio is written to the cache
/// directory and handed back as a file.
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    settings: NarrationSettings,
    cache_dir: PathBuf,
}

impl ElevenLabsClient {
    pub fn new(api_key: Option<String>, settings: NarrationSettings) -> Self {
        let cache_dir = settings
            .cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("guided-sessions"));
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: API_BASE.to_string(),
            settings,
            cache_dir,
        }
    }

    /// Reads the key from `ELEVEN_LABS_API_KEY`.
    pub fn from_env(settings: NarrationSettings) -> Self {
        Self::new(std::env::var(API_KEY_ENV).ok(), settings)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.settings.voice_id)
    }
}

#[async_trait]
impl TtsClient for ElevenLabsClient {
    async fn text_to_speech(&self, full_text: &str) -> SessionResult<NarrationAsset> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SessionError::Generation(format!("{} is not set", API_KEY_ENV)))?;

        let request = SpeechRequest {
            text: preprocess_text(full_text),
            model_id: &self.settings.model_id,
            voice_settings: &self.settings.voice,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            log_error!("ElevenLabs returned HTTP {}: {}", status, body);
            return Err(SessionError::Generation(format!(
                "ElevenLabs returned HTTP {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SessionError::Generation(e.to_string()))?;

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| SessionError::Generation(format!("cache dir: {}", e)))?;
        let path = self.cache_dir.join(format!("{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| SessionError::Generation(format!("{}: {}", path.display(), e)))?;

        log_info!("narration rendered: {} bytes at {}", audio.len(), path.display());
        Ok(NarrationAsset { path })
    }
}
