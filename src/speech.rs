//! Speech output adapter
//!
//! Converts assistant reply text to audio through a third-party synthesis
//! endpoint and plays it back with an external player. Failures here are
//! logged by callers and never affect the rendered conversation.

use serde::Serialize;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::SpeechConfig;
use crate::error::{MuseError, Result};

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Text-to-speech client.
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl SpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn synthesis_url(&self) -> String {
        self.config
            .synthesis_endpoint
            .replace("{voice_id}", &self.config.voice_id)
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        }
    }

    /// Synthesize speech audio for a reply.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let key = std::env::var(&self.config.synthesis_key_env).map_err(|_| {
            MuseError::synthesis(format!("{} not set", self.config.synthesis_key_env))
        })?;

        let response = self
            .client
            .post(self.synthesis_url())
            .header("xi-api-key", key)
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MuseError::synthesis(format!(
                "synthesis http {status}: {body}"
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Synthesize and play a reply.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let audio = self.synthesize(text).await?;
        play_audio(&audio).await
    }
}

/// Play an audio payload by spawning an external player.
async fn play_audio(bytes: &[u8]) -> Result<()> {
    let path = std::env::temp_dir().join(format!(
        "muse-reply-{}.mp3",
        chrono::Utc::now().timestamp_millis()
    ));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| MuseError::io_from_error("Write audio", e))?;

    let status = if which::which("ffplay").is_ok() {
        Command::new("ffplay")
            .args(["-nodisp", "-autoexit", "-loglevel", "error"])
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
    } else if which::which("mpv").is_ok() {
        Command::new("mpv")
            .args(["--no-video", "--really-quiet"])
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
    } else {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(MuseError::audio_tool_missing(
            "No audio player found. Install ffplay or mpv to hear replies.",
        ));
    };

    let _ = tokio::fs::remove_file(&path).await;

    match status {
        Ok(st) if st.success() => Ok(()),
        Ok(st) => Err(MuseError::playback(format!(
            "player exited with code {}",
            st.code().unwrap_or(-1)
        ))),
        Err(e) => Err(MuseError::playback(format!("failed to spawn player: {e}"))),
    }
}
