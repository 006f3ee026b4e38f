//! Voice capture adapter
//!
//! Speech recognition is modelled as an event source: a capture session
//! emits a finite sequence of interim transcripts followed by exactly one
//! terminal event (final transcript or error) on a channel that closes with
//! the session. The chat loop drains the channel, so no listener outlives a
//! recording.
//!
//! Capture itself is two steps: record microphone audio to WAV through an
//! external recorder process, then transcribe it with one multipart request
//! to a speech-to-text endpoint. The locale is fixed to English.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::config::SpeechConfig;
use crate::error::{MuseError, Result};

/// One recognition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Partial transcript; informational only.
    Interim(String),
    /// Terminal: the recognized text, possibly empty when nothing was said.
    Final(String),
    /// Terminal: recognition failed.
    Error(String),
}

/// Microphone recorder backed by an external process.
///
/// Prefers `ffmpeg` (graceful stop by sending `q` on stdin), falls back to
/// `arecord`. Mono, 16 kHz, 16-bit WAV.
pub struct VoiceRecorder {
    child: Child,
    path: PathBuf,
    graceful_stop: bool,
}

impl VoiceRecorder {
    pub fn start() -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "muse-voice-{}.wav",
            chrono::Utc::now().timestamp_millis()
        ));

        if which::which("ffmpeg").is_ok() {
            let child = Command::new("ffmpeg")
                .args([
                    "-hide_banner", "-loglevel", "error", "-f", "alsa", "-i", "default", "-ac",
                    "1", "-ar", "16000", "-y",
                ])
                .arg(&path)
                .stdin(Stdio::piped())
                .spawn()
                .map_err(|e| MuseError::audio_tool_missing(format!("failed to start ffmpeg: {e}")))?;
            return Ok(Self {
                child,
                path,
                graceful_stop: true,
            });
        }

        if which::which("arecord").is_ok() {
            let child = Command::new("arecord")
                .args(["-q", "-f", "S16_LE", "-r", "16000", "-c", "1", "-t", "wav"])
                .arg(&path)
                .stdin(Stdio::null())
                .spawn()
                .map_err(|e| {
                    MuseError::audio_tool_missing(format!("failed to start arecord: {e}"))
                })?;
            return Ok(Self {
                child,
                path,
                graceful_stop: false,
            });
        }

        Err(MuseError::audio_tool_missing(
            "No recorder found. Install ffmpeg or arecord to use voice input.",
        ))
    }

    /// Stop recording and return the captured WAV bytes.
    pub async fn stop_into_wav(mut self) -> Result<Vec<u8>> {
        if self.graceful_stop {
            if let Some(mut stdin) = self.child.stdin.take() {
                let _ = stdin.write_all(b"q\n").await;
            }
        } else {
            let _ = self.child.kill().await;
        }
        let _ = self.child.wait().await;

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| MuseError::io_from_error("Read recording", e))?;
        let _ = tokio::fs::remove_file(&self.path).await;
        Ok(bytes)
    }
}

/// Transcribe WAV audio with one multipart request.
async fn transcribe(config: &SpeechConfig, wav: Vec<u8>) -> Result<String> {
    let key = std::env::var(&config.transcription_key_env).map_err(|_| {
        MuseError::transcription(format!("{} not set", config.transcription_key_env))
    })?;

    let part = reqwest::multipart::Part::bytes(wav)
        .file_name("audio.wav")
        .mime_str("audio/wav")
        .map_err(|e| MuseError::transcription(format!("invalid audio part: {e}")))?;
    let form = reqwest::multipart::Form::new()
        .text("model", config.transcription_model.clone())
        .text("language", "en")
        .part("file", part);

    let client = reqwest::Client::new();
    let response = client
        .post(&config.transcription_endpoint)
        .bearer_auth(key)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MuseError::transcription(format!(
            "transcription http {status}: {body}"
        )));
    }

    let value: serde_json::Value = response.json().await?;
    Ok(value
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// A running capture session.
pub struct CaptureSession {
    recorder: VoiceRecorder,
    config: SpeechConfig,
}

/// Voice capture entry point.
pub struct VoiceCapture {
    config: SpeechConfig,
}

impl VoiceCapture {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Start recording.
    pub fn start(&self) -> Result<CaptureSession> {
        Ok(CaptureSession {
            recorder: VoiceRecorder::start()?,
            config: self.config.clone(),
        })
    }
}

impl CaptureSession {
    /// Stop recording and return the event stream.
    ///
    /// The channel yields interim events (if any), then one terminal event,
    /// then closes.
    pub fn finish(self) -> mpsc::Receiver<TranscriptEvent> {
        let (tx, rx) = mpsc::channel(8);

        tokio::spawn(async move {
            let wav = match self.recorder.stop_into_wav().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(TranscriptEvent::Error(e.to_string())).await;
                    return;
                }
            };

            match transcribe(&self.config, wav).await {
                Ok(text) => {
                    let _ = tx.send(TranscriptEvent::Final(text)).await;
                }
                Err(e) => {
                    let _ = tx.send(TranscriptEvent::Error(e.to_string())).await;
                }
            }
        });

        rx
    }
}

/// Drain a capture event stream to its terminal event.
///
/// An empty final transcript is returned as an empty string; the caller
/// decides how to report "no speech detected".
pub async fn final_transcript(rx: &mut mpsc::Receiver<TranscriptEvent>) -> Result<String> {
    while let Some(event) = rx.recv().await {
        match event {
            TranscriptEvent::Interim(text) => {
                tracing::debug!("interim transcript: {text}");
            }
            TranscriptEvent::Final(text) => return Ok(text),
            TranscriptEvent::Error(message) => return Err(MuseError::transcription(message)),
        }
    }

    // Channel closed without a terminal event; treat as silence.
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_skips_interims_and_returns_final() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(TranscriptEvent::Interim("what sh".to_string()))
            .await
            .unwrap();
        tx.send(TranscriptEvent::Interim("what should I".to_string()))
            .await
            .unwrap();
        tx.send(TranscriptEvent::Final("what should I wear".to_string()))
            .await
            .unwrap();
        drop(tx);

        let text = final_transcript(&mut rx).await.unwrap();
        assert_eq!(text, "what should I wear");
    }

    #[tokio::test]
    async fn drain_surfaces_terminal_error() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(TranscriptEvent::Error("microphone unplugged".to_string()))
            .await
            .unwrap();
        drop(tx);

        let err = final_transcript(&mut rx).await.unwrap_err();
        assert!(err.to_string().contains("microphone unplugged"));
    }

    #[tokio::test]
    async fn closed_channel_means_silence() {
        let (tx, mut rx) = mpsc::channel::<TranscriptEvent>(1);
        drop(tx);

        let text = final_transcript(&mut rx).await.unwrap();
        assert!(text.is_empty());
    }
}
