use dialoguer::{Input, Password};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use stylemuse_protocol::api::ProfileUpdate;
use stylemuse_protocol::common::Message;

use crate::chat::{ChatController, Redirect, SendOutcome};
use crate::client::{ApiClient, HttpClient};
use crate::config::AppConfig;
use crate::error::{MuseError, Result};
use crate::profile::ProfileService;
use crate::session::{SessionStore, StoredSession};
use crate::speech::SpeechSynthesizer;
use crate::ui::UI;
use crate::voice::{self, VoiceCapture};
use crate::{
    ChatArgs, Commands, ConfigCommand, LikeArgs, LoginArgs, PhotosCommand, ProfileCommand,
};

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    /// Create a new CLI handler with an optional custom config path
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    /// Load configuration using the handler's config path
    async fn load_config(&self) -> Result<AppConfig> {
        AppConfig::load(self.config_path.as_deref()).await
    }

    fn session_store(config: &AppConfig) -> SessionStore {
        SessionStore::new(config.session_path())
    }

    fn client(config: &AppConfig) -> Result<Arc<HttpClient>> {
        Ok(Arc::new(HttpClient::new(config.to_client_config())?))
    }

    /// Load the persisted session or report "not authenticated".
    fn require_session(&self, store: &SessionStore) -> Result<StoredSession> {
        match store.load()? {
            Some(session) => Ok(session),
            None => {
                self.ui.error("Not logged in. Run `muse login` first.");
                Err(MuseError::session_not_found())
            }
        }
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status().await,
            Commands::Chat(args) => self.handle_chat(args).await,
            Commands::Profile(args) => self.handle_profile(args.command).await,
            Commands::Photos(args) => self.handle_photos(args.command).await,
            Commands::Like(args) => self.handle_like(args).await,
            Commands::Config(args) => self.handle_config(args.command).await,
        }
    }

    /// Handle login command
    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let config = self.load_config().await?;
        let client = Self::client(&config)?;

        let username = match args.username {
            Some(name) => name,
            None => Input::new().with_prompt("Username").interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        let user = client.login(&username, &password).await?;
        Self::session_store(&config).save(&user)?;

        self.ui
            .success(&format!("Logged in as {}", user.username));
        if !user.has_photos() {
            self.ui.warning(
                "Your profile has no photos yet. Upload one with `muse photos upload <path>` to unlock chat.",
            );
        }
        Ok(())
    }

    /// Handle logout command
    async fn handle_logout(&mut self) -> Result<()> {
        let config = self.load_config().await?;
        Self::session_store(&config).clear()?;
        self.ui.success("Logged out.");
        Ok(())
    }

    /// Handle status command
    async fn handle_status(&mut self) -> Result<()> {
        let config = self.load_config().await?;
        let store = Self::session_store(&config);
        let session = store.load()?;

        let mut status_info = vec![
            ("Version", crate::version::format_version_info()),
            (
                "Authentication",
                self.ui.format_auth_status(session.is_some()),
            ),
        ];

        if let Some(session) = &session {
            status_info.push((
                "Username",
                self.ui.format_user_field(Some(session.user.username.clone())),
            ));
            status_info.push((
                "Photos",
                session.user.profile.photos.len().to_string(),
            ));
            status_info.push(("Liked", session.user.profile.liked.len().to_string()));

            let client = Self::client(&config)?;
            let server = match client.get_chats(&session.user.id).await {
                Ok(_) => self.ui.format_server_status(true),
                Err(e) if e.is_auth_error() => {
                    format!(
                        "{} (session rejected, run `muse login` again)",
                        self.ui.format_server_status(false)
                    )
                }
                Err(e) => format!("{} ({})", self.ui.format_server_status(false), e),
            };
            status_info.push(("Server", server));
        } else {
            status_info.push(("Server", config.endpoint.clone()));
        }

        self.ui.card("Status", status_info);
        Ok(())
    }

    /// Handle profile command
    async fn handle_profile(&mut self, command: ProfileCommand) -> Result<()> {
        let config = self.load_config().await?;
        let store = Self::session_store(&config);
        let session = self.require_session(&store)?;

        match command {
            ProfileCommand::Show => {
                let profile = &session.user.profile;
                self.ui.card(
                    &format!("Profile: {}", session.user.username),
                    vec![
                        ("Top size", self.ui.format_user_field(profile.top_size.clone())),
                        (
                            "Bottom size",
                            self.ui.format_user_field(profile.bottom_size.clone()),
                        ),
                        (
                            "Shoe size",
                            self.ui.format_user_field(profile.shoe_size.clone()),
                        ),
                        ("Region", self.ui.format_user_field(profile.region.clone())),
                        ("Gender", self.ui.format_user_field(profile.gender.clone())),
                        (
                            "Age group",
                            self.ui.format_user_field(profile.age_group.clone()),
                        ),
                        ("Photos", profile.photos.len().to_string()),
                        ("Liked", profile.liked.len().to_string()),
                    ],
                );
            }
            ProfileCommand::Set {
                top_size,
                bottom_size,
                shoe_size,
                region,
                gender,
                age_group,
            } => {
                let update = ProfileUpdate {
                    top_size,
                    bottom_size,
                    shoe_size,
                    region,
                    gender,
                    age_group,
                };
                let client = Self::client(&config)?;
                let service = ProfileService::new(client, store);
                service.update(&session.user, &update).await?;
                self.ui.success("Profile updated.");
            }
        }
        Ok(())
    }

    /// Handle photos command
    async fn handle_photos(&mut self, command: PhotosCommand) -> Result<()> {
        let config = self.load_config().await?;
        let store = Self::session_store(&config);
        let session = self.require_session(&store)?;
        let client = Self::client(&config)?;
        let service = ProfileService::new(client.clone(), store);

        match command {
            PhotosCommand::List => {
                // Prefer fresh server URLs; fall back to the stored record.
                let photos = match client.image_urls(&session.user.username).await {
                    Ok(response) if !response.urls.is_empty() => response.urls,
                    Ok(_) => session.user.profile.photos.clone(),
                    Err(e) => {
                        tracing::warn!("photo URL refresh failed, using stored record: {e}");
                        session.user.profile.photos.clone()
                    }
                };
                if photos.is_empty() {
                    self.ui.info("No photos uploaded yet.");
                } else {
                    for (index, photo) in photos.iter().enumerate() {
                        println!("{}. {}", index + 1, photo);
                    }
                }
            }
            PhotosCommand::Upload { path } => {
                service.upload_photos(&session.user, &path).await?;
            }
            PhotosCommand::Remove { reference } => {
                let updated = service.remove_photo(&session.user, &reference).await?;
                self.ui.success(&format!(
                    "Photo removed; {} remaining",
                    updated.profile.photos.len()
                ));
            }
        }
        Ok(())
    }

    /// Handle like command
    async fn handle_like(&mut self, args: LikeArgs) -> Result<()> {
        let config = self.load_config().await?;
        let store = Self::session_store(&config);
        let session = self.require_session(&store)?;
        let client = Self::client(&config)?;
        let service = ProfileService::new(client, store);

        service.like(&session.user, &args.image_id).await;
        self.ui.success(&format!("Liked {}", args.image_id));
        Ok(())
    }

    /// Handle config command
    async fn handle_config(&mut self, command: ConfigCommand) -> Result<()> {
        let config_path = self
            .config_path
            .clone()
            .unwrap_or_else(crate::config::default_config_path);
        let mut config = self.load_config().await?;

        match command {
            ConfigCommand::Show => {
                self.ui.card(
                    "Configuration",
                    vec![
                        ("Endpoint", config.endpoint.clone()),
                        ("Timeout", format!("{}s", config.timeout)),
                        ("Storage dir", config.storage_dir.display().to_string()),
                        ("Voice", config.speech.voice_id.clone()),
                    ],
                );
            }
            ConfigCommand::SetEndpoint { url } => {
                if url.trim().is_empty() {
                    return Err(MuseError::invalid_endpoint("Endpoint cannot be empty"));
                }
                config.endpoint = url;
                config.save(&config_path).await?;
                self.ui.success("Endpoint updated.");
            }
            ConfigCommand::SetTimeout { seconds } => {
                config.timeout = seconds;
                config.save(&config_path).await?;
                self.ui.success("Timeout updated.");
            }
            ConfigCommand::SetVoice { voice_id } => {
                config.speech.voice_id = voice_id;
                config.save(&config_path).await?;
                self.ui.success("Voice updated.");
            }
            ConfigCommand::Reset => {
                let fresh = AppConfig::default();
                fresh.save(&config_path).await?;
                self.ui.success("Configuration reset to defaults.");
            }
        }
        Ok(())
    }

    /// Handle chat command: the interactive stylist loop
    async fn handle_chat(&mut self, args: ChatArgs) -> Result<()> {
        let config = self.load_config().await?;
        let store = Self::session_store(&config);
        let session = self.require_session(&store)?;
        let client = Self::client(&config)?;

        let mut controller = ChatController::new(client.clone(), session.user);

        if controller.init().await? == Some(Redirect::Profile) {
            self.ui.warning(
                "Chat needs at least one profile photo. Run `muse photos upload <path>` first.",
            );
            return Ok(());
        }

        // Open or create the named session when one was requested.
        if let Some(name) = &args.session {
            let existing = controller
                .chats()
                .iter()
                .find(|c| c.session_name == *name)
                .map(|c| c.id.clone());
            match existing {
                Some(id) => controller.switch_chat(&id)?,
                None => {
                    controller.create_chat(name).await?;
                }
            }
        }

        let mut voice_enabled = args.voice;
        let capture = VoiceCapture::new(config.speech.clone());
        let synthesizer = SpeechSynthesizer::new(config.speech.clone());

        self.ui.header("StyleMuse");
        match controller.active_chat() {
            Some(chat) => {
                self.ui
                    .info(&format!("Chat: {}", display_name(&chat.session_name)));
                for message in controller.messages() {
                    self.ui.chat_message(message);
                }
            }
            None => {
                self.ui
                    .info("No chats yet. Type /new to start your first one.");
            }
        }
        self.ui.info(
            "Commands: /new [name], /switch <n>, /chats, /like <n>, /voice, /quit",
        );

        loop {
            if voice_enabled {
                if !self.voice_turn(&mut controller, &capture, &synthesizer).await {
                    voice_enabled = false;
                }
            } else {
                let input: String = Input::new()
                    .with_prompt("you")
                    .allow_empty(true)
                    .interact_text()?;
                let trimmed = input.trim().to_string();

                match trimmed.as_str() {
                    "" => continue,
                    "/quit" | "/exit" => break,
                    "/chats" => {
                        for (index, chat) in controller.chats().iter().enumerate() {
                            println!(
                                "{}. {} ({} messages)",
                                index + 1,
                                display_name(&chat.session_name),
                                chat.messages.len()
                            );
                        }
                        continue;
                    }
                    "/voice" => {
                        voice_enabled = true;
                        self.ui.info("Voice input on. Speak after the prompt.");
                        continue;
                    }
                    _ => {}
                }

                if let Some(rest) = trimmed.strip_prefix("/new") {
                    let name = rest.trim();
                    let name = if name.is_empty() {
                        format!("Chat {}", &Uuid::new_v4().to_string()[..8])
                    } else {
                        name.to_string()
                    };
                    let chat = controller.create_chat(&name).await?;
                    self.ui
                        .success(&format!("Started {}", display_name(&chat.session_name)));
                    continue;
                }

                if let Some(rest) = trimmed.strip_prefix("/switch") {
                    match rest.trim().parse::<usize>().ok().and_then(|n| {
                        controller.chats().get(n.wrapping_sub(1)).map(|c| c.id.clone())
                    }) {
                        Some(id) => {
                            controller.switch_chat(&id)?;
                            self.ui.separator();
                            for message in controller.messages() {
                                self.ui.chat_message(message);
                            }
                        }
                        None => self.ui.warning("No such chat. Use /chats to list them."),
                    }
                    continue;
                }

                if let Some(rest) = trimmed.strip_prefix("/like") {
                    self.like_from_chat(&controller, &*client, rest.trim()).await;
                    continue;
                }

                let outcome = controller.send(&trimmed).await;
                self.render_outcome(&controller, outcome, None).await;
            }

            if let Some(Redirect::Profile) = controller.take_redirect() {
                self.ui.warning(
                    "Heading to your profile. Upload a photo with `muse photos upload <path>`, then reopen chat.",
                );
                break;
            }
        }

        Ok(())
    }

    /// One voice turn: record, transcribe, send, speak the reply.
    ///
    /// Returns false when voice input should be switched off.
    async fn voice_turn(
        &self,
        controller: &mut ChatController<HttpClient>,
        capture: &VoiceCapture,
        synthesizer: &SpeechSynthesizer,
    ) -> bool {
        let recording = match capture.start() {
            Ok(session) => session,
            Err(e) => {
                self.ui.warning(&format!("Voice unavailable: {e}"));
                return false;
            }
        };

        let typed: String = Input::new()
            .with_prompt("Recording... press Enter to stop, or type /voice to go back")
            .allow_empty(true)
            .interact_text()
            .unwrap_or_default();

        let mut events = recording.finish();

        if typed.trim() == "/voice" {
            self.ui.info("Voice input off.");
            return false;
        }

        let transcript = match voice::final_transcript(&mut events).await {
            Ok(text) => text,
            Err(e) => {
                self.ui.warning(&format!("Transcription failed: {e}"));
                return true;
            }
        };

        match controller.send_transcript(&transcript).await {
            SendOutcome::NoSpeech => {
                self.ui.warning("No speech detected.");
                true
            }
            outcome => {
                self.ui.chat_message(&Message::user(transcript));
                self.render_outcome(controller, outcome, Some(synthesizer)).await;
                true
            }
        }
    }

    /// Render the result of a send and optionally speak the reply.
    async fn render_outcome(
        &self,
        controller: &ChatController<HttpClient>,
        outcome: SendOutcome,
        speak_with: Option<&SpeechSynthesizer>,
    ) {
        match outcome {
            SendOutcome::Replied(reply) => {
                if let Some(message) = controller.messages().last() {
                    self.ui.chat_message(message);
                }
                if let Some(synthesizer) = speak_with {
                    if let Err(e) = synthesizer.speak(&reply).await {
                        tracing::warn!("speech output failed: {e}");
                    }
                }
            }
            SendOutcome::Failed => {
                if let Some(message) = controller.messages().last() {
                    self.ui.chat_message(message);
                }
            }
            SendOutcome::Ignored | SendOutcome::Discarded | SendOutcome::NoSpeech => {}
        }
    }

    /// Like the n-th product of the most recent recommendation.
    async fn like_from_chat(
        &self,
        controller: &ChatController<HttpClient>,
        client: &HttpClient,
        index: &str,
    ) {
        let Some(products) = controller.last_products() else {
            self.ui
                .warning("Nothing to like yet. Ask for recommendations first.");
            return;
        };

        let Some(product) = index
            .parse::<usize>()
            .ok()
            .and_then(|n| products.items.get(n.wrapping_sub(1)))
        else {
            self.ui
                .warning(&format!("Pick a number from 1 to {}.", products.items.len()));
            return;
        };

        // Fire-and-forget: a failed like never interrupts the conversation.
        match client
            .like_image(&controller.user().username, &product.id)
            .await
        {
            Ok(_) => self.ui.success(&format!("Liked {}", product.title)),
            Err(e) => tracing::warn!(product = %product.id, "like request failed: {e}"),
        }
    }
}

fn display_name(session_name: &str) -> &str {
    if session_name.is_empty() {
        "(unnamed chat)"
    } else {
        session_name
    }
}
