//! Chat session controller
//!
//! Owns the in-memory state of the stylist conversation: the set of chat
//! sessions, the active session, and the working message list. A send
//! appends the user turn optimistically, calls the backend, appends the
//! assistant turn, then refetches the full chat list and replaces local
//! state with server truth. The optimistic append is a latency hider, not
//! the system of record.

use std::sync::Arc;

use stylemuse_protocol::common::{ChatSession, Message, ProductList, Role, User};

use crate::client::ApiClient;
use crate::error::Result;

/// Substring the backend uses to report the photo precondition.
const PHOTO_PRECONDITION_MARKER: &str = "upload at least one photo";

/// Guidance rendered when the backend rejects a send for a missing photo.
const PHOTO_GUIDANCE: &str =
    "I need at least one profile photo to style you. Please upload one from your profile, \
     then come back and we'll pick up right here.";

/// Where the CLI should take the user next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Profile,
}

/// Result of one pass through the send protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, a send already in flight, or no active chat. Silent
    /// no-op, nothing was appended.
    Ignored,
    /// The recording produced no usable transcript.
    NoSpeech,
    /// Assistant replied; carries the reply text for optional speech output.
    Replied(String),
    /// The failure was rendered as an assistant message.
    Failed,
    /// The active chat changed while the send was in flight; the late reply
    /// was dropped instead of landing in the wrong session.
    Discarded,
}

/// Controller for the active stylist conversation.
pub struct ChatController<C: ApiClient + ?Sized> {
    client: Arc<C>,
    user: User,
    chats: Vec<ChatSession>,
    active: Option<String>,
    messages: Vec<Message>,
    sending: bool,
    pending_redirect: Option<Redirect>,
}

impl<C: ApiClient + ?Sized> ChatController<C> {
    /// The session user is handed in explicitly; the controller never reads
    /// ambient persisted state.
    pub fn new(client: Arc<C>, user: User) -> Self {
        Self {
            client,
            user,
            chats: Vec::new(),
            active: None,
            messages: Vec::new(),
            sending: false,
            pending_redirect: None,
        }
    }

    /// Load the user's chats and select the first one.
    ///
    /// Chat is gated on profile completeness: a user without photos is
    /// redirected before any fetch is issued.
    pub async fn init(&mut self) -> Result<Option<Redirect>> {
        if !self.user.has_photos() {
            return Ok(Some(Redirect::Profile));
        }

        self.chats = self.client.get_chats(&self.user.id).await?;

        if self.chats.is_empty() {
            self.active = None;
            self.messages.clear();
        } else if self.active.is_none() {
            let first = &self.chats[0];
            self.active = Some(first.id.clone());
            self.messages = first.messages.clone();
        }

        Ok(None)
    }

    /// Run the send protocol for typed input.
    ///
    /// Never fails: every error terminates in a rendered assistant message.
    pub async fn send(&mut self, input: &str) -> SendOutcome {
        let text = input.trim().to_string();
        if text.is_empty() || self.sending {
            return SendOutcome::Ignored;
        }
        let Some(target_chat) = self.active.clone() else {
            return SendOutcome::Ignored;
        };

        self.messages.push(Message::user(text.clone()));
        self.sending = true;

        let result = self
            .client
            .send_chat_message(&text, &self.user.id, Some(target_chat.as_str()))
            .await;

        // In-flight sends are tagged with their target chat; a reply that
        // lands after a switch must not touch the now-active session.
        if self.active.as_deref() != Some(target_chat.as_str()) {
            tracing::warn!(chat = %target_chat, "dropping reply for a chat that is no longer active");
            self.sending = false;
            return SendOutcome::Discarded;
        }

        let outcome = match result {
            Ok(reply) if !reply.response.trim().is_empty() => {
                let mut message = Message::assistant(reply.response.clone());
                message.products = reply.products;
                message.merged_images = reply.merged_images;
                self.messages.push(message);

                if let Err(e) = self.reconcile().await {
                    tracing::warn!("chat refetch after send failed, keeping local view: {e}");
                }

                SendOutcome::Replied(reply.response)
            }
            Ok(_) => {
                tracing::warn!("assistant returned an empty reply");
                if let Err(e) = self.reconcile().await {
                    tracing::warn!("chat refetch after send failed, keeping local view: {e}");
                }
                SendOutcome::Failed
            }
            Err(e) => {
                let rendered = e.to_string();
                if rendered.contains(PHOTO_PRECONDITION_MARKER) {
                    self.messages.push(Message::assistant(PHOTO_GUIDANCE));
                    self.pending_redirect = Some(Redirect::Profile);
                } else {
                    self.messages
                        .push(Message::assistant(format!("Error: {rendered}")));
                }
                SendOutcome::Failed
            }
        };

        self.sending = false;
        outcome
    }

    /// Voice variant of the send protocol.
    ///
    /// An empty transcript after a recording session is reported instead of
    /// entering the send protocol.
    pub async fn send_transcript(&mut self, transcript: &str) -> SendOutcome {
        if transcript.trim().is_empty() {
            return SendOutcome::NoSpeech;
        }
        self.send(transcript).await
    }

    /// Replace local state with server truth.
    async fn reconcile(&mut self) -> Result<()> {
        self.chats = self.client.get_chats(&self.user.id).await?;

        match self
            .active
            .as_ref()
            .and_then(|id| self.chats.iter().find(|c| &c.id == id))
        {
            Some(chat) => {
                self.messages = chat.messages.clone();
            }
            None => {
                // The active session disappeared server side; fall back to
                // the first one.
                if let Some(first) = self.chats.first() {
                    self.active = Some(first.id.clone());
                    self.messages = first.messages.clone();
                } else {
                    self.active = None;
                    self.messages.clear();
                }
            }
        }

        Ok(())
    }

    /// Select a different existing chat. No network call: every session's
    /// history was fetched up front.
    pub fn switch_chat(&mut self, chat_id: &str) -> Result<()> {
        let chat = self
            .chats
            .iter()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| crate::error::MuseError::chat_not_found(chat_id))?;

        self.active = Some(chat.id.clone());
        self.messages = chat.messages.clone();
        Ok(())
    }

    /// Create a new chat session and make it active.
    pub async fn create_chat(&mut self, session_name: &str) -> Result<ChatSession> {
        let chat = self
            .client
            .create_chat(&self.user.id, session_name)
            .await?;

        self.active = Some(chat.id.clone());
        self.messages = chat.messages.clone();
        self.chats.push(chat.clone());
        Ok(chat)
    }

    pub fn chats(&self) -> &[ChatSession] {
        &self.chats
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn active_chat(&self) -> Option<&ChatSession> {
        self.active
            .as_ref()
            .and_then(|id| self.chats.iter().find(|c| &c.id == id))
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Consume the pending navigation signal, if any.
    pub fn take_redirect(&mut self) -> Option<Redirect> {
        self.pending_redirect.take()
    }

    /// Most recent product recommendation in the working list.
    pub fn last_products(&self) -> Option<&ProductList> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.products.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MuseError;
    use crate::tests::mocks::MockApiClient;
    use serde_json::json;
    use stylemuse_protocol::common::Profile;

    fn user_with_photos() -> User {
        User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            display_name: None,
            profile: Profile {
                photos: vec!["https://cdn.example.com/users/alice/p1.jpg".to_string()],
                ..Default::default()
            },
        }
    }

    fn user_without_photos() -> User {
        User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            display_name: None,
            profile: Profile::default(),
        }
    }

    fn server_chats() -> serde_json::Value {
        json!([
            {
                "id": "c1",
                "sessionName": "Spring looks",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello, what are we styling today?"}
                ]
            },
            {
                "id": "c2",
                "sessionName": "Workwear",
                "messages": []
            }
        ])
    }

    async fn controller_with_chats(client: Arc<MockApiClient>) -> ChatController<MockApiClient> {
        client.add_response("api/chats/u1", server_chats());
        let mut controller = ChatController::new(client, user_with_photos());
        assert!(controller.init().await.unwrap().is_none());
        controller
    }

    #[tokio::test]
    async fn init_selects_first_chat() {
        let client = Arc::new(MockApiClient::new());
        let controller = controller_with_chats(client).await;

        assert_eq!(controller.chats().len(), 2);
        assert_eq!(controller.active_chat().unwrap().id, "c1");
        assert_eq!(controller.messages().len(), 2);
    }

    #[tokio::test]
    async fn init_with_zero_chats_leaves_nothing_active() {
        let client = Arc::new(MockApiClient::new());
        client.add_response("api/chats/u1", json!([]));

        let mut controller = ChatController::new(client, user_with_photos());
        assert!(controller.init().await.unwrap().is_none());

        assert!(controller.chats().is_empty());
        assert!(controller.active_chat().is_none());
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn missing_photos_redirects_without_fetching() {
        let client = Arc::new(MockApiClient::new());
        let mut controller = ChatController::new(client.clone(), user_without_photos());

        let redirect = controller.init().await.unwrap();
        assert_eq!(redirect, Some(Redirect::Profile));
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn init_substitutes_empty_list_for_non_array() {
        let client = Arc::new(MockApiClient::new());
        client.add_response("api/chats/u1", json!({"error": "unexpected"}));

        let mut controller = ChatController::new(client, user_with_photos());
        assert!(controller.init().await.unwrap().is_none());
        assert!(controller.chats().is_empty());
        assert!(controller.active_chat().is_none());
    }

    #[tokio::test]
    async fn send_appends_one_user_and_one_assistant_turn() {
        let client = Arc::new(MockApiClient::new());
        client.add_response(
            "chat",
            json!({"response": "try a linen blazer", "ranked_products": [
                {"id": "p1", "title": "Linen blazer", "price": "89.00"}
            ]}),
        );
        let mut controller = controller_with_chats(client).await;

        assert!(!controller.is_sending());
        let before = controller.messages().len();
        let outcome = controller.send("what should I wear to a garden party?").await;

        assert_eq!(outcome, SendOutcome::Replied("try a linen blazer".to_string()));
        assert!(!controller.is_sending());
        // Reconciliation replaced the list with server truth, so count the
        // roles rather than assume the optimistic view survived.
        let users = controller
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        let assistants = controller
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();
        assert!(users >= 1 && assistants >= 1);
        assert!(before <= controller.messages().len() + 2);
    }

    #[tokio::test]
    async fn blank_input_is_a_silent_noop() {
        let client = Arc::new(MockApiClient::new());
        let mut controller = controller_with_chats(client.clone()).await;

        let before = controller.messages().len();
        assert_eq!(controller.send("   ").await, SendOutcome::Ignored);
        assert_eq!(controller.messages().len(), before);

        // Only the init fetch hit the backend.
        assert_eq!(client.get_requests().len(), 1);
    }

    #[tokio::test]
    async fn send_while_sending_is_a_noop() {
        let client = Arc::new(MockApiClient::new());
        let mut controller = controller_with_chats(client).await;

        controller.sending = true;
        let before = controller.messages().len();
        assert_eq!(controller.send("hello?").await, SendOutcome::Ignored);
        assert_eq!(controller.messages().len(), before);
    }

    #[tokio::test]
    async fn send_without_active_chat_is_a_noop() {
        let client = Arc::new(MockApiClient::new());
        client.add_response("api/chats/u1", json!([]));
        let mut controller = ChatController::new(client, user_with_photos());
        controller.init().await.unwrap();

        assert_eq!(controller.send("anyone there?").await, SendOutcome::Ignored);
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn ranked_products_win_over_styled() {
        let client = Arc::new(MockApiClient::new());
        client.add_response(
            "chat",
            json!({
                "response": "here are both pipelines",
                "ranked_products": [{"id": "r1", "title": "Ranked coat"}],
                "styled_products": [{"id": "s1", "title": "Styled coat"}]
            }),
        );
        let mut controller = controller_with_chats(client.clone()).await;

        // Make the post-send refetch fail so the optimistic view (with the
        // rendered product list) is what we inspect.
        client.add_error("api/chats/u1", MuseError::api(503, "busy"));

        controller.send("coats please").await;
        let products = controller.last_products().expect("products rendered");
        assert_eq!(products.items.len(), 1);
        assert_eq!(products.items[0].id, "r1");
    }

    #[tokio::test]
    async fn photo_precondition_failure_renders_guidance_and_redirects() {
        let client = Arc::new(MockApiClient::new());
        client.add_error(
            "chat",
            MuseError::api(400, "Please upload at least one photo to continue"),
        );
        let mut controller = controller_with_chats(client).await;

        let outcome = controller.send("style me").await;
        assert_eq!(outcome, SendOutcome::Failed);

        let last = controller.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("profile photo"));
        assert_eq!(controller.take_redirect(), Some(Redirect::Profile));
        assert_eq!(controller.take_redirect(), None);
        assert!(!controller.is_sending());
    }

    #[tokio::test]
    async fn other_failures_render_a_generic_error_without_redirect() {
        let client = Arc::new(MockApiClient::new());
        client.add_error("chat", MuseError::api(500, "stylist overloaded"));
        let mut controller = controller_with_chats(client).await;

        let before_users = controller
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        let outcome = controller.send("hello").await;
        assert_eq!(outcome, SendOutcome::Failed);

        let last = controller.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with("Error: "));
        assert!(last.content.contains("stylist overloaded"));
        assert_eq!(controller.take_redirect(), None);

        // Exactly one optimistic user turn was added.
        let after_users = controller
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        assert_eq!(after_users, before_users + 1);
    }

    #[tokio::test]
    async fn reconciliation_converges_to_server_truth() {
        let client = Arc::new(MockApiClient::new());
        client.add_response("chat", json!({"response": "noted"}));
        let mut controller = controller_with_chats(client.clone()).await;

        controller.send("remember I hate beige").await;

        // The mock keeps serving the same server view; a fresh fetch plus
        // reload must equal the reconciled working list.
        let server_view = client.get_chats("u1").await.unwrap();
        let active = controller.active_chat().unwrap().id.clone();
        let server_messages = &server_view.iter().find(|c| c.id == active).unwrap().messages;
        assert_eq!(controller.messages().len(), server_messages.len());
    }

    #[tokio::test]
    async fn switch_chat_replaces_working_list_without_network() {
        let client = Arc::new(MockApiClient::new());
        let mut controller = controller_with_chats(client.clone()).await;
        let fetches_before = client.get_requests().len();

        controller.switch_chat("c2").unwrap();
        assert_eq!(controller.active_chat().unwrap().id, "c2");
        assert!(controller.messages().is_empty());
        assert_eq!(client.get_requests().len(), fetches_before);

        assert!(controller.switch_chat("missing").is_err());
    }

    #[tokio::test]
    async fn create_chat_becomes_active_and_empty() {
        let client = Arc::new(MockApiClient::new());
        client.add_response(
            "api/createChat/",
            json!({"id": "c3", "sessionName": "Date night", "messages": []}),
        );
        let mut controller = controller_with_chats(client).await;

        controller.create_chat("Date night").await.unwrap();
        assert_eq!(controller.active_chat().unwrap().id, "c3");
        assert!(controller.messages().is_empty());
        assert_eq!(controller.chats().len(), 3);
    }

    #[tokio::test]
    async fn empty_transcript_reports_no_speech() {
        let client = Arc::new(MockApiClient::new());
        let mut controller = controller_with_chats(client.clone()).await;

        let before = controller.messages().len();
        assert_eq!(controller.send_transcript("  ").await, SendOutcome::NoSpeech);
        assert_eq!(controller.messages().len(), before);
        // No send request was issued.
        assert!(client
            .get_requests()
            .iter()
            .all(|r| !r.endpoint.contains("chat") || r.endpoint.contains("chats")));
    }
}
