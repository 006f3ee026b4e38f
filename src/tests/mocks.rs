//! Mock implementations for testing

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

use stylemuse_protocol::api::{
    ChatMessageResponse, ChatReply, ImageUrlsResponse, LikeResponse, ProfileUpdate,
    UploadUrlResponse,
};
use stylemuse_protocol::common::{ChatSession, User};

use crate::client::{chats_from_value, ApiClient};
use crate::config::ClientConfig;
use crate::error::{MuseError, Result};

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub endpoint: String,
    pub payload: Option<Value>,
}

/// Simple mock API client for testing
///
/// Responses are registered per endpoint path and served on every match;
/// errors are one-shot so a failure-then-success sequence can be scripted.
#[derive(Debug, Clone, Default)]
pub struct MockApiClient {
    config: ClientConfig,
    responses: Arc<Mutex<Vec<(String, Value)>>>,
    errors: Arc<Mutex<Vec<(String, MuseError)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sticky response for an endpoint.
    pub fn add_response(&self, endpoint: impl Into<String>, response: Value) {
        self.responses
            .lock()
            .unwrap()
            .push((endpoint.into(), response));
    }

    /// Register a one-shot error for an endpoint; it takes priority over any
    /// registered response.
    pub fn add_error(&self, endpoint: impl Into<String>, error: MuseError) {
        self.errors.lock().unwrap().push((endpoint.into(), error));
    }

    /// Everything requested so far, in order.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: Method, endpoint: &str, payload: Option<Value>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            endpoint: endpoint.to_string(),
            payload,
        });
    }

    fn take_error(&self, endpoint: &str) -> Option<MuseError> {
        let mut errors = self.errors.lock().unwrap();
        let index = errors.iter().position(|(ep, _)| ep == endpoint)?;
        Some(errors.remove(index).1)
    }

    fn response_for(&self, endpoint: &str) -> Result<Value> {
        let responses = self.responses.lock().unwrap();
        responses
            .iter()
            .find(|(ep, _)| ep == endpoint)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                MuseError::internal(format!("no mock response registered for {endpoint}"))
            })
    }

    fn respond<R: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<R> {
        self.record(method, endpoint, payload);
        if let Some(err) = self.take_error(endpoint) {
            return Err(err);
        }
        let value = self.response_for(endpoint)?;
        serde_json::from_value(value).map_err(|e| MuseError::serialization(e.to_string()))
    }
}

impl ApiClient for MockApiClient {
    fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn login(&self, username: &str, password: &str) -> Result<User> {
        self.respond(
            Method::POST,
            "api/login",
            Some(json!({"username": username, "password": password})),
        )
    }

    async fn update_profile(&self, username: &str, update: &ProfileUpdate) -> Result<User> {
        self.respond(
            Method::PUT,
            &format!("api/update/{username}"),
            Some(serde_json::to_value(update)?),
        )
    }

    async fn upload_url(&self, username: &str) -> Result<UploadUrlResponse> {
        self.respond(Method::GET, &format!("api/upload-url/{username}"), None)
    }

    async fn image_urls(&self, username: &str) -> Result<ImageUrlsResponse> {
        self.respond(Method::GET, &format!("api/image-url/{username}"), None)
    }

    async fn upload_photo(&self, username: &str, path: &Path) -> Result<User> {
        self.respond(
            Method::POST,
            "api/upload",
            Some(json!({"username": username, "file": path.display().to_string()})),
        )
    }

    async fn delete_photo(&self, username: &str, s3_key: &str) -> Result<User> {
        self.respond(
            Method::DELETE,
            &format!("api/image/{username}/{s3_key}"),
            None,
        )
    }

    async fn like_image(&self, username: &str, image_id: &str) -> Result<LikeResponse> {
        self.respond(
            Method::POST,
            &format!("api/like/{username}/{image_id}"),
            None,
        )
    }

    async fn get_chats(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        let endpoint = format!("api/chats/{user_id}");
        self.record(Method::GET, &endpoint, None);
        if let Some(err) = self.take_error(&endpoint) {
            return Err(err);
        }
        // Mirror the real client's defensive shape handling.
        Ok(chats_from_value(self.response_for(&endpoint)?))
    }

    async fn create_chat(&self, user_id: &str, session_name: &str) -> Result<ChatSession> {
        self.respond(
            Method::POST,
            "api/createChat/",
            Some(json!({"userId": user_id, "sessionName": session_name})),
        )
    }

    async fn send_chat_message(
        &self,
        text: &str,
        user_id: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatReply> {
        let raw: ChatMessageResponse = self.respond(
            Method::POST,
            "chat",
            Some(json!({"message": text, "user_id": user_id, "thread_id": thread_id})),
        )?;
        Ok(raw.into_reply())
    }
}
