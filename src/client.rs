//! HTTP client for the StyleMuse backend
//!
//! One method per backend capability. Every method validates its required
//! string arguments before any network I/O, issues exactly one request, and
//! normalizes error bodies into a single human-readable message. There are
//! no retries and no request cancellation.

use reqwest::{multipart, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use stylemuse_protocol::api::{
    ChatMessageRequest, ChatMessageResponse, ChatReply, CreateChatRequest, ImageUrlsResponse,
    LikeResponse, LoginRequest, ProfileUpdate, UploadUrlResponse,
};
use stylemuse_protocol::common::{ChatSession, User};

use crate::config::ClientConfig;
use crate::error::{MuseError, Result};

/// Backend API surface.
///
/// Services and controllers are generic over this trait so tests can swap in
/// a request-recording mock.
pub trait ApiClient {
    fn config(&self) -> &ClientConfig;

    async fn login(&self, username: &str, password: &str) -> Result<User>;
    async fn update_profile(&self, username: &str, update: &ProfileUpdate) -> Result<User>;
    async fn upload_url(&self, username: &str) -> Result<UploadUrlResponse>;
    async fn image_urls(&self, username: &str) -> Result<ImageUrlsResponse>;
    async fn upload_photo(&self, username: &str, path: &Path) -> Result<User>;
    async fn delete_photo(&self, username: &str, s3_key: &str) -> Result<User>;
    async fn like_image(&self, username: &str, image_id: &str) -> Result<LikeResponse>;
    async fn get_chats(&self, user_id: &str) -> Result<Vec<ChatSession>>;
    async fn create_chat(&self, user_id: &str, session_name: &str) -> Result<ChatSession>;
    async fn send_chat_message(
        &self,
        text: &str,
        user_id: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatReply>;
}

/// Require a non-empty trimmed argument, failing before any network call.
fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MuseError::invalid_input(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Normalize a non-success response into an API error.
///
/// Prefers the JSON body's message field; falls back to the HTTP status
/// text.
fn error_from_response(status: StatusCode, body: &str) -> MuseError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown server error")
                .to_string()
        });

    if status == StatusCode::UNAUTHORIZED {
        return MuseError::authentication(message);
    }

    MuseError::api(status.as_u16(), message)
}

fn mime_for_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Reqwest-backed client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder().timeout(Duration::from_secs(config.timeout));

        if !config.use_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    /// Issue one request and return the parsed JSON body.
    ///
    /// An empty success body parses as `Value::Null` so acknowledgement-only
    /// endpoints do not fail on shape.
    async fn request_json(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<Value> {
        let url = self.config.endpoint_url(endpoint);

        let mut request_builder = self.client.request(method, &url);
        if let Some(body) = payload {
            request_builder = request_builder.json(&body);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(error_from_response(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|_| MuseError::invalid_response(format!("Invalid API response: {text}")))
    }

    async fn request_multipart(
        &self,
        method: Method,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<Value> {
        let url = self.config.endpoint_url(endpoint);

        let response = self
            .client
            .request(method, &url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(error_from_response(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|_| MuseError::invalid_response(format!("Invalid API response: {text}")))
    }

    fn parse<R: DeserializeOwned>(value: Value, what: &str) -> Result<R> {
        serde_json::from_value(value)
            .map_err(|e| MuseError::invalid_response(format!("Unexpected {what} shape: {e}")))
    }
}

impl ApiClient for HttpClient {
    fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn login(&self, username: &str, password: &str) -> Result<User> {
        let username = required(username, "username")?;
        let password = required(password, "password")?;

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let value = self
            .request_json(
                Method::POST,
                "api/login",
                Some(serde_json::to_value(&request)?),
            )
            .await?;
        Self::parse(value, "login response")
    }

    async fn update_profile(&self, username: &str, update: &ProfileUpdate) -> Result<User> {
        let username = required(username, "username")?;
        update.validate()?;

        let mut form = multipart::Form::new();
        for (name, value) in update.form_fields() {
            form = form.text(name, value);
        }

        let value = self
            .request_multipart(Method::PUT, &format!("api/update/{username}"), form)
            .await?;
        Self::parse(value, "profile update response")
    }

    async fn upload_url(&self, username: &str) -> Result<UploadUrlResponse> {
        let username = required(username, "username")?;

        let value = self
            .request_json(Method::GET, &format!("api/upload-url/{username}"), None)
            .await?;
        Self::parse(value, "upload-url response")
    }

    async fn image_urls(&self, username: &str) -> Result<ImageUrlsResponse> {
        let username = required(username, "username")?;

        let value = self
            .request_json(Method::GET, &format!("api/image-url/{username}"), None)
            .await?;

        // The endpoint has emitted both `{urls: [...]}` and a bare array.
        match value {
            Value::Array(items) => Ok(ImageUrlsResponse {
                urls: Self::parse(Value::Array(items), "image-url response")?,
            }),
            other => Self::parse(other, "image-url response"),
        }
    }

    async fn upload_photo(&self, username: &str, path: &Path) -> Result<User> {
        let username = required(username, "username")?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MuseError::io_from_error(format!("Read {}", path.display()), e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo.jpg")
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for_extension(path))
            .map_err(|e| MuseError::internal(format!("Invalid mime type: {e}")))?;
        let form = multipart::Form::new()
            .text("username", username.to_string())
            .part("image", part);

        let value = self
            .request_multipart(Method::POST, "api/upload", form)
            .await?;
        Self::parse(value, "photo upload response")
    }

    async fn delete_photo(&self, username: &str, s3_key: &str) -> Result<User> {
        let username = required(username, "username")?;
        let s3_key = required(s3_key, "s3_key")?;

        let value = self
            .request_json(
                Method::DELETE,
                &format!("api/image/{username}/{s3_key}"),
                None,
            )
            .await?;
        Self::parse(value, "photo delete response")
    }

    async fn like_image(&self, username: &str, image_id: &str) -> Result<LikeResponse> {
        let username = required(username, "username")?;
        let image_id = required(image_id, "imageId")?;

        let value = self
            .request_json(
                Method::POST,
                &format!("api/like/{username}/{image_id}"),
                None,
            )
            .await?;

        if value.is_null() {
            return Ok(LikeResponse::default());
        }
        Self::parse(value, "like response")
    }

    async fn get_chats(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        let user_id = required(user_id, "userId")?;

        let value = self
            .request_json(Method::GET, &format!("api/chats/{user_id}"), None)
            .await?;

        Ok(chats_from_value(value))
    }

    async fn create_chat(&self, user_id: &str, session_name: &str) -> Result<ChatSession> {
        let user_id = required(user_id, "userId")?;
        let session_name = required(session_name, "sessionName")?;

        let request = CreateChatRequest {
            user_id: user_id.to_string(),
            session_name: session_name.to_string(),
        };
        request.validate()?;

        let value = self
            .request_json(
                Method::POST,
                "api/createChat/",
                Some(serde_json::to_value(&request)?),
            )
            .await?;
        Self::parse(value, "create chat response")
    }

    async fn send_chat_message(
        &self,
        text: &str,
        user_id: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatReply> {
        let text = required(text, "message")?;
        let user_id = required(user_id, "user_id")?;

        let request = ChatMessageRequest {
            message: text.to_string(),
            user_id: user_id.to_string(),
            thread_id: thread_id.map(str::to_string),
        };
        request.validate()?;

        let value = self
            .request_json(Method::POST, "chat", Some(serde_json::to_value(&request)?))
            .await?;

        let raw: ChatMessageResponse = Self::parse(value, "chat response")?;
        Ok(raw.into_reply())
    }
}

/// Interpret a chat-list body defensively.
///
/// A non-list body is a protocol violation; substitute an empty list rather
/// than propagate a wrong-shaped value.
pub(crate) fn chats_from_value(value: Value) -> Vec<ChatSession> {
    match value {
        Value::Array(_) => match serde_json::from_value(value) {
            Ok(chats) => chats,
            Err(e) => {
                tracing::warn!("malformed chat list from server, treating as empty: {e}");
                Vec::new()
            }
        },
        other => {
            tracing::warn!(
                "expected a chat list, got {}; treating as empty",
                json_type_name(&other)
            );
            Vec::new()
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn required_trims_and_rejects_empty() {
        assert_eq!(required("  alice  ", "username").unwrap(), "alice");
        let err = required("   ", "username").unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("username is required"));
    }

    #[test]
    fn error_body_message_field_wins() {
        let err = error_from_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Please upload at least one photo first"}"#,
        );
        assert!(err.to_string().contains("upload at least one photo"));

        let err = error_from_response(StatusCode::FORBIDDEN, r#"{"message":"nope"}"#);
        assert!(err.to_string().contains("nope"));

        let err = error_from_response(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"bad field"}"#);
        assert!(err.to_string().contains("bad field"));
    }

    #[test]
    fn error_body_fallback_is_status_text() {
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_extension(&PathBuf::from("a.PNG")), "image/png");
        assert_eq!(mime_for_extension(&PathBuf::from("a.webp")), "image/webp");
        assert_eq!(mime_for_extension(&PathBuf::from("a")), "image/jpeg");
    }

    #[test]
    fn non_array_chat_list_becomes_empty() {
        assert!(chats_from_value(serde_json::json!({"error": "boom"})).is_empty());
        assert!(chats_from_value(Value::Null).is_empty());
        assert!(chats_from_value(serde_json::json!("nope")).is_empty());
    }

    #[test]
    fn chat_list_parses_sessions() {
        let chats = chats_from_value(serde_json::json!([
            {"id": "c1", "sessionName": "First", "messages": []}
        ]));
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "c1");
        assert_eq!(chats[0].session_name, "First");
    }

    #[tokio::test]
    async fn login_validates_before_network() {
        // Unroutable base URL: a network attempt would fail differently.
        let client = HttpClient::new(ClientConfig {
            base_url: "https://stylemuse.invalid".to_string(),
            ..Default::default()
        })
        .unwrap();

        let err = client.login("", "secret").await.unwrap_err();
        assert!(err.is_validation_error());

        let err = client.send_chat_message("   ", "u1", None).await.unwrap_err();
        assert!(err.is_validation_error());
    }
}
