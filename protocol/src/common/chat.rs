//! Chat session, message and product structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat session as returned by `GET /api/chats/{userId}`.
///
/// Each session carries its full message history; the client never fetches
/// messages separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(alias = "_id", alias = "thread_id")]
    pub id: String,
    #[serde(alias = "sessionName", default)]
    pub session_name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat turn.
///
/// Once appended to a session's sequence a message is never mutated in
/// place; the whole sequence is replaced when the session is refetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Product recommendations attached to an assistant turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<ProductList>,
    /// Merged preview image references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_images: Vec<String>,
    /// Marker for transient status events emitted while a reply is prepared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            products: None,
            merged_images: Vec::new(),
            progress: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            products: None,
            merged_images: Vec::new(),
            progress: None,
        }
    }
}

/// Which backend field a product list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSource {
    /// `ranked_products`, the current recommendation pipeline.
    Ranked,
    /// `styled_products`, the legacy styling pipeline.
    Styled,
}

/// Product recommendations, tagged with their origin.
///
/// The polymorphic `ranked_products` / `styled_products` response shape is
/// resolved into this single form at the API client boundary; `ranked` wins
/// when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductList {
    pub source: ProductSource,
    pub items: Vec<Product>,
}

/// A recommended product embedded in an assistant message.
///
/// This mirrors the backend catalog entry but is independent of it; the
/// client only renders and likes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "_id", alias = "image_id", default)]
    pub id: String,
    #[serde(alias = "name", default)]
    pub title: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    /// Merchant or pipeline label.
    #[serde(default)]
    pub source: Option<String>,
    /// Outbound link to the product page.
    #[serde(alias = "url", default)]
    pub link: Option<String>,
    /// Merged try-on preview image, when available.
    #[serde(default)]
    pub merged_image: Option<String>,
}
