//! Chat API DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::{ChatSession, Message, Product, ProductList, ProductSource, Role};

/// Create chat request for `POST /api/createChat/`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[validate(length(min = 1))]
    #[serde(rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1, max = 255))]
    #[serde(rename = "sessionName")]
    pub session_name: String,
}

/// Create chat response.
pub type CreateChatResponse = ChatSession;

/// Send-message request for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatMessageRequest {
    #[validate(length(min = 1))]
    pub message: String,
    #[validate(length(min = 1))]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Raw send-message response as the backend emits it.
///
/// `ranked_products` and `styled_products` are mutually preferred in that
/// order; the client resolves them into one tagged `ProductList` at its
/// boundary rather than re-checking the shape at every consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub ranked_products: Option<Vec<Product>>,
    #[serde(default)]
    pub styled_products: Option<Vec<Product>>,
    #[serde(default)]
    pub merged_images: Option<Vec<String>>,
}

impl ChatMessageResponse {
    /// Resolve the polymorphic product fields into one tagged list.
    pub fn into_reply(self) -> ChatReply {
        let products = match (self.ranked_products, self.styled_products) {
            (Some(items), _) => Some(ProductList {
                source: ProductSource::Ranked,
                items,
            }),
            (None, Some(items)) => Some(ProductList {
                source: ProductSource::Styled,
                items,
            }),
            (None, None) => None,
        };

        ChatReply {
            response: self.response,
            products,
            merged_images: self.merged_images.unwrap_or_default(),
        }
    }
}

/// Normalized assistant reply.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub products: Option<ProductList>,
    pub merged_images: Vec<String>,
}
