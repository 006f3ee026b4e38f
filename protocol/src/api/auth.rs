//! Authentication DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::User;

/// Login request for `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

/// Login response: the full user record, persisted client-side as the
/// session.
pub type LoginResponse = User;
