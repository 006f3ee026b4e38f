//! API DTOs module
//!
//! Request/response objects organized by domain:
//! - `auth`: login
//! - `chat`: chat sessions and the send-message endpoint
//! - `profile`: profile updates, photo management, likes

pub mod auth;
pub mod chat;
pub mod profile;

pub use auth::*;
pub use chat::*;
pub use profile::*;
