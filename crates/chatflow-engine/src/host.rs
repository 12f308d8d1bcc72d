//! Messaging host interface and the chat event types it exchanges.
//!
//! The engine never talks to a chat platform directly.  Everything it needs
//! (sending messages, opening direct conversations, directory lookups) goes
//! through the [`MessagingHost`] trait, which a platform integration
//! implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A chat user as known to the host's directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Opaque platform identifier.
    pub id: String,
    /// Handle without the leading `@`.
    pub handle: String,
}

impl User {
    pub fn new(id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
        }
    }
}

/// A chat room as known to the host's directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Room {
    /// Opaque platform identifier.
    pub id: String,
    /// Slug or display name without the leading `#`.
    pub name: String,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An incoming chat message, the input of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Platform identifier of the message.
    pub id: String,
    /// Message body.  Attachments without text arrive as an empty string.
    pub text: String,
    pub sender: User,
    pub room: Room,
}

impl MessageEvent {
    pub fn new(id: impl Into<String>, text: impl Into<String>, sender: User, room: Room) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender,
            room,
        }
    }
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// Everything the engine needs from the chat platform.
///
/// Implementations perform their own I/O retries if any; the engine never
/// retries a failed call.
#[async_trait]
pub trait MessagingHost: Send + Sync {
    /// Post `text` into `room` on behalf of `sender`.
    async fn send_message(&self, room: &Room, sender: &User, text: &str) -> Result<()>;

    /// Open (or reuse) a direct conversation between `from` and `to` and
    /// send `text` into it.
    async fn send_direct_message(&self, from: &User, to: &User, text: &str) -> Result<()>;

    /// Remove the given message, or notify its author about it where the
    /// platform does not allow removal.
    async fn delete_or_notify(&self, message: &MessageEvent) -> Result<()>;

    /// Look up a user by handle (without `@`).
    async fn lookup_user_by_handle(&self, handle: &str) -> Result<Option<User>>;

    /// Look up a room by name (without `#`).
    async fn lookup_room_by_name(&self, name: &str) -> Result<Option<Room>>;

    /// Look up a room by its platform identifier.
    async fn lookup_room_by_id(&self, id: &str) -> Result<Option<Room>>;

    /// The automation's own user, whose messages are never dispatched.
    async fn app_user(&self) -> Result<Option<User>> {
        Ok(None)
    }
}
