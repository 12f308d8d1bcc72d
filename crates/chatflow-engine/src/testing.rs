//! Recording fake of the messaging host for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EngineError, Result};
use crate::host::{MessageEvent, MessagingHost, Room, User};

/// A [`MessagingHost`] that records every outgoing call as a line of text.
#[derive(Default)]
pub struct RecordingHost {
    users: Vec<User>,
    rooms: Vec<Room>,
    app_user: Option<User>,
    fail_all_sends: bool,
    fail_text: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingHost {
    /// A host knowing a handful of users and rooms.
    pub fn with_directory() -> Self {
        Self {
            users: vec![
                User::new("U1", "john"),
                User::new("U2", "lead"),
                User::new("U3", "team-lead"),
                User::new("U4", "devops"),
                User::new("BOT", "chatflow"),
            ],
            rooms: vec![
                Room::new("R1", "support"),
                Room::new("R-general", "general"),
                Room::new("R-dev", "dev"),
            ],
            ..Self::default()
        }
    }

    /// Every send fails with a host error.
    pub fn failing_sends(mut self) -> Self {
        self.fail_all_sends = true;
        self
    }

    /// Sends whose text equals `text` fail with a host error.
    pub fn failing_text(mut self, text: &str) -> Self {
        self.fail_text = Some(text.to_string());
        self
    }

    pub fn with_app_user(mut self, user: User) -> Self {
        self.app_user = Some(user);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn send(&self, text: &str, line: String) -> Result<()> {
        if self.fail_all_sends || self.fail_text.as_deref() == Some(text) {
            return Err(EngineError::host("send rejected"));
        }
        self.record(line);
        Ok(())
    }

    fn record(&self, line: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line);
        }
    }
}

#[async_trait]
impl MessagingHost for RecordingHost {
    async fn send_message(&self, room: &Room, sender: &User, text: &str) -> Result<()> {
        self.send(text, format!("post #{} as {}: {text}", room.name, sender.handle))
    }

    async fn send_direct_message(&self, from: &User, to: &User, text: &str) -> Result<()> {
        self.send(text, format!("dm {}->{}: {text}", from.handle, to.handle))
    }

    async fn delete_or_notify(&self, message: &MessageEvent) -> Result<()> {
        self.record(format!("delete {}", message.id));
        Ok(())
    }

    async fn lookup_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.handle == handle).cloned())
    }

    async fn lookup_room_by_name(&self, name: &str) -> Result<Option<Room>> {
        Ok(self.rooms.iter().find(|r| r.name == name).cloned())
    }

    async fn lookup_room_by_id(&self, id: &str) -> Result<Option<Room>> {
        Ok(self.rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn app_user(&self) -> Result<Option<User>> {
        Ok(self.app_user.clone())
    }
}
