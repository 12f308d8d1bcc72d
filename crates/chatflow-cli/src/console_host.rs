//! A [`MessagingHost`] for the terminal.
//!
//! Users and rooms come from the `[directory]` section of the config.
//! Outgoing messages are written as lines to a sink (stdout by default)
//! instead of being delivered to a chat platform.

use std::sync::Arc;

use async_trait::async_trait;
use chatflow_engine::{MessageEvent, MessagingHost, Result, Room, User};

use crate::config::DirectoryConfig;

type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// Directory-backed host that prints what it would send.
pub struct ConsoleHost {
    users: Vec<User>,
    rooms: Vec<Room>,
    app_user: Option<User>,
    sink: Sink,
}

impl ConsoleHost {
    /// Host printing to stdout.
    pub fn new(directory: DirectoryConfig, app_user: Option<&str>) -> Self {
        Self::with_sink(directory, app_user, Arc::new(|line: &str| println!("{line}")))
    }

    pub fn with_sink(directory: DirectoryConfig, app_user: Option<&str>, sink: Sink) -> Self {
        let mut host = Self {
            users: directory.users,
            rooms: directory.rooms,
            app_user: None,
            sink,
        };
        host.app_user = app_user.map(|id| host.resolve_user(id));
        host
    }

    /// Look up a user by handle or id; unknown names become ad-hoc users.
    pub fn resolve_user(&self, key: &str) -> User {
        let key = key.trim_start_matches('@');
        self.users
            .iter()
            .find(|u| u.handle == key || u.id == key)
            .cloned()
            .unwrap_or_else(|| User::new(key, key))
    }

    /// Look up a room by name or id; unknown names become ad-hoc rooms.
    pub fn resolve_room(&self, key: &str) -> Room {
        let key = key.trim_start_matches('#');
        self.rooms
            .iter()
            .find(|r| r.name == key || r.id == key)
            .cloned()
            .unwrap_or_else(|| Room::new(key, key))
    }

    fn emit(&self, line: String) {
        (self.sink)(&line);
    }
}

#[async_trait]
impl MessagingHost for ConsoleHost {
    async fn send_message(&self, room: &Room, sender: &User, text: &str) -> Result<()> {
        self.emit(format!("[#{}] {}: {text}", room.name, sender.handle));
        Ok(())
    }

    async fn send_direct_message(&self, from: &User, to: &User, text: &str) -> Result<()> {
        self.emit(format!("[dm {} -> @{}] {text}", from.handle, to.handle));
        Ok(())
    }

    async fn delete_or_notify(&self, message: &MessageEvent) -> Result<()> {
        self.emit(format!(
            "[#{}] message {} from {} removed",
            message.room.name, message.id, message.sender.handle
        ));
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

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn directory() -> DirectoryConfig {
        DirectoryConfig {
            users: vec![User::new("U1", "john"), User::new("BOT", "chatflow")],
            rooms: vec![Room::new("R1", "general")],
        }
    }

    fn capturing(app_user: Option<&str>) -> (ConsoleHost, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let host = ConsoleHost::with_sink(
            directory(),
            app_user,
            Arc::new(move |line: &str| sink_lines.lock().unwrap().push(line.to_string())),
        );
        (host, lines)
    }

    #[test]
    fn resolves_known_and_ad_hoc_names() {
        let (host, _) = capturing(None);
        assert_eq!(host.resolve_user("@john"), User::new("U1", "john"));
        assert_eq!(host.resolve_user("U1"), User::new("U1", "john"));
        assert_eq!(host.resolve_user("@stranger"), User::new("stranger", "stranger"));
        assert_eq!(host.resolve_room("#general"), Room::new("R1", "general"));
        assert_eq!(host.resolve_room("random"), Room::new("random", "random"));
    }

    #[tokio::test]
    async fn app_user_is_resolved_from_directory() {
        let (host, _) = capturing(Some("BOT"));
        assert_eq!(host.app_user().await.unwrap(), Some(User::new("BOT", "chatflow")));
    }

    #[tokio::test]
    async fn sends_are_written_to_the_sink() {
        let (host, lines) = capturing(None);
        let john = host.resolve_user("john");
        let general = host.resolve_room("general");

        host.send_message(&general, &john, "hi").await.unwrap();
        host.send_direct_message(&john, &User::new("BOT", "chatflow"), "psst")
            .await
            .unwrap();
        host.delete_or_notify(&MessageEvent::new("m1", "spam", john, general))
            .await
            .unwrap();

        assert_eq!(
            lines.lock().unwrap().clone(),
            vec![
                "[#general] john: hi".to_string(),
                "[dm john -> @chatflow] psst".to_string(),
                "[#general] message m1 from john removed".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn lookups_only_see_the_directory() {
        let (host, _) = capturing(None);
        assert!(host.lookup_user_by_handle("stranger").await.unwrap().is_none());
        assert!(host.lookup_room_by_name("general").await.unwrap().is_some());
        assert!(host.lookup_room_by_id("R1").await.unwrap().is_some());
    }
}
