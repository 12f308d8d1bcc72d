//! The `listen` loop: chat messages on stdin, one per line.
//!
//! ```text
//! #general @john hello everyone
//! #general @admin /workflow english "when @john says "hello" then send "Hi John!" to #general"
//! #general @admin approve
//! ```
//!
//! Ordinary messages are dispatched on their own tokio task, so a slow rule
//! never holds up the next line.  `/workflow` messages run inline, and an
//! English preview waits for the same user to answer `approve` or `cancel`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chatflow_engine::{MessageEvent, MessagingHost, ParsedStep, Room, User};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::App;

const COMMAND_PREFIX: &str = "/workflow";

/// One parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
pub struct IncomingLine<'a> {
    pub room: &'a str,
    pub user: &'a str,
    pub text: &'a str,
}

/// Parse `#room @user text`.  Returns `None` for anything else.
pub fn parse_line(line: &str) -> Option<IncomingLine<'_>> {
    let line = line.trim();
    let (room, rest) = line.split_once(char::is_whitespace)?;
    let (user, text) = rest.trim_start().split_once(char::is_whitespace)?;
    let text = text.trim();

    let room = room.strip_prefix('#').filter(|r| !r.is_empty())?;
    let user = user.strip_prefix('@').filter(|u| !u.is_empty())?;
    (!text.is_empty()).then_some(IncomingLine { room, user, text })
}

/// Read stdin until EOF, then wait for in-flight dispatch cycles.
pub async fn run(app: &App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = Session::default();

    info!("listening for messages on stdin");
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        session.handle_line(app, &line).await;
    }

    let messages = session.finish().await;
    info!(messages, "stdin closed, listener stopped");
    Ok(())
}

/// Per-listener state: previews awaiting an answer and running dispatches.
#[derive(Default)]
pub struct Session {
    pending: HashMap<String, Vec<ParsedStep>>,
    tasks: JoinSet<()>,
    next_id: u64,
}

impl Session {
    /// Handle one stdin line.  Failures are reported in the room and logged;
    /// they never end the session.
    pub async fn handle_line(&mut self, app: &App, line: &str) {
        let Some(incoming) = parse_line(line) else {
            if !line.trim().is_empty() {
                warn!(line = %line.trim(), "expected `#room @user message`");
            }
            return;
        };

        let sender = app.host.resolve_user(incoming.user);
        let room = app.host.resolve_room(incoming.room);

        if let Some(steps) = self.pending.remove(&sender.id) {
            match incoming.text.to_lowercase().as_str() {
                "approve" | "yes" => {
                    let reply = app.handler.approve(&sender, steps).await;
                    reply_or_report(app, &room, reply.map(|r| r.text)).await;
                    return;
                }
                "cancel" | "no" => {
                    reply_in(app, &room, &app.handler.cancel().text).await;
                    return;
                }
                _ => {
                    debug!(user = %sender.handle, "pending preview dropped");
                }
            }
        }

        if let Some(command) = incoming.text.strip_prefix(COMMAND_PREFIX) {
            match app.handler.execute_line(&sender, command).await {
                Ok(reply) => {
                    reply_in(app, &room, &reply.text).await;
                    if let Some(steps) = reply.preview {
                        reply_in(app, &room, "Reply `approve` to create or `cancel` to discard.")
                            .await;
                        self.pending.insert(sender.id.clone(), steps);
                    }
                }
                Err(e) => reply_or_report(app, &room, Err(e)).await,
            }
            return;
        }

        self.next_id += 1;
        let event = MessageEvent::new(format!("m{}", self.next_id), incoming.text, sender, room);
        let dispatcher = app.dispatcher.clone();
        self.tasks.spawn(async move {
            if let Err(e) = dispatcher.on_event(&event).await {
                error!(event_id = %event.id, error = %e, "dispatch cycle failed");
            }
        });
    }

    /// Wait for every spawned dispatch cycle.  Returns the number of
    /// messages dispatched.
    pub async fn finish(mut self) -> u64 {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "dispatch task panicked");
            }
        }
        self.next_id
    }
}

async fn reply_or_report(app: &App, room: &Room, outcome: chatflow_engine::Result<String>) {
    match outcome {
        Ok(text) => reply_in(app, room, &text).await,
        Err(e) => {
            error!(room = %room.name, error = %e, "workflow command failed");
            reply_in(app, room, &format!("Error: {e}")).await;
        }
    }
}

async fn reply_in(app: &App, room: &Room, text: &str) {
    let bot = match app.host.app_user().await {
        Ok(Some(user)) => user,
        Ok(None) => User::new("chatflow", "chatflow"),
        Err(e) => {
            warn!(error = %e, "could not resolve app user for reply");
            User::new("chatflow", "chatflow")
        }
    };
    if let Err(e) = app.host.send_message(room, &bot, text).await {
        error!(room = %room.name, error = %e, "failed to post reply");
    }
}
