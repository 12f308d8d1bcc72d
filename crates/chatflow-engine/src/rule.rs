//! Rule model — the persisted shape of a chat automation.
//!
//! A [`Rule`] pairs one [`Trigger`] (the condition set evaluated against each
//! incoming message) with an ordered list of [`Action`]s executed when the
//! trigger matches.  The wire format uses the camelCase field names and the
//! `type` discriminators (`message`, `dm`, `post`, `delete`) that stored
//! records already carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// The kind of event a trigger listens for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// A message posted in a room.
    #[default]
    Message,
    /// A user being mentioned.  Authored from English commands but not
    /// evaluated by the dispatcher.
    Mention,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Mention => write!(f, "mention"),
        }
    }
}

/// The condition set that decides whether a rule fires for an event.
///
/// Every condition is optional.  A trigger with no condition set never
/// matches: an empty trigger is not a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(rename = "type", default)]
    pub kind: TriggerKind,
    /// Room id or name, optionally prefixed with `#`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// User id or handle, optionally prefixed with `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Case-insensitive substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    /// Case-insensitive prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    /// Case-insensitive regular expression, compiled at match time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl Trigger {
    /// An empty message trigger.
    pub fn message() -> Self {
        Self::default()
    }

    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn from_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn containing(mut self, text: impl Into<String>) -> Self {
        self.contains = Some(text.into());
        self
    }

    pub fn starting_with(mut self, text: impl Into<String>) -> Self {
        self.starts_with = Some(text.into());
        self
    }

    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    /// Number of populated conditions.  Empty strings count as absent.
    pub fn condition_count(&self) -> usize {
        [
            &self.room,
            &self.user,
            &self.contains,
            &self.starts_with,
            &self.regex,
        ]
        .iter()
        .filter(|c| c.as_deref().is_some_and(|v| !v.is_empty()))
        .count()
    }

    /// Whether no condition is populated.
    pub fn is_empty(&self) -> bool {
        self.condition_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Sentinel post target meaning "the room the trigger fired in".
pub const CHANNEL_TARGET: &str = "channel";

/// One effect a firing rule produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Send a direct message to a user (`target` is a handle, `@` optional).
    #[serde(rename = "dm")]
    DirectMessage { target: String, text: String },

    /// Post into a room.  `target` is `#name`, the [`CHANNEL_TARGET`]
    /// sentinel, or a room id.
    #[serde(rename = "post")]
    PostToRoom { target: String, text: String },

    /// Remove (or notify about) the message that fired the rule.
    #[serde(rename = "delete")]
    DeleteTriggeringMessage,
}

impl Action {
    /// Build an action from its kind name (`dm`, `post`, `delete`).
    ///
    /// Unknown kinds are rejected here rather than at execution time.
    pub fn from_kind(kind: &str, target: Option<&str>, text: Option<&str>) -> Result<Self> {
        let required = |field: Option<&str>, what: &str| -> Result<String> {
            match field {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(EngineError::InvalidAction {
                    spec: kind.to_string(),
                    reason: format!("missing {what}"),
                }),
            }
        };

        match kind.to_lowercase().as_str() {
            "dm" => Ok(Self::DirectMessage {
                target: required(target, "target")?,
                text: required(text, "text")?,
            }),
            "post" => Ok(Self::PostToRoom {
                target: required(target, "target")?,
                text: required(text, "text")?,
            }),
            "delete" => Ok(Self::DeleteTriggeringMessage),
            _ => Err(EngineError::UnknownActionKind {
                kind: kind.to_string(),
            }),
        }
    }

    /// The kind name used on the wire and in the technical syntax.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectMessage { .. } => "dm",
            Self::PostToRoom { .. } => "post",
            Self::DeleteTriggeringMessage => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectMessage { target, text } => write!(f, "dm {target} \"{text}\""),
            Self::PostToRoom { target, text } => write!(f, "post {target} \"{text}\""),
            Self::DeleteTriggeringMessage => write!(f, "delete triggering message"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

fn default_enabled() -> bool {
    true
}

/// A persisted trigger + actions automation record.
///
/// The dispatcher only ever reads rules; mutation happens through the
/// authoring operations (enable/disable, delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique identifier (UUID v7).  Never changes after creation.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Id of the user who authored the rule.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub trigger: Trigger,
    pub actions: Vec<Action>,
}

impl Rule {
    /// Create a new enabled rule with a fresh id.
    ///
    /// Fails with [`EngineError::EmptyActions`] when `actions` is empty.
    pub fn new(created_by: impl Into<String>, trigger: Trigger, actions: Vec<Action>) -> Result<Self> {
        let rule = Self {
            id: Uuid::now_v7().to_string(),
            name: None,
            created_by: created_by.into(),
            created_at: Utc::now(),
            enabled: true,
            trigger,
            actions,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Set the display name for this rule.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check the invariants a rule must satisfy to be stored.
    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(EngineError::EmptyActions);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
