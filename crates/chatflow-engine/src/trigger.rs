//! Trigger matching — decide whether a rule's trigger fires for an event.
//!
//! Every populated condition must hold (AND semantics).  Within the `room`
//! and `user` conditions either the identifier or the name is enough.  A
//! trigger with no populated condition never matches.

use regex::RegexBuilder;
use tracing::{trace, warn};

use crate::error::{EngineError, Result};
use crate::host::MessageEvent;
use crate::rule::{Trigger, TriggerKind};

/// Upper bound on the compiled size of a user-supplied pattern.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Whether `trigger` fires for `event`.
///
/// Never fails: an invalid regex condition is logged and treated as a
/// failing condition.
pub fn matches(trigger: &Trigger, event: &MessageEvent) -> bool {
    match evaluate(trigger, event) {
        Ok(matched) => matched,
        Err(e) => {
            warn!(error = %e, room = %event.room.name, "trigger evaluation failed, treating as no match");
            false
        }
    }
}

/// Evaluate `trigger` against `event`, surfacing pattern compile errors.
pub fn evaluate(trigger: &Trigger, event: &MessageEvent) -> Result<bool> {
    if trigger.kind != TriggerKind::Message || trigger.is_empty() {
        return Ok(false);
    }

    if let Some(room) = condition(&trigger.room) {
        let room = strip_sigil(room, '#');
        if event.room.id != room && event.room.name != room {
            trace!(expected = room, "room condition failed");
            return Ok(false);
        }
    }

    if let Some(user) = condition(&trigger.user) {
        let user = strip_sigil(user, '@');
        if event.sender.id != user && event.sender.handle != user {
            trace!(expected = user, "user condition failed");
            return Ok(false);
        }
    }

    let text = event.text.to_lowercase();

    if let Some(needle) = condition(&trigger.contains)
        && !text.contains(&needle.to_lowercase())
    {
        return Ok(false);
    }

    if let Some(prefix) = condition(&trigger.starts_with)
        && !text.starts_with(&prefix.to_lowercase())
    {
        return Ok(false);
    }

    if let Some(pattern) = condition(&trigger.regex) {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| EngineError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        if !re.is_match(&event.text) {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Remove a single leading `sigil` (`#` for rooms, `@` for users).
pub fn strip_sigil(value: &str, sigil: char) -> &str {
    value.strip_prefix(sigil).unwrap_or(value)
}

fn condition(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
