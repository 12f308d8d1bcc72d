//! Technical rule syntax — build a trigger and actions from `key=value` tokens.
//!
//! ```text
//! @user #room contains=text startsWith=text regex=pattern action=dm:@user="message"
//! action=post:#room="message"
//! action=delete
//! ```

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::rule::{Action, Trigger};

const CONTAINS: &str = "contains=";
const STARTS_WITH: &str = "startsWith=";
const REGEX: &str = "regex=";
const ACTION: &str = "action=";

/// Build a message trigger and its action list from create-command tokens.
///
/// Later tokens of the same kind overwrite earlier ones; every `action=`
/// token appends an action.  Tokens that match no known form are ignored.
pub fn parse_create_args<S: AsRef<str>>(tokens: &[S]) -> Result<(Trigger, Vec<Action>)> {
    let mut trigger = Trigger::message();
    let mut actions = Vec::new();

    for token in tokens {
        let token = token.as_ref();
        if token.starts_with('@') {
            trigger.user = Some(token.to_string());
        } else if token.starts_with('#') {
            trigger.room = Some(token.to_string());
        } else if let Some(value) = token.strip_prefix(CONTAINS) {
            trigger.contains = Some(unquote(value).to_string());
        } else if let Some(value) = token.strip_prefix(STARTS_WITH) {
            trigger.starts_with = Some(unquote(value).to_string());
        } else if let Some(value) = token.strip_prefix(REGEX) {
            trigger.regex = Some(unquote(value).to_string());
        } else if let Some(spec) = token.strip_prefix(ACTION) {
            actions.push(parse_action_spec(spec)?);
        } else {
            debug!(token, "ignoring unrecognised token");
        }
    }

    Ok((trigger, actions))
}

/// Parse the value of an `action=` token, e.g. `dm:@bob="hi there"`.
///
/// The kind runs up to the first `:`, the target up to the next `=`, and
/// the text is everything after it with one pair of surrounding quotes
/// removed.  `delete` takes no target or text.
pub fn parse_action_spec(spec: &str) -> Result<Action> {
    let (kind, value) = match spec.split_once(':') {
        Some((kind, value)) => (kind, Some(value)),
        None => (spec, None),
    };

    let (target, text) = match value.and_then(|v| v.split_once('=')) {
        Some((target, text)) => (Some(target), Some(unquote(text))),
        None => (value.filter(|v| !v.is_empty()), None),
    };

    Action::from_kind(kind, target, text).map_err(|e| match e {
        EngineError::InvalidAction { reason, .. } => EngineError::InvalidAction {
            spec: spec.to_string(),
            reason,
        },
        other => other,
    })
}

/// Strip one pair of matching surrounding quotes.
fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2
            && let Some(inner) = text
                .strip_prefix(quote)
                .and_then(|t| t.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
