//! English command parser — turns a sentence into trigger/action steps.
//!
//! The parser recognises a small fixed grammar, not arbitrary English:
//!
//! 1. **Normalize**: smart quotes become ASCII quotes and escaped quotes are
//!    unescaped, once, before anything else looks at the text.
//! 2. **Segment**: the sentence is split on the connectives `then` / `and`,
//!    even mid-clause.
//! 3. **Walk**: a fragment that matches a trigger pattern opens a new step;
//!    its action comes from the rest of the same fragment or, failing that,
//!    from the next fragment.  Any later fragment that parses as an action
//!    *replaces* the action of the most recent step ("last action wins").
//!    Fragments that match nothing are dropped.
//!
//! Trigger and action patterns live in ordered tables.  The first pattern
//! whose regex matches decides the result; later patterns are not tried.
//! Room-qualified patterns come first so that a room or user qualifier is
//! never swallowed by a shorter, more general pattern.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::rule::{Action, CHANNEL_TARGET, Rule, Trigger, TriggerKind};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What a parsed step listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTriggerKind {
    Message,
    Mention,
}

/// The trigger half of a parsed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTrigger {
    #[serde(rename = "type")]
    pub kind: StepTriggerKind,
    /// Quoted text to look for.  Empty for mention triggers.
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// What a parsed step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepActionKind {
    /// Post into a room.
    Message,
    /// Direct message a user.
    Dm,
}

/// The action half of a parsed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAction {
    #[serde(rename = "type")]
    pub kind: StepActionKind,
    pub content: String,
    /// Room name (message) or user handle (dm), without sigils.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A transient (trigger, action) pair produced by parsing.
///
/// Never persisted as-is: each step becomes exactly one [`Rule`] with one
/// action via [`ParsedStep::into_rule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStep {
    pub trigger: StepTrigger,
    pub action: StepAction,
}

/// Content used by `notify @user`, which carries no text of its own.
pub const NOTIFY_FALLBACK_CONTENT: &str = "You have been notified";

/// Subjects that mean "any user" rather than naming one.
const ANY_USER_WORDS: &[&str] = &["someone", "somebody", "anybody", "anyone", "everyone"];

const EXAMPLE_COMMANDS: &[&str] = &[
    r#"when @john says "hello" then send message "Hi John!" to #general"#,
    r#"when someone in #support says "help" then send dm "New support request" to @support-lead"#,
    r#"when @alice is mentioned then send message "Alice will get back to you soon""#,
    r#"when someone says "urgent" in #support notify @team-lead"#,
    r#"when someone says "deploy" in #dev then send message "Starting deployment..." and then send dm "New deployment requested" to @devops"#,
];

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// A room or user name: word characters and dashes, dots only between them.
const NAME: &str = r"[\w-]+(?:\.[\w-]+)*";

/// Double- or single-quoted non-empty text.
const QUOTED: &str = r#"(?:"(?P<dq>[^"]+)"|'(?P<sq>[^']+)')"#;

/// One entry of a priority-ordered pattern table.
struct Pattern<T> {
    name: &'static str,
    regex: Regex,
    build: fn(&Captures<'_>) -> T,
}

impl<T> Pattern<T> {
    fn new(name: &'static str, source: &str, build: fn(&Captures<'_>) -> T) -> Self {
        let source = source.replace("{NAME}", NAME).replace("{QUOTED}", QUOTED);
        Self {
            name,
            regex: Regex::new(&format!("(?i){source}")).expect("static parser pattern is valid"),
            build,
        }
    }
}

static TRIGGER_PATTERNS: LazyLock<Vec<Pattern<StepTrigger>>> = LazyLock::new(|| {
    vec![
        Pattern::new(
            "anyone_says_in_room",
            r"\bwhen\s+(?:someone|somebody|anybody|anyone|everyone)\s+(?:says?|posts?)\s+{QUOTED}\s+in\s+#?(?P<room>{NAME})",
            |caps| StepTrigger {
                kind: StepTriggerKind::Message,
                pattern: quoted(caps),
                user: None,
                room: capture(caps, "room"),
            },
        ),
        Pattern::new(
            "user_says",
            r"\bwhen\s+(?:@?(?P<user>{NAME})\s+)?(?:in\s+#?(?P<room>{NAME})\s+)?(?:says?|posts?)\s+{QUOTED}(?:\s+in\s+#?(?P<room_after>{NAME}))?",
            |caps| StepTrigger {
                kind: StepTriggerKind::Message,
                pattern: quoted(caps),
                user: named_user(caps),
                room: capture(caps, "room").or_else(|| capture(caps, "room_after")),
            },
        ),
        Pattern::new(
            "mentioned",
            r"\bwhen\s+(?:@?(?P<user>{NAME})\s+)?(?:in\s+#?(?P<room>{NAME})\s+)?(?:is\s+)?mentioned\b",
            |caps| StepTrigger {
                kind: StepTriggerKind::Mention,
                pattern: String::new(),
                user: named_user(caps),
                room: capture(caps, "room"),
            },
        ),
    ]
});

static ACTION_PATTERNS: LazyLock<Vec<Pattern<StepAction>>> = LazyLock::new(|| {
    vec![
        Pattern::new(
            "send_message",
            r"\b(?:send|reply\s+with)\s+(?:(?:a\s+)?message\s+)?{QUOTED}(?:\s+(?:to|in)\s+(?:(?:(?:the|this)\s+)?(?P<channel>channel)\b|#(?P<room>{NAME})))?",
            |caps| StepAction {
                kind: StepActionKind::Message,
                content: quoted(caps),
                target: Some(capture(caps, "room").unwrap_or_else(|| CHANNEL_TARGET.to_string())),
            },
        ),
        Pattern::new(
            "send_dm",
            r"\b(?:send|reply\s+with)\s+(?:a\s+)?(?:direct\s+message|dm)\s+{QUOTED}\s+to\s+@?(?P<user>{NAME})",
            |caps| StepAction {
                kind: StepActionKind::Dm,
                content: quoted(caps),
                target: capture(caps, "user"),
            },
        ),
        Pattern::new("notify", r"\bnotify\s+@?(?P<user>{NAME})", |caps| StepAction {
            kind: StepActionKind::Dm,
            content: NOTIFY_FALLBACK_CONTENT.to_string(),
            target: capture(caps, "user"),
        }),
    ]
});

/// `then` / `and` as a standalone word; runs like "and then" split once.
/// Dashes do not delimit, so names like `#sales-and-marketing` stay whole.
static CONNECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s+)(?:then|and)(?:\s+(?:then|and))*(?:\s+|$)")
        .expect("static connective pattern is valid")
});

static ESCAPED_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\+(["'])"#).expect("static escape pattern is valid"));

fn capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

fn quoted(caps: &Captures<'_>) -> String {
    capture(caps, "dq")
        .or_else(|| capture(caps, "sq"))
        .unwrap_or_default()
}

/// The `user` capture, unless it is a generic subject like "someone".
fn named_user(caps: &Captures<'_>) -> Option<String> {
    capture(caps, "user").filter(|u| !ANY_USER_WORDS.contains(&u.to_lowercase().as_str()))
}

/// Run a pattern table against `text`.  Returns the winning pattern's name,
/// its built value and the text after the match.
fn first_match<'t, T>(table: &[Pattern<T>], text: &'t str) -> Option<(&'static str, T, &'t str)> {
    table.iter().find_map(|pattern| {
        pattern.regex.captures(text).map(|caps| {
            let end = caps.get(0).map_or(text.len(), |m| m.end());
            (pattern.name, (pattern.build)(&caps), &text[end..])
        })
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Replace smart quotes with ASCII ones and unescape escaped quotes.
///
/// Applying it twice yields the same string as applying it once.
pub fn normalize(command: &str) -> String {
    let ascii: String = command
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect();
    ESCAPED_QUOTE.replace_all(&ascii, "$1").into_owned()
}

/// Split a normalized sentence on `then` / `and` into non-empty fragments.
pub fn segment(command: &str) -> Vec<&str> {
    CONNECTIVE
        .split(command)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

/// Match `fragment` against the trigger table.
///
/// Returns the trigger and the unconsumed remainder of the fragment.
pub fn parse_trigger(fragment: &str) -> Option<(StepTrigger, &str)> {
    first_match(&TRIGGER_PATTERNS, fragment).map(|(name, trigger, rest)| {
        debug!(pattern = name, "trigger pattern matched");
        (trigger, rest)
    })
}

/// Match `fragment` against the action table.
pub fn parse_action(fragment: &str) -> Option<StepAction> {
    first_match(&ACTION_PATTERNS, fragment).map(|(name, action, _)| {
        debug!(pattern = name, "action pattern matched");
        action
    })
}

/// Canonical phrasings for help text and parse-failure replies.
pub fn example_commands() -> &'static [&'static str] {
    EXAMPLE_COMMANDS
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// The English command parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalLanguageParser;

impl NaturalLanguageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a sentence into steps.
    ///
    /// An empty result means nothing was understood; callers surface that
    /// to the user as a parse failure.  Partial understanding yields fewer
    /// steps rather than an error.
    pub fn parse(&self, command: &str) -> Vec<ParsedStep> {
        let normalized = normalize(command);
        let fragments = segment(&normalized);
        let mut steps: Vec<ParsedStep> = Vec::new();

        let mut i = 0;
        while i < fragments.len() {
            let fragment = fragments[i];

            if let Some((trigger, rest)) = parse_trigger(fragment) {
                if let Some(action) = parse_action(rest) {
                    steps.push(ParsedStep { trigger, action });
                    i += 1;
                    continue;
                }
                if let Some(action) = fragments.get(i + 1).and_then(|next| parse_action(next)) {
                    steps.push(ParsedStep { trigger, action });
                    i += 2;
                    continue;
                }
                debug!(fragment, "trigger without action dropped");
                i += 1;
                continue;
            }

            match (parse_action(fragment), steps.last_mut()) {
                // Last action wins: a trailing action replaces, it does not append.
                (Some(action), Some(last)) => {
                    debug!(fragment, "action replaces previous step action");
                    last.action = action;
                }
                _ => debug!(fragment, "fragment not understood, dropped"),
            }
            i += 1;
        }

        info!(steps = steps.len(), fragments = fragments.len(), "command parsed");
        steps
    }

    /// Like [`parse`](Self::parse) but turns "nothing understood" into
    /// [`EngineError::ParseFailed`].
    pub fn parse_or_fail(&self, command: &str) -> Result<Vec<ParsedStep>> {
        let command = command.trim();
        if command.is_empty() {
            return Err(EngineError::ParseFailed {
                reason: "empty command".into(),
            });
        }
        let steps = self.parse(command);
        if steps.is_empty() {
            return Err(EngineError::ParseFailed {
                reason: "no trigger/action pair recognised".into(),
            });
        }
        Ok(steps)
    }
}

// ---------------------------------------------------------------------------
// Step conversion
// ---------------------------------------------------------------------------

impl ParsedStep {
    /// Convert this step into a single-action [`Rule`] authored by
    /// `created_by`.
    pub fn into_rule(self, created_by: impl Into<String>) -> Result<Rule> {
        let trigger = Trigger {
            kind: match self.trigger.kind {
                StepTriggerKind::Message => TriggerKind::Message,
                StepTriggerKind::Mention => TriggerKind::Mention,
            },
            room: self.trigger.room,
            user: self.trigger.user,
            contains: Some(self.trigger.pattern).filter(|p| !p.is_empty()),
            starts_with: None,
            regex: None,
        };

        let action = match self.action.kind {
            StepActionKind::Message => {
                let target = match self.action.target.as_deref() {
                    None | Some(CHANNEL_TARGET) => CHANNEL_TARGET.to_string(),
                    Some(room) if room.starts_with('#') => room.to_string(),
                    Some(room) => format!("#{room}"),
                };
                Action::PostToRoom {
                    target,
                    text: self.action.content,
                }
            }
            StepActionKind::Dm => {
                Action::from_kind(
                    "dm",
                    self.action.target.as_deref(),
                    Some(self.action.content.as_str()),
                )?
            }
        };

        Rule::new(created_by, trigger, vec![action])
    }

    /// Human-readable rendering used in the creation preview.
    pub fn describe(&self) -> String {
        let who = self
            .trigger
            .user
            .as_deref()
            .map_or_else(|| "someone".to_string(), |u| format!("@{u}"));
        let where_ = self
            .trigger
            .room
            .as_deref()
            .map(|r| format!(" in #{r}"))
            .unwrap_or_default();

        let trigger = match self.trigger.kind {
            StepTriggerKind::Message => {
                format!("When {who} says \"{}\"{where_}", self.trigger.pattern)
            }
            StepTriggerKind::Mention => format!("When {who} is mentioned{where_}"),
        };

        let action = match self.action.kind {
            StepActionKind::Message => match self.action.target.as_deref() {
                None | Some(CHANNEL_TARGET) => {
                    format!("send message \"{}\" in this channel", self.action.content)
                }
                Some(room) => format!("send message \"{}\" to #{room}", self.action.content),
            },
            StepActionKind::Dm => format!(
                "send DM \"{}\" to @{}",
                self.action.content,
                self.action.target.as_deref().unwrap_or("?")
            ),
        };

        format!("{trigger}\n  -> {action}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(command: &str) -> Vec<ParsedStep> {
        NaturalLanguageParser::new().parse(command)
    }

    #[test]
    fn user_says_then_send_to_room() {
        let steps = parse(r#"when @john says "hello" then send "Hi John!" to #general"#);
        assert_eq!(steps.len(), 1);
        let step = &steps[0];
        assert_eq!(step.trigger.kind, StepTriggerKind::Message);
        assert_eq!(step.trigger.user.as_deref(), Some("john"));
        assert_eq!(step.trigger.pattern, "hello");
        assert!(step.trigger.room.is_none());
        assert_eq!(step.action.kind, StepActionKind::Message);
        assert_eq!(step.action.content, "Hi John!");
        assert_eq!(step.action.target.as_deref(), Some("general"));
    }

    #[test]
    fn someone_says_in_room_notify_without_connective() {
        let steps = parse(r#"when someone says "urgent" in #support notify @team-lead"#);
        assert_eq!(steps.len(), 1);
        let step = &steps[0];
        assert_eq!(step.trigger.kind, StepTriggerKind::Message);
        assert_eq!(step.trigger.room.as_deref(), Some("support"));
        assert_eq!(step.trigger.pattern, "urgent");
        assert!(step.trigger.user.is_none());
        assert_eq!(step.action.kind, StepActionKind::Dm);
        assert_eq!(step.action.content, NOTIFY_FALLBACK_CONTENT);
        assert_eq!(step.action.target.as_deref(), Some("team-lead"));
    }

    #[test]
    fn room_before_says_is_captured() {
        let steps = parse(
            r#"when someone in #support says "help" then send dm "New support request" to @support-lead"#,
        );
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].trigger.room.as_deref(), Some("support"));
        assert!(steps[0].trigger.user.is_none());
        assert_eq!(steps[0].action.kind, StepActionKind::Dm);
        assert_eq!(steps[0].action.target.as_deref(), Some("support-lead"));
    }

    #[test]
    fn mention_trigger_with_default_channel_target() {
        let steps = parse(r#"when @alice is mentioned then send message "Alice will get back to you soon""#);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].trigger.kind, StepTriggerKind::Mention);
        assert_eq!(steps[0].trigger.user.as_deref(), Some("alice"));
        assert!(steps[0].trigger.pattern.is_empty());
        assert_eq!(steps[0].action.target.as_deref(), Some(CHANNEL_TARGET));
    }

    #[test]
    fn last_action_wins() {
        let steps = parse(
            r#"when someone says "deploy" in #dev then send message "Starting deployment..." and then send dm "New deployment requested" to @devops"#,
        );
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].trigger.room.as_deref(), Some("dev"));
        assert_eq!(steps[0].action.kind, StepActionKind::Dm);
        assert_eq!(steps[0].action.content, "New deployment requested");
        assert_eq!(steps[0].action.target.as_deref(), Some("devops"));
    }

    #[test]
    fn two_triggers_make_two_steps() {
        let steps = parse(
            r#"when @ann says "hi" then send "hello Ann" and when @bob says "hi" then notify @ann"#,
        );
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].trigger.user.as_deref(), Some("ann"));
        assert_eq!(steps[1].trigger.user.as_deref(), Some("bob"));
        assert_eq!(steps[1].action.kind, StepActionKind::Dm);
    }

    #[test]
    fn smart_quotes_are_understood() {
        let steps = parse("when @john says \u{201C}hello\u{201D} then send \u{201C}Hi!\u{201D} to #general");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].trigger.pattern, "hello");
        assert_eq!(steps[0].action.content, "Hi!");
    }

    #[test]
    fn escaped_quotes_are_understood() {
        let steps = parse(r#"when @john says \"hello\" then send \"Hi!\" to the channel"#);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action.target.as_deref(), Some(CHANNEL_TARGET));
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "when \u{201C}x\u{201D} \\\\\"y\\\" \u{2018}z\u{2019}",
            r#"plain "ascii" text"#,
            r"trailing \\",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn segment_splits_on_whole_words_only() {
        let fragments = segment(r#"when @brandon says "x" then send "y" AND notify @sandy"#);
        assert_eq!(
            fragments,
            vec![r#"when @brandon says "x""#, r#"send "y""#, "notify @sandy"]
        );
    }

    #[test]
    fn segment_keeps_hyphenated_names_whole() {
        assert_eq!(
            segment(r#"when someone says "x" in #sales-and-marketing then notify @bob"#),
            vec![r#"when someone says "x" in #sales-and-marketing"#, "notify @bob"]
        );
        assert_eq!(
            segment(r#"when @ops-then-dev says "x" and then notify @bob"#),
            vec![r#"when @ops-then-dev says "x""#, "notify @bob"]
        );
    }

    #[test]
    fn hyphenated_room_and_user_parse_into_one_step() {
        let steps = parse(r#"when someone says "x" in #sales-and-marketing then notify @bob"#);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].trigger.room.as_deref(), Some("sales-and-marketing"));
        assert_eq!(steps[0].action.kind, StepActionKind::Dm);
        assert_eq!(steps[0].action.target.as_deref(), Some("bob"));

        let steps = parse(r#"when @ops-then-dev says "x" then notify @bob"#);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].trigger.user.as_deref(), Some("ops-then-dev"));
        assert_eq!(steps[0].action.target.as_deref(), Some("bob"));
    }

    #[test]
    fn unbalanced_quotes_fail_quietly() {
        assert!(parse(r#"when @john says "hello then send "hi"#).is_empty());
    }

    #[test]
    fn gibberish_yields_no_steps() {
        assert!(parse("please make coffee").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn trigger_without_action_is_dropped() {
        assert!(parse(r#"when @john says "hello""#).is_empty());
    }

    #[test]
    fn leading_action_without_step_is_dropped() {
        let steps = parse(r#"notify @bob and when @john says "x" then send "y""#);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action.kind, StepActionKind::Message);
    }

    #[test]
    fn room_qualified_trigger_has_priority() {
        let (name, trigger, _) =
            first_match(&TRIGGER_PATTERNS, r#"when anyone posts "x" in #ops"#).unwrap();
        assert_eq!(name, "anyone_says_in_room");
        assert_eq!(trigger.room.as_deref(), Some("ops"));

        let (name, trigger, _) = first_match(&TRIGGER_PATTERNS, r#"when anyone posts "x""#).unwrap();
        assert_eq!(name, "user_says");
        assert!(trigger.user.is_none());
    }

    #[test]
    fn dm_is_not_swallowed_by_send_message() {
        let (name, action, _) =
            first_match(&ACTION_PATTERNS, r#"reply with dm "on it" to @ops.lead"#).unwrap();
        assert_eq!(name, "send_dm");
        assert_eq!(action.target.as_deref(), Some("ops.lead"));
    }

    #[test]
    fn room_name_does_not_keep_trailing_period() {
        let action = parse_action(r#"send "done" to #release."#).unwrap();
        assert_eq!(action.target.as_deref(), Some("release"));
    }

    #[test]
    fn example_commands_all_parse() {
        let parser = NaturalLanguageParser::new();
        for example in example_commands() {
            assert!(!parser.parse(example).is_empty(), "example did not parse: {example}");
        }
    }

    #[test]
    fn parse_or_fail_reports_empty_result() {
        let parser = NaturalLanguageParser::new();
        assert!(matches!(
            parser.parse_or_fail("hello there"),
            Err(EngineError::ParseFailed { .. })
        ));
        assert!(matches!(parser.parse_or_fail("   "), Err(EngineError::ParseFailed { .. })));
    }

    #[test]
    fn message_step_into_rule() {
        let step = parse(r#"when @john says "hello" then send "Hi John!" to #general"#).remove(0);
        let rule = step.into_rule("U1").unwrap();
        assert_eq!(rule.created_by, "U1");
        assert_eq!(rule.trigger.kind, TriggerKind::Message);
        assert_eq!(rule.trigger.user.as_deref(), Some("john"));
        assert_eq!(rule.trigger.contains.as_deref(), Some("hello"));
        assert_eq!(
            rule.actions,
            vec![Action::PostToRoom {
                target: "#general".into(),
                text: "Hi John!".into()
            }]
        );
    }

    #[test]
    fn mention_step_into_rule_keeps_kind() {
        let step = parse(r#"when @alice is mentioned then notify @bob"#).remove(0);
        let rule = step.into_rule("U1").unwrap();
        assert_eq!(rule.trigger.kind, TriggerKind::Mention);
        assert!(rule.trigger.contains.is_none());
        assert_eq!(
            rule.actions,
            vec![Action::DirectMessage {
                target: "bob".into(),
                text: NOTIFY_FALLBACK_CONTENT.into()
            }]
        );
    }

    #[test]
    fn describe_renders_preview_lines() {
        let step = parse(r#"when someone says "urgent" in #support notify @team-lead"#).remove(0);
        assert_eq!(
            step.describe(),
            "When someone says \"urgent\" in #support\n  -> send DM \"You have been notified\" to @team-lead"
        );
    }

    #[test]
    fn step_serializes_with_type_fields() {
        let step = parse(r#"when @john says "hello" then send "Hi John!" to #general"#).remove(0);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["trigger"]["type"], "message");
        assert_eq!(json["trigger"]["user"], "john");
        assert_eq!(json["action"]["type"], "message");
        assert_eq!(json["action"]["target"], "general");
    }
}
