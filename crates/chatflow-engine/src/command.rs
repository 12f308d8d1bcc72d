//! Authoring commands — the `/workflow` subcommands, answered with reply text.
//!
//! The handler sits on top of [`RuleStorage`] and the two authoring front
//! ends: the technical syntax in [`crate::syntax`] and the English parser.
//! English commands are two-phase: [`CommandHandler::execute`] returns a
//! preview of the parsed steps, and only [`CommandHandler::approve`]
//! persists them.
//!
//! Mistakes in what the user typed come back as reply text.  Storage and
//! serialization failures are returned as errors for the caller to surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::host::User;
use crate::parser::{NaturalLanguageParser, ParsedStep, example_commands};
use crate::rule::Rule;
use crate::storage::RuleStorage;
use crate::syntax;

/// The reply to one authoring command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub text: String,
    /// Steps awaiting approval, set only by a successful `english` command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<ParsedStep>>,
}

impl CommandReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            preview: None,
        }
    }
}

/// Runs authoring commands against a rule store.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<dyn RuleStorage>,
    parser: NaturalLanguageParser,
}

impl CommandHandler {
    pub fn new(storage: Arc<dyn RuleStorage>) -> Self {
        Self {
            storage,
            parser: NaturalLanguageParser::new(),
        }
    }

    /// Run a command typed into chat, e.g. `english "when ..."` or
    /// `create contains=hi action=delete`.
    ///
    /// The English sentence is handed to the parser untokenized so that its
    /// own quotes survive.
    pub async fn execute_line(&self, sender: &User, line: &str) -> Result<CommandReply> {
        let line = line.trim();
        let (sub, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(sub, rest)| (sub, rest.trim()));

        if sub.eq_ignore_ascii_case("english") {
            return self.english(strip_outer_quotes(rest)).await;
        }

        let mut args = vec![sub.to_string()];
        args.extend(split_command_line(rest));
        self.execute(sender, &args).await
    }

    /// Run a command from already-split arguments; the first is the
    /// subcommand.
    pub async fn execute<S: AsRef<str>>(&self, sender: &User, args: &[S]) -> Result<CommandReply> {
        let Some((sub, rest)) = args.split_first() else {
            return Ok(CommandReply::text(help_text()));
        };
        let first_arg = rest.first().map(|a| a.as_ref());

        debug!(subcommand = sub.as_ref(), sender = %sender.handle, "authoring command");
        match sub.as_ref().to_lowercase().as_str() {
            "create" => self.create(sender, rest).await,
            "list" => self.list().await,
            "delete" => match first_arg {
                Some(id) => self.delete(id).await,
                None => Ok(CommandReply::text(usage_text())),
            },
            "enable" | "disable" => match first_arg {
                Some(id) => self.set_enabled(id, sub.as_ref().eq_ignore_ascii_case("enable")).await,
                None => Ok(CommandReply::text(usage_text())),
            },
            "english" => {
                let sentence: Vec<&str> = rest.iter().map(|a| a.as_ref()).collect();
                self.english(&sentence.join(" ")).await
            }
            _ => Ok(CommandReply::text(help_text())),
        }
    }

    /// Persist one rule per previewed step, each authored by `sender`.
    pub async fn approve(&self, sender: &User, steps: Vec<ParsedStep>) -> Result<CommandReply> {
        let mut ids = Vec::with_capacity(steps.len());
        for step in steps {
            let rule = step.into_rule(&sender.id)?;
            self.storage.create_rule(&rule).await?;
            info!(rule_id = %rule.id, created_by = %sender.id, "rule created from english command");
            ids.push(rule.id);
        }

        let mut text = format!("Created {} workflow(s) successfully!", ids.len());
        for id in &ids {
            text.push_str(&format!("\n  {id}"));
        }
        Ok(CommandReply::text(text))
    }

    /// Discard a pending preview.
    pub fn cancel(&self) -> CommandReply {
        CommandReply::text("Workflow creation cancelled.")
    }

    // -- Subcommands --------------------------------------------------------

    async fn create<S: AsRef<str>>(&self, sender: &User, args: &[S]) -> Result<CommandReply> {
        if args.is_empty() {
            return Ok(CommandReply::text(usage_text()));
        }

        let (trigger, actions) = match syntax::parse_create_args(args) {
            Ok(parsed) => parsed,
            Err(e) if is_input_error(&e) => return Ok(CommandReply::text(format!("Error: {e}"))),
            Err(e) => return Err(e),
        };
        if actions.is_empty() {
            return Ok(CommandReply::text("Error: At least one action must be specified"));
        }

        let rule = Rule::new(&sender.id, trigger, actions)?;
        self.storage.create_rule(&rule).await?;
        info!(rule_id = %rule.id, created_by = %sender.id, "rule created");

        Ok(CommandReply::text(format!(
            "Workflow created with ID: {}\nTrigger: {}\nActions: {}",
            rule.id,
            serde_json::to_string(&rule.trigger)?,
            serde_json::to_string(&rule.actions)?,
        )))
    }

    async fn list(&self) -> Result<CommandReply> {
        let rules = self.storage.get_all_rules().await?;
        if rules.is_empty() {
            return Ok(CommandReply::text("No workflows found"));
        }

        let mut text = String::from("Workflows:");
        for rule in &rules {
            text.push_str(&format!(
                "\n\nID: {}\nStatus: {}\nTrigger: {}\nActions: {}",
                rule.id,
                if rule.enabled { "Enabled" } else { "Disabled" },
                serde_json::to_string(&rule.trigger)?,
                serde_json::to_string(&rule.actions)?,
            ));
        }
        Ok(CommandReply::text(text))
    }

    async fn delete(&self, id: &str) -> Result<CommandReply> {
        if self.storage.get_rule(id).await?.is_none() {
            return Ok(not_found(id));
        }
        self.storage.delete_rule(id).await?;
        info!(rule_id = %id, "rule deleted");
        Ok(CommandReply::text(format!("Workflow {id} deleted")))
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<CommandReply> {
        let Some(mut rule) = self.storage.get_rule(id).await? else {
            return Ok(not_found(id));
        };
        rule.enabled = enabled;
        self.storage.update_rule(&rule).await?;

        let state = if enabled { "enabled" } else { "disabled" };
        info!(rule_id = %id, state, "rule state changed");
        Ok(CommandReply::text(format!("Workflow {id} {state}")))
    }

    async fn english(&self, sentence: &str) -> Result<CommandReply> {
        if sentence.trim().is_empty() {
            return Ok(CommandReply::text(format!(
                "Please provide a natural language command. Examples:\n{}",
                bullet_examples()
            )));
        }

        let steps = match self.parser.parse_or_fail(sentence) {
            Ok(steps) => steps,
            Err(EngineError::ParseFailed { reason }) => {
                debug!(reason = %reason, "english command not understood");
                return Ok(CommandReply::text(format!(
                    "Could not understand that command. Try one of these:\n{}",
                    bullet_examples()
                )));
            }
            Err(e) => return Err(e),
        };

        let mut text = String::from("Workflow preview. Here's what I understood:");
        for (index, step) in steps.iter().enumerate() {
            text.push_str(&format!("\n\nStep {}:\n{}", index + 1, step.describe()));
        }
        Ok(CommandReply {
            text,
            preview: Some(steps),
        })
    }
}

// ---------------------------------------------------------------------------
// Reply text
// ---------------------------------------------------------------------------

/// The overview shown for an empty or unknown subcommand.
pub fn help_text() -> String {
    let mut text = String::from(
        "Available commands:\n\
         • /workflow english \"<natural language command>\" - create workflows from a sentence\n\
         • /workflow create <conditions> action=<spec> - create a workflow from technical syntax\n\
         • /workflow list | delete <id> | enable <id> | disable <id>\n\n\
         Example commands:",
    );
    for example in example_commands() {
        text.push_str(&format!("\n• /workflow english \"{example}\""));
    }
    text
}

/// Full syntax of every subcommand.
pub fn usage_text() -> String {
    [
        "Usage:",
        "/workflow create @user #room contains=text startsWith=text regex=pattern action=dm:@user=\"message\"",
        "/workflow create action=delete",
        "/workflow create action=post:#room=\"message\"",
        "/workflow english \"<natural language command>\"",
        "/workflow list",
        "/workflow delete <workflow_id>",
        "/workflow enable <workflow_id>",
        "/workflow disable <workflow_id>",
    ]
    .join("\n")
}

fn bullet_examples() -> String {
    example_commands()
        .iter()
        .map(|ex| format!("• {ex}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn not_found(id: &str) -> CommandReply {
    CommandReply::text(format!("Workflow with ID {id} not found"))
}

/// Errors caused by what the user typed, as opposed to infrastructure.
fn is_input_error(e: &EngineError) -> bool {
    matches!(
        e,
        EngineError::UnknownActionKind { .. }
            | EngineError::InvalidAction { .. }
            | EngineError::EmptyActions
            | EngineError::ParseFailed { .. }
    )
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split a chat-typed argument string on whitespace, keeping quoted runs
/// together.
///
/// Quotes are kept in the token (`action=post:#a="x y"` stays one token with
/// its quotes) and are removed later by the syntax builder.  An unbalanced
/// quote extends to the end of the line.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                }
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn strip_outer_quotes(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2
            && let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
