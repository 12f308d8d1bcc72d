//! Rule engine for chat automations.
//!
//! This crate provides:
//!
//! - **Rule model**: triggers, actions and rules via [`rule::Rule`].
//! - **English command parser**: a fixed grammar turning a sentence into
//!   trigger/action steps via [`parser::NaturalLanguageParser`].
//! - **Trigger matcher**: AND-semantics condition evaluation via
//!   [`trigger::matches`].
//! - **Action pipeline**: ordered, failure-contained action execution via
//!   [`pipeline::ActionPipeline`].
//! - **Rule dispatcher**: one dispatch cycle per incoming event via
//!   [`dispatcher::RuleDispatcher`].
//! - **Authoring**: the technical `key=value` syntax ([`syntax`]) and the
//!   `/workflow` subcommands ([`command::CommandHandler`]).
//!
//! The chat platform and rule persistence are collaborators behind the
//! [`host::MessagingHost`] and [`storage::RuleStorage`] traits.

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod parser;
pub mod pipeline;
pub mod rule;
pub mod storage;
pub mod syntax;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use command::{CommandHandler, CommandReply, split_command_line};
pub use dispatcher::{DispatchReport, RuleDispatcher, RuleFailure};
pub use error::{EngineError, Result};
pub use host::{MessageEvent, MessagingHost, Room, User};
pub use parser::{NaturalLanguageParser, ParsedStep, StepAction, StepTrigger, example_commands};
pub use pipeline::{ActionOutcome, ActionPipeline, PipelineReport};
pub use rule::{Action, CHANNEL_TARGET, Rule, Trigger, TriggerKind};
pub use storage::{MemoryRuleStorage, RuleStorage};
