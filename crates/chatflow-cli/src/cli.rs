//! CLI argument definitions for chatflow.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// chatflow -- "when X happens, do Y" chat automations.
#[derive(Parser)]
#[command(
    name = "chatflow",
    version,
    about = "chatflow -- chat automation rules from plain English",
    long_about = "Author chat automation rules in a compact key=value syntax or in plain \
                  English, then run incoming chat messages through them."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an authoring command: create, list, delete, enable, disable, english.
    Workflow {
        /// Handle or id of the user issuing the command.
        #[arg(long = "as", default_value = "admin")]
        user: String,

        /// Create rules from an English command without asking for confirmation.
        #[arg(long, short)]
        yes: bool,

        /// Subcommand and its arguments, e.g. `create contains=hi action=delete`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run one chat message through the enabled rules.
    Simulate {
        /// Room name or id the message was posted in.
        #[arg(long, short)]
        room: String,

        /// Handle or id of the sender.
        #[arg(long, short)]
        user: String,

        /// Message text.
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Read `#room @user message` lines from stdin and dispatch each one.
    ///
    /// Messages starting with `/workflow` are treated as authoring commands.
    Listen,

    /// Print the example English commands.
    Examples,
}
