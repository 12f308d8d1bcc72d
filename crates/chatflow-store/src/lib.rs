//! # chatflow-store
//!
//! SQLite-backed rule persistence for the chatflow engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  SqliteRuleStore  (RuleStorage impl)     │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL, spawn_blocking) │
//! │  Migrations (versioned, transactional)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use chatflow_store::{Database, SqliteRuleStore};
//!
//! let db = Database::open_and_migrate("data/chatflow.db").await?;
//! let rules = SqliteRuleStore::new(db);
//! ```

pub mod db;
pub mod error;
pub mod migration;
pub mod rule_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use rule_store::SqliteRuleStore;
