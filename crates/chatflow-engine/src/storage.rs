//! Rule storage interface and an in-memory implementation.
//!
//! The canonical copy of every rule lives behind [`RuleStorage`].  The
//! dispatcher reads a fresh list for every event, so an implementation must
//! make a completed `create_rule` visible to the next `get_all_rules`.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::rule::Rule;

/// Durable rule persistence.
#[async_trait]
pub trait RuleStorage: Send + Sync {
    /// All rules in insertion order.
    async fn get_all_rules(&self) -> Result<Vec<Rule>>;

    /// A single rule, or `None` when the id is unknown.
    async fn get_rule(&self, id: &str) -> Result<Option<Rule>>;

    /// Persist a new rule.  Rules without actions are rejected.
    async fn create_rule(&self, rule: &Rule) -> Result<()>;

    /// Replace the stored copy of an existing rule.
    async fn update_rule(&self, rule: &Rule) -> Result<()>;

    /// Remove a rule.
    async fn delete_rule(&self, id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// A [`RuleStorage`] kept in process memory.
///
/// Useful for tests and for hosts that persist rules elsewhere.
#[derive(Debug, Default)]
pub struct MemoryRuleStorage {
    rules: RwLock<Vec<Rule>>,
}

impl MemoryRuleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rules.
    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

#[async_trait]
impl RuleStorage for MemoryRuleStorage {
    async fn get_all_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.read().await.clone())
    }

    async fn get_rule(&self, id: &str) -> Result<Option<Rule>> {
        Ok(self.rules.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn create_rule(&self, rule: &Rule) -> Result<()> {
        rule.validate()?;
        let mut rules = self.rules.write().await;
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(EngineError::storage(format!("duplicate rule id {}", rule.id)));
        }
        rules.push(rule.clone());
        debug!(rule_id = %rule.id, "rule stored in memory");
        Ok(())
    }

    async fn update_rule(&self, rule: &Rule) -> Result<()> {
        let mut rules = self.rules.write().await;
        let slot = rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or_else(|| EngineError::RuleNotFound {
                rule_id: rule.id.clone(),
            })?;
        *slot = rule.clone();
        Ok(())
    }

    async fn delete_rule(&self, id: &str) -> Result<()> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(EngineError::RuleNotFound {
                rule_id: id.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
