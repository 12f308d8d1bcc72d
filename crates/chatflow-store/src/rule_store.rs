//! Rule persistence.
//!
//! One row per rule in the `rules` table.  The trigger and the action list
//! are stored as JSON in the engine's wire shape, so a rule read back is
//! field-for-field the rule that was written.  `seq` is an autoincrement
//! column that keeps listings in insertion order.

use async_trait::async_trait;
use chatflow_engine::{Action, EngineError, Rule, RuleStorage, Trigger};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

const SELECT_RULE: &str =
    "SELECT id, name, created_by, created_at, enabled, trigger, actions FROM rules";

// ═══════════════════════════════════════════════════════════════════════
//  SqliteRuleStore
// ═══════════════════════════════════════════════════════════════════════

/// CRUD operations on rules, backed by SQLite.
#[derive(Clone)]
pub struct SqliteRuleStore {
    db: Database,
}

impl SqliteRuleStore {
    /// Create a rule store backed by `db`.  The schema must be migrated.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new rule.  Rules without actions are refused.
    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub async fn create(&self, rule: &Rule) -> StoreResult<()> {
        if rule.actions.is_empty() {
            return Err(StoreError::InvalidArgument(
                "a rule needs at least one action".into(),
            ));
        }

        let row = RuleRow::from_rule(rule)?;
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO rules (id, name, created_by, created_at, enabled, trigger, actions, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?4)",
                    rusqlite::params![
                        row.id,
                        row.name,
                        row.created_by,
                        row.created_at,
                        row.enabled,
                        row.trigger,
                        row.actions
                    ],
                )?;
                Ok(())
            })
            .await?;

        info!(rule_id = %rule.id, "rule stored");
        Ok(())
    }

    /// Fetch one rule, or `None` when the id is unknown.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<Rule>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    &format!("{SELECT_RULE} WHERE id = ?1"),
                    rusqlite::params![id],
                    RuleRow::from_sql_row,
                );
                match result {
                    Ok(row) => row.into_rule().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await
    }

    /// Every rule in insertion order.
    #[instrument(skip(self))]
    pub async fn list(&self) -> StoreResult<Vec<Rule>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(&format!("{SELECT_RULE} ORDER BY seq ASC"))?;
                let rows = stmt
                    .query_map([], RuleRow::from_sql_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(RuleRow::into_rule).collect()
            })
            .await
    }

    /// Replace the stored copy of an existing rule.  The id and insertion
    /// position never change.
    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub async fn update(&self, rule: &Rule) -> StoreResult<()> {
        if rule.actions.is_empty() {
            return Err(StoreError::InvalidArgument(
                "a rule needs at least one action".into(),
            ));
        }

        let row = RuleRow::from_rule(rule)?;
        let now = Utc::now().timestamp_millis();
        let changed = self
            .db
            .execute(move |conn| {
                let changed = conn.execute(
                    "UPDATE rules SET name = ?2, enabled = ?3, trigger = ?4, actions = ?5, updated_at = ?6 \
                     WHERE id = ?1",
                    rusqlite::params![row.id, row.name, row.enabled, row.trigger, row.actions, now],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "rule",
                id: rule.id.clone(),
            });
        }
        debug!(rule_id = %rule.id, enabled = rule.enabled, "rule updated");
        Ok(())
    }

    /// Set only the `enabled` flag.
    #[instrument(skip(self))]
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> StoreResult<()> {
        let id = id.to_string();
        let now = Utc::now().timestamp_millis();
        let changed = self
            .db
            .execute({
                let id = id.clone();
                move |conn| {
                    let changed = conn.execute(
                        "UPDATE rules SET enabled = ?2, updated_at = ?3 WHERE id = ?1",
                        rusqlite::params![id, enabled, now],
                    )?;
                    Ok(changed)
                }
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound { entity: "rule", id });
        }
        debug!(rule_id = %id, enabled, "rule enabled flag set");
        Ok(())
    }

    /// Delete a rule by id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        let changed = self
            .db
            .execute({
                let id = id.clone();
                move |conn| Ok(conn.execute("DELETE FROM rules WHERE id = ?1", rusqlite::params![id])?)
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound { entity: "rule", id });
        }
        info!(rule_id = %id, "rule deleted");
        Ok(())
    }

    /// Number of stored rules.
    #[instrument(skip(self))]
    pub async fn count(&self) -> StoreResult<i64> {
        self.db
            .execute(|conn| Ok(conn.query_row("SELECT count(*) FROM rules", [], |row| row.get(0))?))
            .await
    }
}

#[async_trait]
impl RuleStorage for SqliteRuleStore {
    async fn get_all_rules(&self) -> Result<Vec<Rule>, EngineError> {
        Ok(self.list().await?)
    }

    async fn get_rule(&self, id: &str) -> Result<Option<Rule>, EngineError> {
        Ok(self.get(id).await?)
    }

    async fn create_rule(&self, rule: &Rule) -> Result<(), EngineError> {
        rule.validate()?;
        Ok(self.create(rule).await?)
    }

    async fn update_rule(&self, rule: &Rule) -> Result<(), EngineError> {
        rule.validate()?;
        Ok(self.update(rule).await?)
    }

    async fn delete_rule(&self, id: &str) -> Result<(), EngineError> {
        Ok(self.delete(id).await?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Internal row mapping
// ═══════════════════════════════════════════════════════════════════════

/// Raw row data read directly from SQLite.
struct RuleRow {
    id: String,
    name: Option<String>,
    created_by: String,
    /// Milliseconds since the Unix epoch.
    created_at: i64,
    enabled: bool,
    trigger: String,
    actions: String,
}

impl RuleRow {
    fn from_rule(rule: &Rule) -> StoreResult<Self> {
        Ok(Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            created_by: rule.created_by.clone(),
            created_at: rule.created_at.timestamp_millis(),
            enabled: rule.enabled,
            trigger: serde_json::to_string(&rule.trigger)?,
            actions: serde_json::to_string(&rule.actions)?,
        })
    }

    fn from_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_by: row.get(2)?,
            created_at: row.get(3)?,
            enabled: row.get(4)?,
            trigger: row.get(5)?,
            actions: row.get(6)?,
        })
    }

    fn into_rule(self) -> StoreResult<Rule> {
        let created_at: DateTime<Utc> = DateTime::from_timestamp_millis(self.created_at)
            .ok_or_else(|| {
                StoreError::InvalidArgument(format!(
                    "rule {} has an out-of-range created_at: {}",
                    self.id, self.created_at
                ))
            })?;
        let trigger: Trigger = serde_json::from_str(&self.trigger)?;
        let actions: Vec<Action> = serde_json::from_str(&self.actions)?;

        Ok(Rule {
            id: self.id,
            name: self.name,
            created_by: self.created_by,
            created_at,
            enabled: self.enabled,
            trigger,
            actions,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_engine::CHANNEL_TARGET;

    async fn setup() -> SqliteRuleStore {
        SqliteRuleStore::new(Database::in_memory_migrated().await.unwrap())
    }

    fn sample(text: &str) -> Rule {
        Rule::new(
            "U1",
            Trigger::message().in_room("#support").containing(text),
            vec![
                Action::DirectMessage {
                    target: "@lead".into(),
                    text: format!("saw {text}"),
                },
                Action::PostToRoom {
                    target: CHANNEL_TARGET.into(),
                    text: "noted".into(),
                },
                Action::DeleteTriggeringMessage,
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let store = setup().await;
        let rule = sample("urgent").with_name("escalate");
        store.create(&rule).await.unwrap();

        let loaded = store.get(&rule.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, rule.id);
        assert_eq!(loaded.name.as_deref(), Some("escalate"));
        assert_eq!(loaded.trigger, rule.trigger);
        assert_eq!(loaded.actions, rule.actions);
        assert_eq!(
            loaded.created_at.timestamp_millis(),
            rule.created_at.timestamp_millis()
        );
        assert!(loaded.enabled);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = setup().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = setup().await;
        let rules: Vec<Rule> = ["c", "a", "b"].iter().map(|t| sample(t)).collect();
        for rule in &rules {
            store.create(rule).await.unwrap();
        }

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        let expected: Vec<String> = rules.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn update_keeps_position_and_changes_only_enabled() {
        let store = setup().await;
        let first = sample("one");
        let second = sample("two");
        store.create(&first).await.unwrap();
        store.create(&second).await.unwrap();

        let mut disabled = first.clone();
        disabled.enabled = false;
        store.update(&disabled).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert!(!listed[0].enabled);
        assert_eq!(listed[0].trigger, first.trigger);
        assert_eq!(listed[0].actions, first.actions);
        assert!(listed[1].enabled);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = setup().await;
        let result = store.update(&sample("ghost")).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "rule", .. })));
    }

    #[tokio::test]
    async fn set_enabled_toggles_flag() {
        let store = setup().await;
        let rule = sample("x");
        store.create(&rule).await.unwrap();

        store.set_enabled(&rule.id, false).await.unwrap();
        assert!(!store.get(&rule.id).await.unwrap().unwrap().enabled);
        store.set_enabled(&rule.id, true).await.unwrap();
        assert!(store.get(&rule.id).await.unwrap().unwrap().enabled);

        assert!(matches!(
            store.set_enabled("missing", true).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let store = setup().await;
        let rule = sample("bye");
        store.create(&rule).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete(&rule.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(matches!(
            store.delete(&rule.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_refuses_empty_actions() {
        let store = setup().await;
        let mut rule = sample("x");
        rule.actions.clear();
        assert!(matches!(
            store.create(&rule).await,
            Err(StoreError::InvalidArgument(_))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = setup().await;
        let rule = sample("x");
        store.create(&rule).await.unwrap();
        assert!(matches!(store.create(&rule).await, Err(StoreError::Sqlite(_))));
    }

    #[tokio::test]
    async fn trait_errors_map_to_engine_errors() {
        let store = setup().await;
        let mut rule = sample("x");
        rule.actions.clear();
        assert!(matches!(
            store.create_rule(&rule).await,
            Err(EngineError::EmptyActions)
        ));
        assert!(matches!(
            store.delete_rule("missing").await,
            Err(EngineError::RuleNotFound { .. })
        ));
    }
}
