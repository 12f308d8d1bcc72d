//! Action pipeline — carry out a rule's actions for one triggering event.
//!
//! Actions run strictly in order, each awaited before the next starts, since
//! later actions may depend on the side effects of earlier ones.  Every
//! action contains its own failures: an unresolved target is skipped and a
//! host error is logged, and neither stops the remaining actions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::host::{MessageEvent, MessagingHost, Room};
use crate::rule::{Action, CHANNEL_TARGET, Rule};
use crate::trigger::strip_sigil;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What happened to a single action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ActionOutcome {
    /// The host accepted the action.
    Completed,
    /// The action had nothing to do (missing text, unresolved target).
    Skipped { reason: String },
    /// The host call failed; the failure was absorbed.
    Failed { reason: String },
}

impl ActionOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// The result of running one rule's action list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub rule_id: String,
    /// One outcome per action, in execution order.
    pub outcomes: Vec<ActionOutcome>,
}

impl PipelineReport {
    /// Number of actions the host accepted.
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ActionOutcome::Completed))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Executes rule actions against a [`MessagingHost`].
#[derive(Clone)]
pub struct ActionPipeline {
    host: Arc<dyn MessagingHost>,
}

impl ActionPipeline {
    pub fn new(host: Arc<dyn MessagingHost>) -> Self {
        Self { host }
    }

    /// Run every action of `rule` for `event`, in order.
    ///
    /// Individual action failures are recorded in the report, never
    /// returned.  Only a rule that cannot be executed at all (no actions)
    /// yields an error.
    pub async fn run(&self, rule: &Rule, event: &MessageEvent) -> Result<PipelineReport> {
        if rule.actions.is_empty() {
            return Err(EngineError::InvalidRuleState {
                rule_id: rule.id.clone(),
                reason: "rule has no actions".into(),
            });
        }

        let mut outcomes = Vec::with_capacity(rule.actions.len());
        for (index, action) in rule.actions.iter().enumerate() {
            debug!(rule_id = %rule.id, step = index, kind = action.kind(), "executing action");

            let outcome = match self.execute(action, event).await {
                Ok(outcome) => outcome,
                Err(EngineError::TargetNotFound { target }) => {
                    debug!(rule_id = %rule.id, step = index, target = %target, "action target not found, skipping");
                    ActionOutcome::skipped(format!("target not found: {target}"))
                }
                Err(e) => {
                    warn!(rule_id = %rule.id, step = index, action = %action, error = %e, "action failed");
                    ActionOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(PipelineReport {
            rule_id: rule.id.clone(),
            outcomes,
        })
    }

    /// Execute a single action.
    async fn execute(&self, action: &Action, event: &MessageEvent) -> Result<ActionOutcome> {
        match action {
            Action::DirectMessage { target, text } => {
                if target.is_empty() || text.is_empty() {
                    return Ok(ActionOutcome::skipped("direct message needs target and text"));
                }
                let handle = strip_sigil(target, '@');
                let user = self
                    .host
                    .lookup_user_by_handle(handle)
                    .await?
                    .ok_or_else(|| EngineError::TargetNotFound {
                        target: target.clone(),
                    })?;
                self.host
                    .send_direct_message(&event.sender, &user, text)
                    .await?;
                Ok(ActionOutcome::Completed)
            }

            Action::PostToRoom { target, text } => {
                if target.is_empty() || text.is_empty() {
                    return Ok(ActionOutcome::skipped("post needs target and text"));
                }
                let room = self
                    .resolve_room(target, event)
                    .await?
                    .ok_or_else(|| EngineError::TargetNotFound {
                        target: target.clone(),
                    })?;
                self.host.send_message(&room, &event.sender, text).await?;
                Ok(ActionOutcome::Completed)
            }

            Action::DeleteTriggeringMessage => {
                self.host.delete_or_notify(event).await?;
                Ok(ActionOutcome::Completed)
            }
        }
    }

    /// Resolve a post target: `#name`, the channel sentinel, or a room id.
    async fn resolve_room(&self, target: &str, event: &MessageEvent) -> Result<Option<Room>> {
        if let Some(name) = target.strip_prefix('#') {
            self.host.lookup_room_by_name(name).await
        } else if target == CHANNEL_TARGET {
            Ok(Some(event.room.clone()))
        } else {
            self.host.lookup_room_by_id(target).await
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Trigger;
    use crate::testing::RecordingHost;

    fn event() -> MessageEvent {
        MessageEvent::new(
            "m1",
            "urgent: prod is down",
            crate::host::User::new("U1", "john"),
            Room::new("R1", "support"),
        )
    }

    fn rule(actions: Vec<Action>) -> Rule {
        Rule {
            actions,
            ..Rule::new("author", Trigger::message().containing("urgent"), vec![Action::DeleteTriggeringMessage]).unwrap()
        }
    }

    #[tokio::test]
    async fn actions_run_in_order() {
        let host = Arc::new(RecordingHost::with_directory());
        let pipeline = ActionPipeline::new(host.clone());
        let rule = rule(vec![
            Action::DirectMessage {
                target: "@lead".into(),
                text: "heads up".into(),
            },
            Action::PostToRoom {
                target: "#general".into(),
                text: "incident".into(),
            },
            Action::DeleteTriggeringMessage,
        ]);

        let report = pipeline.run(&rule, &event()).await.unwrap();
        assert_eq!(report.completed(), 3);
        assert_eq!(
            host.calls(),
            vec![
                "dm john->lead: heads up".to_string(),
                "post #general as john: incident".to_string(),
                "delete m1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn channel_sentinel_posts_into_event_room() {
        let host = Arc::new(RecordingHost::with_directory());
        let pipeline = ActionPipeline::new(host.clone());
        let rule = rule(vec![Action::PostToRoom {
            target: CHANNEL_TARGET.into(),
            text: "ack".into(),
        }]);

        pipeline.run(&rule, &event()).await.unwrap();
        assert_eq!(host.calls(), vec!["post #support as john: ack".to_string()]);
    }

    #[tokio::test]
    async fn bare_target_is_a_room_id() {
        let host = Arc::new(RecordingHost::with_directory());
        let pipeline = ActionPipeline::new(host.clone());
        let rule = rule(vec![Action::PostToRoom {
            target: "R-general".into(),
            text: "by id".into(),
        }]);

        pipeline.run(&rule, &event()).await.unwrap();
        assert_eq!(host.calls(), vec!["post #general as john: by id".to_string()]);
    }

    #[tokio::test]
    async fn unresolved_targets_are_skipped_and_later_actions_still_run() {
        let host = Arc::new(RecordingHost::with_directory());
        let pipeline = ActionPipeline::new(host.clone());
        let rule = rule(vec![
            Action::DirectMessage {
                target: "@ghost".into(),
                text: "hello?".into(),
            },
            Action::PostToRoom {
                target: "#nowhere".into(),
                text: "hello?".into(),
            },
            Action::DeleteTriggeringMessage,
        ]);

        let report = pipeline.run(&rule, &event()).await.unwrap();
        assert!(matches!(report.outcomes[0], ActionOutcome::Skipped { .. }));
        assert!(matches!(report.outcomes[1], ActionOutcome::Skipped { .. }));
        assert_eq!(report.outcomes[2], ActionOutcome::Completed);
        assert_eq!(host.calls(), vec!["delete m1".to_string()]);
    }

    #[tokio::test]
    async fn host_failure_is_contained() {
        let host = Arc::new(RecordingHost::with_directory().failing_sends());
        let pipeline = ActionPipeline::new(host.clone());
        let rule = rule(vec![
            Action::PostToRoom {
                target: "#general".into(),
                text: "boom".into(),
            },
            Action::DeleteTriggeringMessage,
        ]);

        let report = pipeline.run(&rule, &event()).await.unwrap();
        assert!(matches!(report.outcomes[0], ActionOutcome::Failed { .. }));
        assert_eq!(report.outcomes[1], ActionOutcome::Completed);
    }

    #[tokio::test]
    async fn empty_text_is_skipped() {
        let host = Arc::new(RecordingHost::with_directory());
        let pipeline = ActionPipeline::new(host.clone());
        let rule = rule(vec![Action::DirectMessage {
            target: "@lead".into(),
            text: String::new(),
        }]);

        let report = pipeline.run(&rule, &event()).await.unwrap();
        assert!(matches!(report.outcomes[0], ActionOutcome::Skipped { .. }));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn rule_without_actions_is_an_error() {
        let host = Arc::new(RecordingHost::with_directory());
        let pipeline = ActionPipeline::new(host);
        let rule = rule(vec![]);
        let result = pipeline.run(&rule, &event()).await;
        assert!(matches!(result, Err(EngineError::InvalidRuleState { .. })));
    }
}
