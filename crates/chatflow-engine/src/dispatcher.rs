//! Rule dispatcher — one dispatch cycle per incoming chat event.
//!
//! For every event the dispatcher loads a fresh copy of all rules, keeps the
//! enabled message rules whose trigger matches, and runs each match through
//! the [`ActionPipeline`].  Rules are attempted one after another in storage
//! order; a failure inside one rule is logged and never reaches the others.
//! Nothing is cached between cycles, so rule edits apply to the next event.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::host::{MessageEvent, MessagingHost};
use crate::pipeline::{ActionPipeline, PipelineReport};
use crate::rule::TriggerKind;
use crate::storage::RuleStorage;
use crate::trigger;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A rule whose execution failed during a dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub reason: String,
}

/// Summary of one dispatch cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchReport {
    pub event_id: String,
    /// The event came from the automation's own user and was ignored.
    pub ignored_self: bool,
    /// Enabled message rules evaluated against the event.
    pub considered: usize,
    /// Ids of matching rules, in the order they ran.
    pub matched: Vec<String>,
    /// Pipelines that ran to completion.
    pub executed: Vec<PipelineReport>,
    /// Matching rules whose pipeline could not run.
    pub failed: Vec<RuleFailure>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Orchestrates matching and execution for incoming events.
///
/// Holds no per-event state, so one dispatcher can serve concurrent cycles
/// for different events.
#[derive(Clone)]
pub struct RuleDispatcher {
    storage: Arc<dyn RuleStorage>,
    host: Arc<dyn MessagingHost>,
    pipeline: ActionPipeline,
}

impl RuleDispatcher {
    pub fn new(storage: Arc<dyn RuleStorage>, host: Arc<dyn MessagingHost>) -> Self {
        let pipeline = ActionPipeline::new(Arc::clone(&host));
        Self {
            storage,
            host,
            pipeline,
        }
    }

    /// Run one dispatch cycle for `event`.
    ///
    /// Fails only when the rules cannot be loaded, which aborts this cycle
    /// and nothing else.
    pub async fn on_event(&self, event: &MessageEvent) -> Result<DispatchReport> {
        let mut report = DispatchReport {
            event_id: event.id.clone(),
            ..DispatchReport::default()
        };

        match self.host.app_user().await {
            Ok(Some(app)) if app.id == event.sender.id => {
                debug!(event_id = %event.id, "ignoring message from the app user");
                report.ignored_self = true;
                return Ok(report);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not resolve app user, dispatching anyway"),
        }

        let rules = self.storage.get_all_rules().await.inspect_err(|e| {
            error!(event_id = %event.id, error = %e, "failed to load rules, dispatch aborted");
        })?;

        for rule in rules
            .iter()
            .filter(|r| r.enabled && r.trigger.kind == TriggerKind::Message)
        {
            report.considered += 1;
            if !trigger::matches(&rule.trigger, event) {
                continue;
            }

            debug!(rule_id = %rule.id, event_id = %event.id, "rule matched");
            report.matched.push(rule.id.clone());

            match self.pipeline.run(rule, event).await {
                Ok(pipeline_report) => report.executed.push(pipeline_report),
                Err(e) => {
                    error!(rule_id = %rule.id, event_id = %event.id, error = %e, "rule execution failed");
                    report.failed.push(RuleFailure {
                        rule_id: rule.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !report.matched.is_empty() {
            info!(
                event_id = %event.id,
                room = %event.room.name,
                considered = report.considered,
                matched = report.matched.len(),
                failed = report.failed.len(),
                "dispatch cycle complete"
            );
        }

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
