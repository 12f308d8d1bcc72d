//! Engine error types.
//!
//! All engine subsystems surface errors through [`EngineError`].  Only a
//! subset ever reaches a caller: target resolution failures are absorbed by
//! the action pipeline and invalid trigger patterns by the matcher, so they
//! exist here mainly to be logged with a consistent shape.

/// Unified error type for the rule engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // -- Authoring errors ----------------------------------------------------
    /// The English command could not be understood.
    #[error("failed to parse command: {reason}")]
    ParseFailed { reason: String },

    /// A rule must carry at least one action.
    #[error("a rule needs at least one action")]
    EmptyActions,

    /// The action kind named in an action spec is not supported.
    #[error("unknown action kind `{kind}`")]
    UnknownActionKind { kind: String },

    /// The action spec was recognised but is missing a target or text.
    #[error("invalid action `{spec}`: {reason}")]
    InvalidAction { spec: String, reason: String },

    /// The referenced rule does not exist.
    #[error("rule not found: {rule_id}")]
    RuleNotFound { rule_id: String },

    // -- Evaluation errors ---------------------------------------------------
    /// A trigger's regex condition does not compile.
    #[error("invalid trigger pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An action's user or room target could not be resolved.
    #[error("action target not found: {target}")]
    TargetNotFound { target: String },

    /// The rule is in a state the pipeline cannot execute.
    #[error("invalid rule state for {rule_id}: {reason}")]
    InvalidRuleState { rule_id: String, reason: String },

    // -- Collaborator errors -------------------------------------------------
    /// The storage collaborator failed.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// The messaging host failed.
    #[error("host error: {reason}")]
    Host { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for a [`EngineError::Host`] error.
    pub fn host(reason: impl Into<String>) -> Self {
        Self::Host {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`EngineError::Storage`] error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
