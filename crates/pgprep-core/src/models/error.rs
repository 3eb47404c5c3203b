use crate::models::{Stage, StageAction};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    NotInstalled,
    ServiceStart,
    Provisioning,
    EnvironmentMissing,
    Configuration,
    InvalidInput,
    ParseFailure,
    Timeout,
    ProcessFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub stage: Option<Stage>,
    pub action: Option<StageAction>,
    pub kind: CoreErrorKind,
    pub message: String,
    /// Remediation shown to the operator alongside the message.
    pub hint: Option<String>,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage: None,
            action: None,
            kind,
            message: message.into(),
            hint: None,
        }
    }

    pub fn for_action(action: StageAction, kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message).with_action(action)
    }

    pub fn with_action(mut self, action: StageAction) -> Self {
        self.stage = Some(action.stage());
        self.action = Some(action);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
