use thiserror::Error;

/// Errors raised while loading, advancing or persisting a wizard.
#[derive(Debug, Error)]
pub enum WizardError {
    /// No session entry exists for the flow id. Callers turn this into a
    /// redirect to the flow's landing page.
    #[error("no wizard state for {namespace} flow {flow_id}")]
    StateNotFound { namespace: String, flow_id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid flow id: {0}")]
    InvalidFlowId(String),

    #[error("flow not found: {0}")]
    FlowNotFound(String),

    #[error("step not found: {0}")]
    StepNotFound(String),

    #[error("no transition out of step {0}")]
    NoTransition(String),

    #[error("step execution failed: {0}")]
    StepFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WizardError>;
