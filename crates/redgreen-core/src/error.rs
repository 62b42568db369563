use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("workflow already active: run 'redgreen cancel' first to start a new one")]
    AlreadyActive,

    #[error("no active workflow: start one with 'redgreen setup'")]
    NoActiveWorkflow,

    #[error("workflow is not at a gate (current step: {step})")]
    NotAtGate { step: String },

    #[error("cannot reject from {step}: no loop-back defined; approve to continue or cancel to stop")]
    NothingToReject { step: String },

    #[error("unknown step: {0}")]
    UnknownStep(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoopError>;
