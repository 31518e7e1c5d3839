use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No profile stored for session '{session_id}'")]
    ProfileNotFound { session_id: String },

    #[error("Collaborator '{name}' failed: {reason}")]
    Collaborator { name: &'static str, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReconcileError {
    pub fn collaborator(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Collaborator { name, reason: reason.into() }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
