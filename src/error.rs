use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScriptVisionError>;

#[derive(Debug, Error)]
pub enum ScriptVisionError {
    /// Required user text (script, subject name) was blank.
    #[error("{0} is required")]
    EmptyInput(String),

    #[error("generation returned an empty response")]
    EmptyResponse,

    /// The provider call failed. Passed through to the caller untouched.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("a subject named '{0}' already exists")]
    DuplicateSubject(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("no prompt template '{template}' for phase '{phase}'")]
    UnknownTemplate { phase: String, template: String },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ScriptVisionError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::Http(_))
    }
}
