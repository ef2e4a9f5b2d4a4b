use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline stage was invoked before its prerequisites were set up.
    #[error("Pipeline not ready: {0}")]
    NotReady(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external collaborator (embedding, vector store, completion, scoring) failed.
    #[error("{stage} failed: {cause:#}")]
    Collaborator { stage: &'static str, cause: anyhow::Error },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn collaborator(stage: &'static str, cause: anyhow::Error) -> Self {
        // Collaborators may already report one of our own variants (e.g. a missing index).
        match cause.downcast::<Error>() {
            Ok(inner) => inner,
            Err(cause) => Error::Collaborator { stage, cause },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Operation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
