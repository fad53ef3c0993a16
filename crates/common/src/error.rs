/// articlevec error types
#[derive(Debug, thiserror::Error)]
pub enum ArticleVecError {
    /// Malformed row or cell in tabular input
    #[error("Row parse error: {0}")]
    RowParse(String),

    /// Embedding service unavailable or rejected the input
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Datastore connection or query failure
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// LLM generation error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArticleVecError {
    /// Create row parse error
    pub fn row_parse<S: Into<String>>(msg: S) -> Self {
        Self::RowParse(msg.into())
    }

    /// Create embedding service error
    pub fn embedding_service<S: Into<String>>(msg: S) -> Self {
        Self::EmbeddingService(msg.into())
    }

    /// Create datastore error
    pub fn datastore<S: Into<String>>(msg: S) -> Self {
        Self::Datastore(msg.into())
    }

    /// Create LLM error
    pub fn llm<S: Into<String>>(msg: S) -> Self {
        Self::Llm(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the error should terminate the process rather than be
    /// recovered per item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Datastore(_) | Self::Config(_))
    }
}
