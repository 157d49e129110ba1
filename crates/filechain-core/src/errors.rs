use filechain_core_types::RequestId;
use thiserror::Error;

/// Result type alias using ChainError
pub type Result<T> = std::result::Result<T, ChainError>;

/// Error type user-supplied functions (Expand, Map, scalar functions) return.
pub type UdfError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for user-supplied functions
pub type UdfResult<T> = std::result::Result<T, UdfError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers and tests can match
/// on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Pipeline execution
    /// A stage produced a row that does not conform to its schema
    SchemaViolation,
    /// User code raised during an Expand, Map or Mutate stage
    StageExecutionFailure,
    /// The cancellation signal was raised before the materialization finished
    Cancelled,

    // Registry lookups
    DatasetNotFound,
    VersionNotFound,

    // Storage
    /// Listing or reading from the storage backend failed
    StorageUnavailable,

    // Plan construction / expressions
    InvalidInput,
    InvalidPattern,
    ColumnNotFound,
    TypeMismatch,

    // Persistence / IO
    Persistence,
    Serialization,
    Io,
    /// A persisted snapshot no longer matches its recorded content digest
    Integrity,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::SchemaViolation => "ERR_SCHEMA_VIOLATION",
            ExErrorKind::StageExecutionFailure => "ERR_STAGE_EXECUTION_FAILURE",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::DatasetNotFound => "ERR_DATASET_NOT_FOUND",
            ExErrorKind::VersionNotFound => "ERR_VERSION_NOT_FOUND",
            ExErrorKind::StorageUnavailable => "ERR_STORAGE_UNAVAILABLE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidPattern => "ERR_INVALID_PATTERN",
            ExErrorKind::ColumnNotFound => "ERR_COLUMN_NOT_FOUND",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Integrity => "ERR_INTEGRITY",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context a
/// pipeline abort has to report: which stage, which input row, which
/// dataset/version.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    stage_index: Option<usize>,
    stage: Option<String>,
    row_source: Option<String>,
    row_path: Option<String>,
    row_index: Option<usize>,
    dataset: Option<String>,
    version: Option<u32>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            stage_index: None,
            stage: None,
            row_source: None,
            row_path: None,
            row_index: None,
            dataset: None,
            version: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the offending stage (position in the plan and its label)
    pub fn with_stage(mut self, index: usize, label: impl Into<String>) -> Self {
        self.stage_index = Some(index);
        self.stage = Some(label.into());
        self
    }

    /// Add the offending input row's identity
    pub fn with_row(mut self, source: impl Into<String>, path: impl Into<String>) -> Self {
        self.row_source = Some(source.into());
        self.row_path = Some(path.into());
        self
    }

    /// Add the offending input row's position within the stage input
    pub fn with_row_index(mut self, index: usize) -> Self {
        self.row_index = Some(index);
        self
    }

    pub fn with_dataset(mut self, name: impl Into<String>) -> Self {
        self.dataset = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn stage_index(&self) -> Option<usize> {
        self.stage_index
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn row_source(&self) -> Option<&str> {
        self.row_source.as_deref()
    }

    pub fn row_path(&self) -> Option<&str> {
        self.row_path.as_deref()
    }

    pub fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let (Some(index), Some(stage)) = (self.stage_index, &self.stage) {
            write!(f, " (stage #{}: {})", index, stage)?;
        }
        match (&self.row_source, &self.row_path) {
            (Some(source), Some(path)) => write!(f, " (row: {}/{})", source, path)?,
            _ => {
                if let Some(index) = self.row_index {
                    write!(f, " (row index: {})", index)?;
                }
            }
        }
        if let Some(dataset) = &self.dataset {
            match self.version {
                Some(v) => write!(f, " (dataset: {}@{})", dataset, v)?,
                None => write!(f, " (dataset: {})", dataset)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by model-level operations (schemas, expressions,
/// patterns). Converted into `ExError` at crate seams.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A row does not conform to the schema its stage declared or inferred
    #[error("Schema violation in {stage}: {detail}")]
    SchemaViolation { stage: String, detail: String },

    /// Column (or nested field) not present in the row
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// A value had the wrong type for the operation applied to it
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// Glob pattern could not be compiled
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A caller-supplied scalar function returned an error
    #[error("Function '{name}' failed: {message}")]
    FunctionFailed { name: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<ChainError> for ExError {
    fn from(err: ChainError) -> Self {
        let message = err.to_string();
        let kind = match &err {
            ChainError::SchemaViolation { .. } => ExErrorKind::SchemaViolation,
            ChainError::ColumnNotFound { .. } => ExErrorKind::ColumnNotFound,
            ChainError::TypeMismatch { .. } => ExErrorKind::TypeMismatch,
            ChainError::InvalidPattern { .. } => ExErrorKind::InvalidPattern,
            ChainError::InvalidInput { .. } => ExErrorKind::InvalidInput,
            ChainError::FunctionFailed { .. } => ExErrorKind::StageExecutionFailure,
            ChainError::Serialization { .. } => ExErrorKind::Serialization,
            ChainError::Internal { .. } => ExErrorKind::Internal,
        };
        ExError::new(kind).with_message(message)
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
