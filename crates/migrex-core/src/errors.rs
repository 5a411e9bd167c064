use thiserror::Error;

/// Result type alias using MigrateError
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Result type alias used at collaborator seams (id map, writers, stores)
pub type ExResult<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input/Definition
    InvalidInput,
    InvalidDefinition,
    InvalidIdList,
    NotFound,
    AlreadyExists,
    ConstraintViolation,

    // Run pipeline
    /// Malformed source row (fatal to the run)
    Source,
    /// A process step rejected its input (per row)
    Process,
    /// A process step asked for the row to be skipped (per row)
    SkipRow,
    /// A destination call failed (per row)
    Writer,
    /// Forward and reverse identifier indices disagree (fatal)
    MapConsistency,
    /// Another import or rollback owns the migration id
    MigrationBusy,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidDefinition => "ERR_INVALID_DEFINITION",
            ExErrorKind::InvalidIdList => "ERR_INVALID_ID_LIST",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Source => "ERR_SOURCE",
            ExErrorKind::Process => "ERR_PROCESS",
            ExErrorKind::SkipRow => "ERR_SKIP_ROW",
            ExErrorKind::Writer => "ERR_WRITER",
            ExErrorKind::MapConsistency => "ERR_MAP_CONSISTENCY",
            ExErrorKind::MigrationBusy => "ERR_MIGRATION_BUSY",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus optional context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    migration_id: Option<String>,
    source_key: Option<String>,
    dest_key: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            migration_id: None,
            source_key: None,
            dest_key: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add migration id context
    pub fn with_migration_id(mut self, id: impl Into<String>) -> Self {
        self.migration_id = Some(id.into());
        self
    }

    /// Add source key context
    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    /// Add destination key context
    pub fn with_dest_key(mut self, key: impl Into<String>) -> Self {
        self.dest_key = Some(key.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the migration id context, if any
    pub fn migration_id(&self) -> Option<&str> {
        self.migration_id.as_deref()
    }

    /// Get the source key context, if any
    pub fn source_key(&self) -> Option<&str> {
        self.source_key.as_deref()
    }

    /// Get the destination key context, if any
    pub fn dest_key(&self) -> Option<&str> {
        self.dest_key.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
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
        if let Some(migration_id) = &self.migration_id {
            write!(f, " (migration: {})", migration_id)?;
        }
        if let Some(source_key) = &self.source_key {
            write!(f, " (source_key: {})", source_key)?;
        }
        if let Some(dest_key) = &self.dest_key {
            write!(f, " (dest_key: {})", dest_key)?;
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

/// Domain error taxonomy for migration runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrateError {
    // ===== Source Errors =====
    /// Source dataset is malformed
    #[error("Malformed source data: {reason}")]
    Source { reason: String },

    /// A row lacks one of the declared identifier fields
    #[error("Source row {row_index} is missing identifier field '{field}'")]
    MissingIdField { row_index: usize, field: String },

    /// An identifier value cannot be coerced to its declared type
    #[error("Identifier field '{field}' has value {value} which is not a valid {expected}")]
    InvalidIdValue {
        field: String,
        value: String,
        expected: String,
    },

    // ===== Process Errors =====
    /// A required source field was absent or a step rejected its input
    #[error("Process failed for field '{field}': {cause}")]
    Process { field: String, cause: String },

    /// A process step asked for the whole row to be skipped
    #[error("Row skipped while processing '{field}': {reason}")]
    SkipRow { field: String, reason: String },

    // ===== Identifier Map Errors =====
    /// Forward/reverse index mismatch
    #[error("Identifier map for '{migration_id}' is inconsistent: {message}")]
    MapConsistency {
        migration_id: String,
        message: String,
    },

    /// Migration id is owned by another run
    #[error("Migration '{migration_id}' is busy ({status})")]
    MigrationBusy {
        migration_id: String,
        status: String,
    },

    // ===== Configuration Errors =====
    /// An id list could not be parsed against the declared id fields
    #[error("Invalid id list '{input}': {reason}")]
    InvalidIdList { input: String, reason: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from MigrateError to ExError
impl From<MigrateError> for ExError {
    fn from(err: MigrateError) -> Self {
        let message = err.to_string();
        match err {
            MigrateError::Source { .. } => ExError::new(ExErrorKind::Source)
                .with_op("read_source")
                .with_message(message),
            MigrateError::MissingIdField { .. } | MigrateError::InvalidIdValue { .. } => {
                ExError::new(ExErrorKind::Source)
                    .with_op("source_key")
                    .with_message(message)
            }
            MigrateError::Process { .. } => ExError::new(ExErrorKind::Process)
                .with_op("process")
                .with_message(message),
            MigrateError::SkipRow { .. } => ExError::new(ExErrorKind::SkipRow)
                .with_op("process")
                .with_message(message),
            MigrateError::MapConsistency { migration_id, .. } => {
                ExError::new(ExErrorKind::MapConsistency)
                    .with_migration_id(migration_id)
                    .with_message(message)
            }
            MigrateError::MigrationBusy { migration_id, .. } => {
                ExError::new(ExErrorKind::MigrationBusy)
                    .with_migration_id(migration_id)
                    .with_message(message)
            }
            MigrateError::InvalidIdList { .. } => {
                ExError::new(ExErrorKind::InvalidIdList).with_message(message)
            }
            MigrateError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            MigrateError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Serialization {
            message: err.to_string(),
        }
    }
}
