use domainbook_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("corrupt table {path}: {reason}")]
    CorruptTable { path: PathBuf, reason: String },
    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid data path: {0}")]
    InvalidDataPath(PathBuf),
    #[error("invalid backup path (matches table): {0}")]
    InvalidBackupPath(PathBuf),
    #[error("invalid export path (matches table): {0}")]
    InvalidExportPath(PathBuf),
    #[error("corrupt credentials file {path}: {source}")]
    CorruptCredentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("random source unavailable: {0}")]
    Random(String),
    #[error("user already exists: {0}")]
    UserExists(String),
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("invalid email format: {0}")]
    InvalidFormat(String),
    #[error("email domain mismatch: {email} is not in {domain}")]
    DomainMismatch { email: String, domain: String },
    #[error("email already exists: {0}")]
    DuplicateEntry(String),
    #[error("email not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidFormat(value) | CoreError::MalformedAddress(value) => {
                StoreError::InvalidFormat(value)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    InvalidFormat,
    DomainMismatch,
    DuplicateEntry,
    NotFound,
    StorageFailure,
    MissingHomeDir,
    InvalidDataPath,
    InvalidBackupPath,
    InvalidExportPath,
    UserExists,
    EmptyPassword,
    InvalidCredentials,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Io(_)
            | StoreError::Csv(_)
            | StoreError::CorruptTable { .. }
            | StoreError::Lock { .. }
            | StoreError::CorruptCredentials { .. }
            | StoreError::Random(_) => StoreErrorKind::StorageFailure,
            StoreError::MissingHomeDir => StoreErrorKind::MissingHomeDir,
            StoreError::InvalidDataPath(_) => StoreErrorKind::InvalidDataPath,
            StoreError::InvalidBackupPath(_) => StoreErrorKind::InvalidBackupPath,
            StoreError::InvalidExportPath(_) => StoreErrorKind::InvalidExportPath,
            StoreError::UserExists(_) => StoreErrorKind::UserExists,
            StoreError::EmptyPassword => StoreErrorKind::EmptyPassword,
            StoreError::InvalidCredentials => StoreErrorKind::InvalidCredentials,
            StoreError::InvalidFormat(_) => StoreErrorKind::InvalidFormat,
            StoreError::DomainMismatch { .. } => StoreErrorKind::DomainMismatch,
            StoreError::DuplicateEntry(_) => StoreErrorKind::DuplicateEntry,
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
        }
    }

    pub fn is_storage_failure(&self) -> bool {
        self.kind() == StoreErrorKind::StorageFailure
    }
}
