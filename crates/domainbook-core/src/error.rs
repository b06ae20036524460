use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid email format: {0}")]
    InvalidFormat(String),
    #[error("malformed address (missing '@'): {0}")]
    MalformedAddress(String),
}
