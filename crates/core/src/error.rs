use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown project status: {0}")]
    UnknownProjectStatus(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
