use thiserror::Error;

pub type Result<T> = std::result::Result<T, RankerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankerError {
    #[error("{0}")]
    Validation(String),

    #[error("not enough phrases to compare (need 2, have {available})")]
    NotEnoughData { available: usize },

    #[error("phrase not found: {0}")]
    NotFound(u32),

    #[error("rating for phrase {phrase_id} changed while it was being updated")]
    StaleRating { phrase_id: u32 },

    #[error("{0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),
}

/// Broad category of a [`RankerError`], used at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotEnoughData,
    NotFound,
    Conflict,
    Store,
}

impl RankerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RankerError::Validation(_) => ErrorKind::Validation,
            RankerError::NotEnoughData { .. } => ErrorKind::NotEnoughData,
            RankerError::NotFound(_) => ErrorKind::NotFound,
            RankerError::StaleRating { .. } | RankerError::Conflict(_) => ErrorKind::Conflict,
            RankerError::Store(_) => ErrorKind::Store,
        }
    }
}
