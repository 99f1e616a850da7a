use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProductionError {
    #[error("PIN must be 4 to 8 digits")]
    InvalidPin,

    #[error("PIN confirmation does not match")]
    PinMismatch,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("task must start before it ends")]
    InvalidInterval,

    #[error("date range ends before it starts")]
    InvalidRange,

    #[error("weekday out of range: {0}")]
    InvalidWeekday(u8),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PIN hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl ProductionError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        ProductionError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProductionError>;
