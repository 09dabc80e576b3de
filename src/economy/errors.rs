use thiserror::Error;

/// Errors that can arise while reading or mutating the economy ledger.
#[derive(Debug, Error)]
pub enum EconomyError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON import/export and catalog parsing failures.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when looking up something that is not present (catalog species, items).
    #[error("not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Stake or payment exceeds what the user holds.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Amount is malformed or out of the allowed range.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Any other malformed command argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Permission denied (admin-only command)
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Duel or confirmation moved along an edge its state machine does not have.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// Internal error (unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl EconomyError {
    /// True for errors that are the user's fault and are rendered back to them verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EconomyError::NotFound(_)
                | EconomyError::InsufficientFunds { .. }
                | EconomyError::InvalidAmount(_)
                | EconomyError::InvalidArgument(_)
                | EconomyError::PermissionDenied(_)
        )
    }

    /// Text shown to the user for a user-facing error, without the variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            EconomyError::NotFound(m)
            | EconomyError::InvalidAmount(m)
            | EconomyError::InvalidArgument(m)
            | EconomyError::PermissionDenied(m) => m.clone(),
            EconomyError::InsufficientFunds { needed, available } => format!(
                "you don't have enough: this needs {} but you only have {}",
                needed, available
            ),
            other => other.to_string(),
        }
    }
}
