use thiserror::Error;

/// Domain failures of the ledger core.
///
/// `NotFound` deliberately covers both "does not exist" and "exists but is
/// owned by someone else" so callers cannot probe for other owners' records.
/// Anything that is not a domain failure is a storage failure and is passed
/// through unchanged.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("record not found")]
    NotFound,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// A text-encoded enum column held a value no variant matches. Reaching this
/// from a query means the stored data is corrupt, so it surfaces as a column
/// decode failure, not as input validation.
#[derive(Debug, Error)]
#[error("unrecognized {field} value: {value}")]
pub struct UnknownEnumValue {
    pub field: &'static str,
    pub value: String,
}

impl UnknownEnumValue {
    pub(crate) fn column_decode(self) -> sqlx::Error {
        sqlx::Error::ColumnDecode {
            index: self.field.to_string(),
            source: Box::new(self),
        }
    }
}
