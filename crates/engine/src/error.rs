//! The module contains the errors the engine can throw.
//!
//! Most variants carry a human readable message that is safe to return to
//! API clients. [`Database`] is the exception: callers are expected to log it
//! and hide the details.
//!
//!  [`Database`]: EngineError::Database
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("{0}")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
    #[error("Missing association: {0}")]
    MissingScope(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Turns a unique-constraint violation into a friendly [`ExistingKey`]
    /// naming the clashing user field. Any other database error is kept as is.
    ///
    ///  [`ExistingKey`]: EngineError::ExistingKey
    pub(crate) fn from_insert(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                Self::ExistingKey(duplicate_message(&detail).to_string())
            }
            _ => Self::Database(err),
        }
    }
}

fn duplicate_message(detail: &str) -> &'static str {
    let detail = detail.to_ascii_lowercase();
    if detail.contains("email") {
        "A user with this email already exists"
    } else if detail.contains("nin") {
        "A user with this NIN already exists"
    } else if detail.contains("phone") {
        "A user with this phone number already exists"
    } else if detail.contains("reference") {
        "A transaction with this reference already exists"
    } else {
        "Record already exists"
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidSetting(a), Self::InvalidSetting(b)) => a == b,
            (Self::MissingScope(a), Self::MissingScope(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_names_the_field() {
        assert_eq!(
            duplicate_message("UNIQUE constraint failed: users.email"),
            "A user with this email already exists"
        );
        assert_eq!(
            duplicate_message("UNIQUE constraint failed: users.nin"),
            "A user with this NIN already exists"
        );
        assert_eq!(duplicate_message("something else"), "Record already exists");
    }

    #[test]
    fn non_unique_errors_stay_database_errors() {
        let err = EngineError::from_insert(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, EngineError::Database(_)));
    }
}
