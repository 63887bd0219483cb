use thiserror::Error;

use crate::i18n::Locale;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid schema structure: {0}")]
    StructuralInvariant(String),

    #[error("row {record_id} is already being edited")]
    EditInProgress { record_id: String },

    #[error("export error: {0}")]
    Export(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification used at operation boundaries to pick a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Parse,
    Store,
    StructuralInvariant,
    State,
    Export,
    Config,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(_) | Error::Store(_) | Error::NotFound | Error::AlreadyExists => {
                ErrorKind::Store
            }
            Error::Validation(_) => ErrorKind::Validation,
            Error::Parse(_) => ErrorKind::Parse,
            Error::StructuralInvariant(_) => ErrorKind::StructuralInvariant,
            Error::EditInProgress { .. } => ErrorKind::State,
            Error::Export(_) => ErrorKind::Export,
            Error::Io(_) | Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Localized one-line description for the operator.
    ///
    /// Validation, parse and structural failures carry their own detail;
    /// store failures are summarized since the raw driver text is only
    /// useful in the log.
    #[must_use]
    pub fn user_message(&self, locale: Locale) -> String {
        let messages = locale.messages();
        match self {
            Error::Validation(detail) => detail.clone(),
            Error::Parse(detail) => format!("{}: {detail}", messages.parse_failed),
            Error::StructuralInvariant(_) => messages.invalid_structure.to_string(),
            Error::EditInProgress { .. } => messages.edit_in_progress.to_string(),
            Error::NotFound => messages.not_found.to_string(),
            Error::AlreadyExists => messages.already_exists.to_string(),
            Error::Database(_) | Error::Store(_) => messages.store_failed.to_string(),
            Error::Export(_) => messages.export_failed.to_string(),
            Error::Io(e) => e.to_string(),
            Error::Config(detail) => detail.clone(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::NotFound.kind(), ErrorKind::Store);
        assert_eq!(Error::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(
            Error::StructuralInvariant("x".into()).kind(),
            ErrorKind::StructuralInvariant
        );
        assert_eq!(
            Error::EditInProgress {
                record_id: "r1".into()
            }
            .kind(),
            ErrorKind::State
        );
    }

    #[test]
    fn test_json_error_is_parse() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_store_message_is_localized() {
        let err = Error::Store("disk full".into());
        assert_eq!(err.user_message(Locale::En), "Failed to save to the store");
        assert_ne!(err.user_message(Locale::He), err.user_message(Locale::En));
    }
}
