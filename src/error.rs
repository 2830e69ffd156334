use thiserror::Error;

#[derive(Error, Debug)]
pub enum PennyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown {kind}: {ident}")]
    NotFound { kind: &'static str, ident: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No account tagged with special type '{0}'")]
    MissingSpecialAccount(String),

    #[error("Bad amount: {0}")]
    BadAmount(String),

    #[error("Bad date: {0}")]
    BadDate(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl PennyError {
    pub fn not_found(kind: &'static str, ident: impl ToString) -> Self {
        PennyError::NotFound {
            kind,
            ident: ident.to_string(),
        }
    }

    /// Map a `query_row` miss onto NotFound, leaving other database
    /// errors untouched.
    pub fn not_found_on_empty(
        err: rusqlite::Error,
        kind: &'static str,
        ident: impl ToString,
    ) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => PennyError::not_found(kind, ident),
            err => PennyError::Db(err),
        }
    }

    /// Map a SQLite UNIQUE violation onto a Conflict, leaving other
    /// database errors untouched.
    pub fn conflict_on_unique(err: rusqlite::Error, what: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PennyError::Conflict(what.to_string())
            }
            _ => PennyError::Db(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PennyError>;
