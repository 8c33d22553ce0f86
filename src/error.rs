use thiserror::Error;

#[derive(Error, Debug)]
pub enum DollarError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setup token: {0}")]
    TokenDecode(String),

    #[error("Claim failed with status {status}: {body}")]
    Claim { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Fetch failed with status {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DollarError>;
