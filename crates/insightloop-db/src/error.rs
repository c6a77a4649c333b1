use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PersistenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Bridge("request timed out".to_string())
        } else if e.is_connect() {
            Self::Bridge(format!("could not reach relay: {}", e))
        } else {
            Self::Bridge(e.to_string())
        }
    }
}
