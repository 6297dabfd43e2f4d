use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configs, building payloads and talking to the remote APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// A missing or invalid config value. Fatal for the whole run.
    #[error("{0}")]
    Config(String),

    /// A recurrence day that does not read `<position> <weekday>`.
    #[error("Invalid recurrence_day format: {0}")]
    InvalidRecurrenceFormat(String),

    /// A recurrence setting the target API cannot express.
    #[error("Unsupported recurrence: {0}")]
    UnsupportedRecurrence(String),

    /// The remote API answered with a non-2xx status.
    #[error("HTTP {status} - {body}")]
    Status { status: u16, body: String },

    /// Obtaining the OAuth access token failed.
    #[error("Error getting access token: {0}")]
    Auth(String),

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// True for errors that should stop the run rather than only the current entry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Auth(_))
    }
}
