use std::time::Duration;

use thiserror::Error;

use crate::job::response::JobError;

/// Errors produced by the auth and job subsystems.
///
/// Configuration problems (`InvalidCredential`, `InvalidDelimiter`,
/// `MissingSession`, `MissingJobId`) are detected before any network call.
/// Structured server rejections keep the decoded [`JobError`] intact so
/// callers can tell them apart from transport failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "invalid credential shape: expected username, password, client id and client secret \
         (credential flow) or a client id alone (user flow)"
    )]
    InvalidCredential,

    #[error("invalid delimiter: {0:?}")]
    InvalidDelimiter(String),

    #[error("invalid login url")]
    InvalidBaseUrl(#[source] url::ParseError),

    #[error("session info not valid, missing the following fields: {0}")]
    MissingSession(String),

    #[error("server response timed out after {}s", .0.as_secs())]
    AuthTimeout(Duration),

    #[error("could not open browser for authorization")]
    BrowserOpen(#[source] std::io::Error),

    #[error("callback listener error")]
    Listener(#[source] std::io::Error),

    #[error("callback channel closed before a redirect was received")]
    ListenerClosed,

    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("{op}: request failed")]
    Http {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{op}: could not parse server response")]
    Parse {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op}: server responded with {status}, error: {error}")]
    Rejected {
        op: &'static str,
        status: u16,
        error: JobError,
    },

    #[error("{op}: server responded with unexpected status {status}")]
    UnexpectedStatus { op: &'static str, status: u16 },

    #[error("delete: server responded with {status}, expected 204")]
    DeleteFailed { status: u16 },

    #[error("job has no id, it must be created first")]
    MissingJobId,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for rejections the server described with a structured error body.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Rejected { .. })
    }

    /// The structured server error, if this is a rejection.
    pub fn job_error(&self) -> Option<&JobError> {
        match self {
            Error::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }
}
