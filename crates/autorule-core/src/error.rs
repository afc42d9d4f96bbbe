//! Error types for autorule.

use std::fmt;

use thiserror::Error;

/// Path to the declaration an error came from, outermost segment first
/// (e.g. `component 2 then[1]`). Renders as an empty string when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location(Vec<String>);

impl Location {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push_front(&mut self, segment: String) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "{}: ", self.0.join(" "))
    }
}

/// Main error type for autorule operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required build-time argument is absent or empty
    #[error("{at}{kind} requires a non-empty '{argument}' arg")]
    MissingArgument {
        at: Location,
        kind: String,
        argument: String,
    },

    /// An action kind needs environment-supplied secrets that are not set
    #[error("{at}{kind} requires {missing} (set JIRA_WEBHOOK_USER / JIRA_WEBHOOK_TOKEN)")]
    MissingCredentials {
        at: Location,
        kind: String,
        missing: String,
    },

    /// A type tag or kind name is not in the catalog
    #[error("{at}unrecognized {what}: {tag:?}")]
    UnrecognizedType {
        at: Location,
        what: String,
        tag: String,
    },

    /// JSON that does not decode into the expected shape
    #[error("{at}malformed payload: {message}")]
    MalformedPayload { at: Location, message: String },

    /// The remote API answered with a non-success status
    #[error("API error: {status} - {message}")]
    RemoteRejected { status: u16, message: String },

    /// Transport failure or timeout reaching the remote API
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A remote write went through but a later step of the same apply failed
    #[error("rule {rule_id} was written but {step} failed; re-apply to reconcile: {source}")]
    Incomplete {
        rule_id: String,
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn missing_argument(kind: impl Into<String>, argument: impl Into<String>) -> Self {
        Error::MissingArgument {
            at: Location::default(),
            kind: kind.into(),
            argument: argument.into(),
        }
    }

    pub fn missing_credentials(kind: impl Into<String>, missing: impl Into<String>) -> Self {
        Error::MissingCredentials {
            at: Location::default(),
            kind: kind.into(),
            missing: missing.into(),
        }
    }

    pub fn unrecognized(what: impl Into<String>, tag: impl Into<String>) -> Self {
        Error::UnrecognizedType {
            at: Location::default(),
            what: what.into(),
            tag: tag.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedPayload {
            at: Location::default(),
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Error::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Prefix the location of a local build/parse error with `segment`.
    ///
    /// Remote and configuration errors are returned unchanged.
    pub fn at(mut self, segment: impl Into<String>) -> Self {
        match &mut self {
            Error::MissingArgument { at, .. }
            | Error::MissingCredentials { at, .. }
            | Error::UnrecognizedType { at, .. }
            | Error::MalformedPayload { at, .. } => at.push_front(segment.into()),
            _ => {}
        }
        self
    }

    /// True for errors detected locally before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::MissingArgument { .. }
                | Error::MissingCredentials { .. }
                | Error::UnrecognizedType { .. }
                | Error::MalformedPayload { .. }
        )
    }

    /// HTTP status of a remote rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteRejected { status, .. } => Some(*status),
            Error::Incomplete { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::malformed(e.to_string())
    }
}

/// Result type alias for autorule operations.
pub type Result<T> = std::result::Result<T, Error>;
