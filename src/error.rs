//! Error types for curl-backed HTTP calls.
//!
//! Every failure a caller can observe is a variant of [`Error`]. Transport
//! failures are retried by the client and only surface, wrapped in a
//! [`RequestError`], once the retry ceiling is reached. Malformed responses and
//! body decode faults are never retried and surface as their own variants.

use crate::options::RequestOptions;

/// The main error type for curl-backed HTTP calls.
///
/// # Examples
///
/// ```no_run
/// use curlew::{Error, RequestOptions};
///
/// # async fn example() {
/// match curlew::request("https://api.example.com/health", RequestOptions::new()).await {
///     Ok(response) => println!("Status: {}", response.status_code),
///     Err(Error::Request(err)) => {
///         eprintln!("curl failed after {} attempts: {}", err.context.attempts, err.message);
///         eprintln!("  exit code: {:?}", err.context.exit_code);
///     }
///     Err(Error::DeserializationFailed { raw_response, serde_error, .. }) => {
///         eprintln!("Bad JSON ({}): {}", serde_error, raw_response);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The transport kept failing until the retry ceiling was reached.
    ///
    /// The boxed [`RequestError`] holds the final attempt's stderr text along
    /// with everything needed to reconstruct what was attempted.
    #[error(transparent)]
    Request(Box<RequestError>),

    /// The transport output did not have the expected header/body shape.
    ///
    /// This is raised when the header/body separator is missing, or when the
    /// proxy's own response block was expected but absent.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A header line had no `": "` separator.
    #[error("Malformed header line: {line:?}")]
    MalformedHeader {
        /// The offending line, verbatim
        line: String,
    },

    /// The response declared a JSON content type but its body did not parse,
    /// or a body could not be converted into the requested type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The parsed status code (0 when unknown)
        status: u16,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The transport process could not be started or awaited.
    #[error("Failed to run transport: {0}")]
    Spawn(#[from] std::io::Error),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// Returns `true` if this error came from exhausting retries on transport
    /// failures.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::Request(_))
    }

    /// Returns the parsed HTTP status code if this error has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the request context when retries were exhausted.
    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            Error::Request(err) => Some(&err.context),
            _ => None,
        }
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        Error::Request(Box::new(err))
    }
}

/// A terminal transport failure, built once the retry ceiling is hit.
///
/// The `message` is the stderr text of the final attempt; earlier attempts'
/// output is not kept.
#[derive(thiserror::Error, Debug)]
#[error(
    "Request to {} failed after {} of {} attempts: {message}",
    .context.url,
    .context.attempts,
    .context.max_retries
)]
pub struct RequestError {
    /// Stderr text of the last failed attempt
    pub message: String,
    /// What was attempted
    pub context: RequestContext,
}

/// Everything needed to reconstruct a failed call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The effective target URL (after any base URL prefix)
    pub url: String,
    /// The effective options (after merging with the instance config)
    pub options: RequestOptions,
    /// The number of attempts made
    pub attempts: usize,
    /// The configured attempt ceiling
    pub max_retries: usize,
    /// The transport's exit code, `None` if it was killed by a signal
    pub exit_code: Option<i32>,
    /// The argument vector handed to the transport
    pub args: Vec<String>,
}

/// A specialized `Result` type for curl-backed HTTP calls.
pub type Result<T> = std::result::Result<T, Error>;
