//! A single transport invocation and the parse of its output.

use crate::parser::parse_response;
use crate::response::{Response, ResponseBody};
use crate::transport::Transport;
use crate::Error;

/// The failure signal of one unclean transport run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Everything the transport wrote to stderr.
    pub stderr: String,
    /// The exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Why an attempt did not produce a response.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// The transport ran and reported failure. Eligible for retry.
    Transport(TransportFailure),
    /// Anything else: the transport could not run, or its output was
    /// unusable. Never retried.
    Fatal(Error),
}

/// Runs the transport once and parses a clean result.
pub(crate) async fn execute_attempt(
    transport: &dyn Transport,
    args: &[String],
    proxied: bool,
    attempt: usize,
) -> Result<Response<ResponseBody>, AttemptError> {
    tracing::debug!(attempt = attempt, args = ?args, "Executing transport");

    let output = transport
        .execute(args)
        .await
        .map_err(|e| AttemptError::Fatal(Error::Spawn(e)))?;

    if !output.is_success() {
        return Err(AttemptError::Transport(TransportFailure {
            stderr: output.stderr,
            exit_code: output.exit_code,
        }));
    }

    parse_response(&output.stdout, proxied).map_err(AttemptError::Fatal)
}
