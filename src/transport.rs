//! The process boundary: turning options into curl arguments and running them.

use crate::options::{RequestBody, RequestOptions};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;

/// Captured output of one transport invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOutput {
    /// The raw response stream.
    pub stdout: String,
    /// Diagnostics written by the transport.
    pub stderr: String,
    /// The exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl TransportOutput {
    /// Returns `true` if the transport obtained a response.
    ///
    /// This says nothing about the HTTP status of that response.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that can execute a curl-style argument vector.
///
/// [`CurlTransport`] is the production implementation. Tests and embedders
/// can supply their own to script responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Runs the transport once with `args` and waits for it to exit.
    ///
    /// An `Err` means the transport could not be run at all; a transport that
    /// ran and failed reports that through [`TransportOutput::exit_code`].
    async fn execute(&self, args: &[String]) -> std::io::Result<TransportOutput>;
}

/// Runs the `curl` binary as a child process.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    program: OsString,
}

impl CurlTransport {
    /// Uses `curl` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("curl")
    }

    /// Uses the given program instead of `curl` from `PATH`.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn execute(&self, args: &[String]) -> std::io::Result<TransportOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(TransportOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Builds the curl argument vector for a call.
///
/// Bodies go through `--data-raw`, so a leading `@` is sent as text rather
/// than naming a file to upload. Objects and arrays are sent as JSON with an
/// extra `Content-Type: application/json` header unless the call already sets
/// a content type. Other JSON scalars are sent as their text. Empty bodies
/// (see [`RequestBody::is_empty`]) are left out.
///
/// # Errors
///
/// Returns [`Error::SerializationFailed`] if a structured body cannot be
/// written out as JSON text.
pub fn build_args(url: &str, options: &RequestOptions) -> Result<Vec<String>> {
    let mut args = vec![
        "--silent".to_string(),
        "--show-error".to_string(),
        "--include".to_string(),
        "--request".to_string(),
        options.method.as_str().to_string(),
        "--url".to_string(),
        url.to_string(),
    ];

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.is_empty()) {
        args.push("--proxy".to_string());
        args.push(proxy.to_string());
    }

    for (name, value) in &options.headers {
        args.push("--header".to_string());
        args.push(format!("{}: {}", name, value));
    }

    if let Some(body) = options.body.as_ref().filter(|b| !b.is_empty()) {
        let data = match body {
            RequestBody::Text(text) => text.clone(),
            RequestBody::Json(Value::String(text)) => text.clone(),
            RequestBody::Json(value @ (Value::Object(_) | Value::Array(_))) => {
                if !has_content_type(options) {
                    args.push("--header".to_string());
                    args.push("Content-Type: application/json".to_string());
                }
                serde_json::to_string(value)
                    .map_err(|e| Error::SerializationFailed(e.to_string()))?
            }
            RequestBody::Json(value) => value.to_string(),
        };
        args.push("--data-raw".to_string());
        args.push(data);
    }

    Ok(args)
}

fn has_content_type(options: &RequestOptions) -> bool {
    options
        .headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case("content-type"))
}
