//! # Curlew - HTTP requests through the curl binary
//!
//! Curlew hands the network exchange to `curl` and takes care of the rest:
//! turning request options into curl arguments, parsing curl's raw output into
//! a status code, headers and a body, retrying failed runs, and building
//! reusable clients that share a base URL, headers and a proxy.
//!
//! ## Quick Start
//!
//! ```no_run
//! use curlew::{InstanceConfig, RequestOptions};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), curlew::Error> {
//!     // One-off request
//!     let response = curlew::request("https://api.example.com/health", RequestOptions::new()).await?;
//!     println!("Status: {}", response.status_code);
//!
//!     // A client bound to a base URL and default headers
//!     let api = curlew::create_instance(
//!         InstanceConfig::new()
//!             .with_base_url("https://api.example.com")
//!             .with_header("Authorization", "Bearer token"),
//!     );
//!
//!     let user = api.get::<User>("/users/123").await?;
//!     println!("User {}: {}", user.body.id, user.body.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Raw response parsing** - Status, lower-cased headers (with every `set-cookie` kept) and JSON or text bodies
//! - **Bounded retries** - Immediate retries driven by a sync or async predicate over curl's stderr
//! - **Client instances** - Base URL, default headers and proxy merged under each call's options
//! - **Rich errors** - Exhausted retries carry the URL, options, attempt counts, exit code and curl arguments
//! - **Pluggable transport** - Swap curl for anything implementing [`Transport`]
//! - **Automatic logging** - Structured logging with `tracing`
//!
//! ## Retries
//!
//! Without a predicate a call makes exactly one attempt. With one, a call makes
//! at most `max_retries` attempts in total:
//!
//! ```no_run
//! use curlew::RequestOptions;
//!
//! # async fn example() -> Result<(), curlew::Error> {
//! let options = RequestOptions::new()
//!     .with_max_retries(5)
//!     .with_retry_if(|stderr| stderr.contains("Could not resolve host"));
//!
//! let response = curlew::request("https://flaky.example.com/", options).await?;
//! println!("Took {} attempts", response.attempts);
//! # Ok(())
//! # }
//! ```

mod attempt;
mod client;
pub mod config;
mod error;
pub mod options;
mod parser;
mod response;
pub mod retry;
pub mod transport;

pub use attempt::TransportFailure;
pub use client::{Client, ClientBuilder};
pub use config::InstanceConfig;
pub use error::{Error, RequestContext, RequestError, Result};
pub use options::{RequestBody, RequestOptions};
pub use parser::parse_response;
pub use response::{Response, ResponseBody, ResponseHeaders};
pub use retry::RetryPredicate;
pub use transport::{CurlTransport, Transport, TransportOutput};

/// Makes a one-off request with no instance configuration.
///
/// See [`Client::request`].
pub async fn request(url: &str, options: RequestOptions) -> Result<Response<ResponseBody>> {
    Client::new().request(url, options).await
}

/// Creates a client bound to `config`.
///
/// The configuration is fixed for the life of the client; calls made through
/// it never change it.
pub fn create_instance(config: InstanceConfig) -> Client {
    Client::with_config(config)
}
