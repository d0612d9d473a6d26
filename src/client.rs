//! Client instances bound to a configuration.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] or [`create_instance`](crate::create_instance) to
//! configure one.

use crate::{
    attempt::execute_attempt,
    config::InstanceConfig,
    error::{RequestContext, RequestError},
    options::RequestOptions,
    response::{Response, ResponseBody},
    retry::{self, Stopped},
    transport::{build_args, CurlTransport, Transport},
    Error, Result,
};
use http::{HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Instant;

/// An HTTP client that runs every request through curl.
///
/// A client holds an immutable [`InstanceConfig`]. Each call layers its own
/// [`RequestOptions`] over that configuration without changing it, so one
/// client can be cloned and used from many tasks at once.
///
/// # Examples
///
/// ```no_run
/// use curlew::{Client, RequestOptions};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), curlew::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .default_header("User-Agent", "my-app/1.0")?
///     .build();
///
/// // GET request
/// let user = client.get::<User>("/users/123").await?;
/// println!("User: {}", user.body.name);
///
/// // POST request with retries on connection failures
/// let options = RequestOptions::new()
///     .with_max_retries(5)
///     .with_retry_if(|stderr| stderr.contains("Failed to connect"));
/// let created = client
///     .request("/users", options.with_method(http::Method::POST).with_json(&CreateUser {
///         name: "Alice".to_string(),
///     })?)
///     .await?;
/// println!("Created: {}", created.status_code);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: InstanceConfig,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client with no instance configuration, using `curl` from
    /// `PATH`.
    pub fn new() -> Self {
        Self::with_config(InstanceConfig::default())
    }

    /// Creates a client bound to `config`, using `curl` from `PATH`.
    pub fn with_config(config: InstanceConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport: Arc::new(CurlTransport::new()),
            }),
        }
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &InstanceConfig {
        &self.inner.config
    }

    /// Creates a new client whose configuration is this one's with `overlay`
    /// layered on top. The transport is shared; this client is unchanged.
    pub fn derive(&self, overlay: &InstanceConfig) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                config: self.inner.config.merged_with(overlay),
                transport: self.inner.transport.clone(),
            }),
        }
    }

    /// Makes a request.
    ///
    /// The URL is prefixed with the base URL, the options are merged over the
    /// instance configuration, and attempts are made until one succeeds or the
    /// retry ceiling is reached.
    ///
    /// # Errors
    ///
    /// * [`Error::Request`] once transport failures exhaust the retries
    /// * [`Error::MalformedResponse`] / [`Error::MalformedHeader`] if curl's
    ///   output cannot be read
    /// * [`Error::DeserializationFailed`] if a JSON body does not parse
    /// * [`Error::Spawn`] if curl cannot be started
    pub async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response<ResponseBody>> {
        let url = self.inner.config.resolve_url(url);
        let options = self.inner.config.merge_into(options);
        let args = build_args(&url, &options)?;
        let proxied = options.proxy.as_deref().is_some_and(|p| !p.is_empty());

        tracing::debug!(
            method = %options.method,
            url = %url,
            max_retries = options.max_retries,
            proxied = proxied,
            "Starting request"
        );

        let start_time = Instant::now();
        let transport = self.inner.transport.as_ref();
        let arg_slice = args.as_slice();

        let result = retry::run(
            options.max_retries,
            options.should_retry.as_deref(),
            move |attempt| execute_attempt(transport, arg_slice, proxied, attempt),
        )
        .await;

        match result {
            Ok((mut response, attempts)) => {
                response.attempts = attempts;
                response.latency = start_time.elapsed();

                tracing::info!(
                    status = response.status_code,
                    latency_ms = response.latency.as_millis(),
                    attempts = attempts,
                    "Received HTTP response"
                );

                Ok(response)
            }
            Err(Stopped::Fatal(e)) => Err(e),
            Err(Stopped::Exhausted(state)) => {
                let (message, exit_code) = state
                    .last_failure
                    .map(|f| (f.stderr, f.exit_code))
                    .unwrap_or_default();

                tracing::error!(
                    url = %url,
                    attempts = state.failures,
                    exit_code = ?exit_code,
                    "Request failed"
                );

                Err(RequestError {
                    message,
                    context: RequestContext {
                        url,
                        attempts: state.failures,
                        max_retries: state.max_retries,
                        exit_code,
                        args,
                        options,
                    },
                }
                .into())
            }
        }
    }

    /// Makes a request and converts the body into `Res`.
    pub async fn request_as<Res>(&self, url: &str, options: RequestOptions) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.request(url, options).await?.deserialize()
    }

    /// Makes a GET request to the specified URL.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use curlew::Client;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct User { name: String }
    ///
    /// # async fn example() -> Result<(), curlew::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")
    ///     .build();
    ///
    /// let user: curlew::Response<User> = client.get("/users/123").await?;
    /// println!("User: {}", user.body.name);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<Res>(&self, url: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.request_as(url, RequestOptions::new()).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<Req, Res>(&self, url: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send_json(Method::POST, url, body).await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<Req, Res>(&self, url: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send_json(Method::PUT, url, body).await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch<Req, Res>(&self, url: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send_json(Method::PATCH, url, body).await
    }

    /// Makes a DELETE request. The body is returned undecoded since many
    /// servers answer with an empty one.
    pub async fn delete(&self, url: &str) -> Result<Response<ResponseBody>> {
        self.request(url, RequestOptions::new().with_method(Method::DELETE))
            .await
    }

    async fn send_json<Req, Res>(
        &self,
        method: Method,
        url: &str,
        body: &Req,
    ) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let options = RequestOptions::new().with_method(method).with_json(body)?;
        self.request_as(url, options).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("transport", &"<transport>")
            .finish()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```
/// use curlew::ClientBuilder;
///
/// # fn example() -> Result<(), curlew::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .default_header("User-Agent", "my-app/1.0")?
///     .proxy("http://proxy.internal:3128")
///     .curl_program("/usr/local/bin/curl")
///     .build();
///
/// assert_eq!(client.config().proxy.as_deref(), Some("http://proxy.internal:3128"));
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: InstanceConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            config: InstanceConfig::default(),
            transport: None,
        }
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: InstanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the prefix for every request URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.config
            .headers
            .insert(name.as_ref().to_string(), value.as_ref().to_string());
        Ok(self)
    }

    /// Sets the default proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Runs the given program instead of `curl` from `PATH`.
    pub fn curl_program(mut self, program: impl Into<OsString>) -> Self {
        self.transport = Some(Arc::new(CurlTransport::with_program(program)));
        self
    }

    /// Uses a custom transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    pub fn build(self) -> Client {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(CurlTransport::new()));

        Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
