//! Client for the Unikraft Cloud REST API.
//!
//! The [`Client`] resolves a metro to its API base URL, authenticates every
//! request with a bearer token and decodes responses in one of two modes:
//!
//! - JSON bodies are unwrapped from the API envelope (see [`ApiResponse`]);
//! - `text/event-stream` bodies are handed to a background
//!   [`spawn_listener`](crate::sse::spawn_listener) task and returned as an
//!   [`EventReceiver`].
//!
//! # Example
//!
//! ```no_run
//! use unikraft_cloud_provider::platform::{Client, ClientConfig};
//!
//! # async fn run() -> Result<(), unikraft_cloud_provider::platform::ClientError> {
//! let client = Client::new(ClientConfig::for_metro("fra0", "my-token"))?;
//! for instance in client.list_instances().await? {
//!     println!("{:?}", instance.name);
//! }
//! # Ok(())
//! # }
//! ```

// Wire models mirror the API field by field.
#[allow(missing_docs)]
mod certificates;
mod error;
#[allow(missing_docs)]
mod instances;
mod response;
#[allow(missing_docs)]
mod service_groups;
#[allow(missing_docs)]
mod volumes;

pub use certificates::{Certificate, CreateCertificateRequest};
pub use error::ClientError;
pub use instances::{
    CreateInstanceRequest, Instance, InstanceServiceGroup, InstanceServiceGroupRequest,
    InstanceVolume, NetworkInterface,
};
pub use response::{ApiErrorDetail, ApiItem, ApiResponse, ItemStatus, ObjectRef, ResponseBody};
pub use service_groups::{CreateServiceGroupRequest, Domain, DomainRequest, Service, ServiceGroup};
pub use volumes::{CreateVolumeRequest, Volume};

pub use reqwest::{Method, Url};

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument, warn};

use crate::sse::{spawn_listener, EventReader, EventReceiver, EVENT_STREAM_CONTENT_TYPE};
use response::take_items;

/// Metro used when none is configured.
pub const DEFAULT_METRO: &str = "fra0";

/// User agent sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("unikraft-cloud-provider/", env!("CARGO_PKG_VERSION"));

const JSON_CONTENT_TYPE: &str = "application/json";
const ACCEPT_ANY: &str = "application/json, text/event-stream";

/// Placeholder for requests without a body.
pub(crate) const NO_BODY: Option<&()> = None;

/// Resolve a metro name or URL to an API base URL.
///
/// - an empty value selects [`DEFAULT_METRO`];
/// - an `http://` or `https://` URL is used as-is, minus any trailing `/`;
/// - anything else is a metro name, e.g. `fra0` becomes
///   `https://api.fra0.kraft.cloud/v1`.
///
/// ```
/// use unikraft_cloud_provider::platform::resolve_metro_url;
///
/// assert_eq!(resolve_metro_url("sin0"), "https://api.sin0.kraft.cloud/v1");
/// assert_eq!(resolve_metro_url("http://localhost:8080/v1/"), "http://localhost:8080/v1");
/// ```
pub fn resolve_metro_url(metro: &str) -> String {
    let metro = metro.trim();
    if metro.starts_with("http://") || metro.starts_with("https://") {
        return metro.trim_end_matches('/').to_string();
    }
    let metro = if metro.is_empty() { DEFAULT_METRO } else { metro };
    format!("https://api.{}.kraft.cloud/v1", metro)
}

/// Settings for building a [`Client`].
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://api.fra0.kraft.cloud/v1`.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Timeout for establishing connections.
    pub connect_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a config for an explicit base URL.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: None,
        }
    }

    /// Create a config for a metro name or URL (see [`resolve_metro_url`]).
    pub fn for_metro(metro: &str, token: impl Into<String>) -> Self {
        Self::new(resolve_metro_url(metro), token)
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Unikraft Cloud API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client.
    ///
    /// Fails when the token is empty or the base URL is not an absolute
    /// `http(s)` URL.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.token.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "an API token is required".to_string(),
            ));
        }
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClientError::InvalidConfig(format!(
                "invalid API base URL '{}': {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "API base URL '{}' is not an http(s) URL",
                config.base_url
            )));
        }

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            token: config.token,
        })
    }

    /// The API base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// URL of an endpoint below the base URL. Each segment is
    /// percent-encoded on its own, so a segment never adds path levels.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: `new` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and decode the response in whichever mode the server
    /// chose.
    pub async fn send<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<ResponseBody<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(method, url, body, ACCEPT_ANY).await?;
        let (_, body) = decode_response(response).await?;
        Ok(body)
    }

    /// Send a request that must answer with a JSON envelope.
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (_, value) = self.json_with_status(method, url, body).await?;
        Ok(value)
    }

    async fn json_with_status<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(u16, T), ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(method, url, body, JSON_CONTENT_TYPE).await?;
        match decode_response(response).await? {
            (status, ResponseBody::Json(value)) => Ok((status, value)),
            (_, ResponseBody::Events(events)) => {
                events.cancel();
                Err(ClientError::UnexpectedContentType {
                    expected: "JSON",
                    actual: EVENT_STREAM_CONTENT_TYPE.to_string(),
                })
            },
        }
    }

    /// Send a request that must answer with an event stream.
    pub async fn request_events<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<EventReceiver, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .execute(method, url, body, EVENT_STREAM_CONTENT_TYPE)
            .await?;
        match decode_response::<Value>(response).await? {
            (_, ResponseBody::Events(events)) => Ok(events),
            (_, ResponseBody::Json(_)) => Err(ClientError::UnexpectedContentType {
                expected: "event stream",
                actual: JSON_CONTENT_TYPE.to_string(),
            }),
        }
    }

    /// Request a collection and return its checked items.
    pub(crate) async fn items<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        collection: &str,
    ) -> Result<Vec<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + ApiItem,
    {
        let (status, data): (u16, Value) = self
            .json_with_status(method, self.endpoint(segments), body)
            .await?;
        take_items(data, collection, status)
    }

    /// Like [`items`](Self::items), expecting at least one item.
    pub(crate) async fn item<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        collection: &str,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + ApiItem,
    {
        self.items(method, segments, body, collection)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::EmptyResponse(format!("no {} returned", collection)))
    }

    #[instrument(skip(self, url, body), fields(url = %url))]
    async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        accept: &str,
    ) -> Result<reqwest::Response, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, accept);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("sending request");
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "request failed");
            ClientError::from(e)
        })?;
        debug!(status = response.status().as_u16(), "received response");
        Ok(response)
    }
}

async fn decode_response<T>(
    response: reqwest::Response,
) -> Result<(u16, ResponseBody<T>), ClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with(EVENT_STREAM_CONTENT_TYPE) {
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let chunks = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other)),
        );
        let reader = EventReader::new(StreamReader::new(chunks));
        return Ok((status.as_u16(), ResponseBody::Events(spawn_listener(reader))));
    }

    let bytes = response.bytes().await?;
    let envelope: ApiResponse<Value> = match serde_json::from_slice(&bytes) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(e.into()),
        Err(_) => {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        },
    };

    let data = envelope.into_data(status.as_u16())?;
    Ok((status.as_u16(), ResponseBody::Json(serde_json::from_value(data)?)))
}
