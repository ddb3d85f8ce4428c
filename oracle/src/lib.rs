//! Client for the remote combination oracle.
//!
//! # Architecture
//!
//! - [`Oracle`] - The seam the engine talks to. Three calls: a page of the
//!   element listing, a single element by id, and a combine request.
//! - [`HttpOracle`] - The production implementation over `reqwest`.
//! - [`retry`] - Backoff policy applied to idempotent reads. Combine requests
//!   are sent exactly once: a retried combine could mint a second discovery on
//!   the server.
//!
//! # Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | listing | `GET {base}/elements/?skip=&limit=&language=` → `{"elements": [...]}` |
//! | by id | `GET {base}/elements/{id}` → element |
//! | combine | `POST {base}/elements/combine` → combine reply or `{"detail": ...}` |
//!
//! # Error Handling
//!
//! Every failure is an [`OracleError`]. The engine treats all of them as
//! transport failures and degrades to local fallbacks; nothing here panics or
//! retries on behalf of the caller beyond the read policy.

pub mod retry;
mod wire;

pub use wire::{CombineReply, CombineRequest};

use std::future::Future;
use std::time::Duration;

use alchemist_types::{Element, ElementId, Language};
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use thiserror::Error;

use retry::{RetryConfig, RetryOutcome};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unreachable after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("oracle returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed oracle response: {0}")]
    Decode(String),
    #[error("invalid oracle base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl OracleError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// The remote oracle as seen by the engine.
///
/// Implementations must be cheap to share behind an `Arc`; every call may run
/// on a spawned task.
pub trait Oracle: Send + Sync + 'static {
    /// One page of the element listing for `language`.
    fn list_elements(
        &self,
        language: &Language,
        skip: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Element>, OracleError>> + Send;

    fn get_element(
        &self,
        language: &Language,
        id: ElementId,
    ) -> impl Future<Output = Result<Element, OracleError>> + Send;

    /// Ask the oracle to combine two elements. Never retried.
    fn combine(
        &self,
        request: &CombineRequest,
    ) -> impl Future<Output = Result<CombineReply, OracleError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Policy for listing and by-id reads.
    pub read_retry: RetryConfig,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            read_retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: Url,
    read_retry: RetryConfig,
}

impl HttpOracle {
    pub fn new(settings: OracleSettings) -> Result<Self, OracleError> {
        let base_url = parse_base_url(&settings.base_url)?;
        let client = base_client_builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(OracleError::Client)?;

        Ok(Self {
            client,
            base_url,
            read_retry: settings.read_retry,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `parse_base_url` only admits http(s) URLs, which always have a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn parse_base_url(raw: &str) -> Result<Url, OracleError> {
    let invalid = |reason: &str| OracleError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment"));
    }
    Ok(url)
}

fn base_client_builder() -> reqwest::ClientBuilder {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("alchemist/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

async fn decode_outcome<T: DeserializeOwned>(outcome: RetryOutcome) -> Result<T, OracleError> {
    let response = match outcome {
        RetryOutcome::Success(response) => response,
        RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            return Err(OracleError::Status {
                status,
                detail: wire::error_detail(&body),
            });
        }
        RetryOutcome::ConnectionError { attempts, source } => {
            return Err(OracleError::Transport { attempts, source });
        }
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|source| OracleError::Transport {
            attempts: 1,
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|e| OracleError::Decode(e.to_string()))
}

impl Oracle for HttpOracle {
    async fn list_elements(
        &self,
        language: &Language,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Element>, OracleError> {
        let mut url = self.endpoint(&["elements", ""]);
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("language", language.as_str());

        tracing::debug!(%url, "Fetching element page");
        let outcome = retry::send_with_retry(|| self.client.get(url.clone()), &self.read_retry).await;
        let page: wire::ElementPage = decode_outcome(outcome).await?;
        Ok(page.elements)
    }

    async fn get_element(&self, language: &Language, id: ElementId) -> Result<Element, OracleError> {
        let mut url = self.endpoint(&["elements", &id.to_string()]);
        url.query_pairs_mut().append_pair("language", language.as_str());

        tracing::debug!(%url, "Fetching element");
        let outcome = retry::send_with_retry(|| self.client.get(url.clone()), &self.read_retry).await;
        decode_outcome(outcome).await
    }

    async fn combine(&self, request: &CombineRequest) -> Result<CombineReply, OracleError> {
        let url = self.endpoint(&["elements", "combine"]);

        tracing::debug!(
            element1 = %request.element1_id,
            element2 = %request.element2_id,
            language = %request.language,
            "Sending combine request"
        );
        let outcome = retry::send_with_retry(
            || self.client.post(url.clone()).json(request),
            &RetryConfig::single_attempt(),
        )
        .await;
        decode_outcome(outcome).await
    }
}
