use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use url::Url;

/// Header marking a request as script-originated so the server answers with a fragment.
pub const AJAX_HEADER: &str = "x-requested-with";
pub const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";
pub const DEFAULT_ENDPOINT: &str = "/catalogue";

/// One listing request, tagged with the controller's sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub query: String,
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub seq: u64,
    pub result: Result<String, FetchError>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid endpoint: {url}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header '{header}', expected 'Key: Value'")]
    InvalidHeader { header: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("listing request task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Something that can produce a listing fragment for a query string.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_fragment(&self, query: &str) -> Result<String, FetchError>;
}

#[derive(Clone, Debug)]
pub struct HttpSourceOptions {
    pub base_url: String,
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub header: Option<String>,
}

impl Default for HttpSourceOptions {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 10,
            proxy: None,
            header: None,
        }
    }
}

/// `GET <base>/catalogue?<query>` over reqwest.
#[derive(Clone, Debug)]
pub struct HttpListingSource {
    client: reqwest::Client,
    endpoint: Url,
}

fn parse_header(raw: &str) -> Result<(String, String), FetchError> {
    let invalid = || FetchError::InvalidHeader {
        header: raw.to_string(),
    };
    let (key, value) = raw.split_once(':').ok_or_else(invalid)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid());
    }
    Ok((key.to_string(), value.trim().to_string()))
}

impl HttpListingSource {
    pub fn new(options: &HttpSourceOptions) -> Result<Self, FetchError> {
        let endpoint = catalogue_endpoint(&options.base_url, &options.endpoint)?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "catalogue-filter/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers.insert(
            AJAX_HEADER,
            reqwest::header::HeaderValue::from_static(AJAX_HEADER_VALUE),
        );
        if let Some(raw) = options.header.as_deref() {
            let (key, value) = parse_header(raw)?;
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                FetchError::InvalidHeader {
                    header: raw.to_string(),
                }
            })?;
            let value = reqwest::header::HeaderValue::from_str(&value).map_err(|_| {
                FetchError::InvalidHeader {
                    header: raw.to_string(),
                }
            })?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds.max(1)));
        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy_cfg = reqwest::Proxy::all(proxy).map_err(|e| FetchError::ProxySetup {
                proxy: proxy.to_string(),
                source: e,
            })?;
            builder = builder.proxy(proxy_cfg);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::HttpClientBuild { source: e })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full request URL; an empty query still leaves the trailing `?`.
    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(Some(query));
        url
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_fragment(&self, query: &str) -> Result<String, FetchError> {
        let url = self.request_url(query);
        trace!(url = %url, "GET listing fragment");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            source: e,
        })
    }
}

pub fn catalogue_endpoint(base_url: &str, endpoint: &str) -> Result<Url, FetchError> {
    let base = Url::parse(base_url.trim()).map_err(|e| FetchError::InvalidEndpoint {
        url: base_url.to_string(),
        source: e,
    })?;
    base.join(endpoint)
        .map_err(|e| FetchError::InvalidEndpoint {
            url: format!("{base_url}{endpoint}"),
            source: e,
        })
}

/// Runs one request on its own task and reports the outcome on `tx`.
/// Nothing cancels an in-flight request; later requests never abort earlier ones.
/// Every request reports exactly once, even when the fetch task panics.
pub fn spawn_fetch(
    source: Arc<dyn ListingSource>,
    request: FetchRequest,
    tx: mpsc::UnboundedSender<FetchCompletion>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let FetchRequest { seq, query } = request;
        let fetch = tokio::spawn(async move { source.fetch_fragment(&query).await });
        let result = match fetch.await {
            Ok(result) => result,
            Err(e) => Err(FetchError::TaskFailed {
                reason: e.to_string(),
            }),
        };
        if tx.send(FetchCompletion { seq, result }).is_err() {
            debug!(seq, "completion receiver dropped");
        }
    })
}
