//! HTTP client for the hiddb index service.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::metrics;
use crate::request::ApiRequest;
use crate::response::{self, ApiResponse};
use crate::types::{IndexId, UserId};

/// The service operations, as seen by callers that sequence them.
///
/// Object-safe so drivers can hold a `&dyn IndexService`.
#[async_trait]
pub trait IndexService: Send + Sync {
    async fn create_index(&self, id: IndexId, k: usize, dimension: usize) -> Result<ApiResponse>;

    async fn insert_vector(
        &self,
        index_id: IndexId,
        id_user: UserId,
        vector: &[f64],
    ) -> Result<ApiResponse>;

    async fn search(&self, index_id: IndexId, vector: &[f64]) -> Result<ApiResponse>;

    async fn list_indices(&self) -> Result<ApiResponse>;

    async fn get_index_info(&self, id: IndexId) -> Result<ApiResponse>;

    async fn delete_index(&self, id: IndexId) -> Result<ApiResponse>;

    async fn check_health(&self) -> Result<ApiResponse>;
}

const USER_AGENT: &str = concat!("hiddb-client/", env!("CARGO_PKG_VERSION"));

/// A builder failure is local setup, never an exchange with the service.
fn build_http(builder: reqwest::ClientBuilder) -> Result<reqwest::Client> {
    builder
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))
}

/// reqwest-backed [`IndexService`].
///
/// One `reqwest::Client` is shared by all calls. Calls are issued in the
/// order the caller awaits them.
#[derive(Debug, Clone)]
pub struct IndexClient {
    base_url: String,
    http: reqwest::Client,
}

impl IndexClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = build_http(reqwest::Client::builder().user_agent(USER_AGENT))?;
        Self::with_http_client(base_url, http)
    }

    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base url cannot carry paths: {base_url}"
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request`, log the exchange, and validate the status.
    #[instrument(skip(self, request), fields(operation = %request.operation, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let op = request.operation.as_str();
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.http.request(request.method.clone(), &url);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let timer = metrics::REQUEST_DURATION
            .with_label_values(&[op])
            .start_timer();
        let started = Instant::now();

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                timer.observe_duration();
                metrics::REQUESTS_TOTAL
                    .with_label_values(&[op, metrics::TRANSPORT_ERROR])
                    .inc();
                warn!(url = %url, error = %e, "request failed");
                return Err(ClientError::Transport(e));
            }
        };

        let status = resp.status();
        info!(
            method = %request.method,
            url = %resp.url(),
            status = %status,
            version = ?resp.version(),
            headers = ?resp.headers(),
            "response"
        );

        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                timer.observe_duration();
                metrics::REQUESTS_TOTAL
                    .with_label_values(&[op, metrics::TRANSPORT_ERROR])
                    .inc();
                warn!(url = %url, error = %e, "failed to read response body");
                return Err(ClientError::Transport(e));
            }
        };
        timer.observe_duration();
        metrics::REQUESTS_TOTAL
            .with_label_values(&[op, status.as_str()])
            .inc();

        info!(body = %body, "response body");
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "exchange complete");

        response::validate(request.operation, status, body)
    }
}

#[async_trait]
impl IndexService for IndexClient {
    async fn create_index(&self, id: IndexId, k: usize, dimension: usize) -> Result<ApiResponse> {
        self.execute(ApiRequest::create_index(id, k, dimension)?).await
    }

    async fn insert_vector(
        &self,
        index_id: IndexId,
        id_user: UserId,
        vector: &[f64],
    ) -> Result<ApiResponse> {
        self.execute(ApiRequest::insert_vector(index_id, id_user, vector)?)
            .await
    }

    async fn search(&self, index_id: IndexId, vector: &[f64]) -> Result<ApiResponse> {
        self.execute(ApiRequest::search(index_id, vector)?).await
    }

    async fn list_indices(&self) -> Result<ApiResponse> {
        self.execute(ApiRequest::list_indices()).await
    }

    async fn get_index_info(&self, id: IndexId) -> Result<ApiResponse> {
        self.execute(ApiRequest::get_index_info(id)).await
    }

    async fn delete_index(&self, id: IndexId) -> Result<ApiResponse> {
        self.execute(ApiRequest::delete_index(id)).await
    }

    async fn check_health(&self) -> Result<ApiResponse> {
        self.execute(ApiRequest::health()).await
    }
}
