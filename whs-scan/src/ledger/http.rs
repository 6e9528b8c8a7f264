//! HTTP ledger client
//!
//! Talks to the ledger REST service:
//! - `POST /events` and `POST /events/{id}/undo`
//! - `GET /locations`, `GET /locations/{id}/occupancy`
//! - `GET /boxes/{box_id}`, `GET /stats/today`
//!
//! No automatic retries: a failed submission is reported and the operator
//! rescans, which mints a fresh idempotency token.

use super::{Ledger, LedgerError};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use whs_common::api::{
    BoxDetails, EventCreate, LedgerEvent, Location, LocationOccupancy, StatsToday, UndoResult,
};

/// Default timeout for ledger requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("whs-scan/", env!("CARGO_PKG_VERSION"));

/// Ledger client over HTTP/JSON
#[derive(Clone)]
pub struct HttpLedger {
    /// HTTP client for API requests
    http_client: Client,
    /// Base URL; request paths are appended as encoded segments
    base_url: Url,
}

impl HttpLedger {
    /// Create a client for `base_url` with the given request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| LedgerError::Transport(format!("Invalid ledger URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LedgerError::Transport(format!(
                "Invalid ledger URL: {}",
                base_url
            )));
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Base URL plus `segments`, each percent-encoded
    ///
    /// Scanned identifiers go through here, so a `/` or `?` in a label
    /// stays inside its segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, LedgerError> {
        let url = self.url(segments);
        debug!(url = %url, "GET ledger");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}

fn transport_error(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Transport(format!("request timed out: {}", e))
    } else {
        LedgerError::Transport(e.to_string())
    }
}

/// Map a ledger response to `T` or a `LedgerError`
///
/// The ledger reports failures as `{"detail": "..."}`; that text becomes
/// the operator message. Structured validation details fall back to the
/// raw body.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, LedgerError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let detail = extract_detail(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            body.clone()
        }
    });

    if status == StatusCode::NOT_FOUND {
        Err(LedgerError::NotFound(detail))
    } else {
        Err(LedgerError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

/// Pull a string `detail` field out of an error body
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .map(str::to_string)
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn submit_event(&self, request: &EventCreate) -> Result<LedgerEvent, LedgerError> {
        debug!(
            client_event_id = %request.client_event_id,
            event_type = %request.event_type,
            box_id = %request.box_id,
            "Submitting event to ledger"
        );
        let response = self
            .http_client
            .post(self.url(&["events"]))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn undo_event(&self, event_id: Uuid) -> Result<UndoResult, LedgerError> {
        let response = self
            .http_client
            .post(self.url(&["events", &event_id.to_string(), "undo"]))
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn resolve_location(&self, code: &str) -> Result<Option<Location>, LedgerError> {
        let locations: Vec<Location> = self.get(&["locations"]).await?;
        Ok(locations.into_iter().find(|loc| loc.location_code == code))
    }

    async fn get_occupancy(&self, location_id: Uuid) -> Result<LocationOccupancy, LedgerError> {
        self.get(&["locations", &location_id.to_string(), "occupancy"])
            .await
    }

    async fn get_box_details(&self, box_id: &str) -> Result<Option<BoxDetails>, LedgerError> {
        match self.get(&["boxes", box_id]).await {
            Ok(details) => Ok(Some(details)),
            Err(LedgerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn stats_today(&self) -> Result<StatsToday, LedgerError> {
        self.get(&["stats", "today"]).await
    }
}
