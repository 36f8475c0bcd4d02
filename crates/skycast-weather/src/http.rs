//! Coordinated HTTP GETs.
//!
//! Each call registers with the [`RequestCoordinator`] under its kind,
//! threads the slot's cancellation token through the transport, and checks
//! that its sequence number is still live before handing anything back.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use skycast_core::{
    BeginOptions, NetworkConfig, NetworkError, ReqwestErrorExt, RequestCoordinator, RequestKind,
    RequestStatus, RequestTicket,
};
use url::Url;

use crate::retry::{with_retry, Attempted, RetryConfig};

const USER_AGENT: &str = concat!("Skycast/", env!("CARGO_PKG_VERSION"));

/// Outcome of a coordinated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// The request is still the live one for its kind; safe to apply.
    Current(T),
    /// Superseded or cancelled; drop it.
    Stale,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Current(value) => Fetched::Current(f(value)),
            Fetched::Stale => Fetched::Stale,
        }
    }

    pub fn into_current(self) -> Option<T> {
        match self {
            Fetched::Current(value) => Some(value),
            Fetched::Stale => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Fetched::Stale)
    }
}

/// Shared transport: one `reqwest::Client`, the coordinator and the retry policy.
#[derive(Debug, Clone)]
pub struct HttpContext {
    client: Client,
    coordinator: Arc<RequestCoordinator>,
    retry: RetryConfig,
}

impl HttpContext {
    pub fn new(
        network: &NetworkConfig,
        coordinator: Arc<RequestCoordinator>,
    ) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(network.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ReqwestErrorExt::into_network_error)?;

        Ok(Self {
            client,
            coordinator,
            retry: RetryConfig::from(network),
        })
    }

    pub fn with_client(
        client: Client,
        coordinator: Arc<RequestCoordinator>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            coordinator,
            retry,
        }
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    /// Still the live generation and not cancelled. A manual cancel leaves
    /// `seq` untouched, so both checks are needed.
    fn is_live(&self, ticket: &RequestTicket) -> bool {
        !ticket.token.is_cancelled()
            && self.coordinator.is_request_current(ticket.kind, ticket.seq)
    }

    /// GET `url` as the new live request of `kind`.
    ///
    /// `Current(None)` means upstream failed (already logged and recorded in
    /// the slot); `Stale` means a newer request or a cancellation won.
    pub(crate) async fn get_json(
        &self,
        kind: RequestKind,
        url: Url,
        meta: Option<Value>,
    ) -> Fetched<Option<Value>> {
        let ticket = self.coordinator.begin_request(
            kind,
            BeginOptions {
                abort_previous: true,
                meta,
            },
        );
        tracing::debug!("{} request #{}: GET {}", kind, ticket.seq, url);

        let outcome = match with_retry(&self.retry, &ticket.token, || {
            self.client.get(url.clone()).send()
        })
        .await
        {
            Attempted::Cancelled => {
                tracing::debug!("{} request #{} cancelled in flight", kind, ticket.seq);
                return Fetched::Stale;
            }
            Attempted::Done(Err(e)) => Err(e.into_network_error()),
            Attempted::Done(Ok(response)) if !response.status().is_success() => {
                let status = response.status();
                Err(NetworkError::ServerError {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unknown").to_string(),
                })
            }
            Attempted::Done(Ok(response)) => {
                tokio::select! {
                    biased;
                    _ = ticket.token.cancelled() => return Fetched::Stale,
                    body = response.json::<Value>() => body.map_err(ReqwestErrorExt::into_network_error),
                }
            }
        };

        if !self.is_live(&ticket) {
            tracing::debug!("Discarding stale {} response #{}", kind, ticket.seq);
            return Fetched::Stale;
        }

        match outcome {
            Ok(body) => {
                self.coordinator
                    .end_request(kind, ticket.seq, RequestStatus::Success, None);
                Fetched::Current(Some(body))
            }
            Err(e) => {
                tracing::warn!("{} request failed: {}", kind, e);
                self.coordinator.end_request(
                    kind,
                    ticket.seq,
                    RequestStatus::Error,
                    Some(e.to_string()),
                );
                Fetched::Current(None)
            }
        }
    }
}

/// Join a base URL and a path, then append query pairs.
pub(crate) fn endpoint(base: &str, path: &str, query: &[(&str, String)]) -> Option<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    match Url::parse_with_params(&raw, query) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Invalid endpoint {}: {}", raw, e);
            None
        }
    }
}
