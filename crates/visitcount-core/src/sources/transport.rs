//! Outbound GET seam for the resolver.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::FailureReason;

/// Raw answer from a count endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one bounded GET per call. Implementations must not retry.
pub trait CountTransport: Send + Sync {
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<TransportResponse, FailureReason>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CountTransport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FailureReason> {
        let timeout_ms = timeout.as_millis() as u64;
        let request = async {
            let resp = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>(TransportResponse { status, body })
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) if e.is_timeout() => Err(FailureReason::Timeout(timeout_ms)),
            Ok(Err(e)) => Err(FailureReason::Transport(e.to_string())),
            Err(_) => Err(FailureReason::Timeout(timeout_ms)),
        }
    }
}
