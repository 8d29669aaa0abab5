//! Ordered, sequential resolution over the candidate chain.
//!
//! Candidates are attempted strictly one after another. The first
//! well-formed integer short-circuits the chain; otherwise every failure is
//! recorded and the call ends in [`ResolveError::AllSourcesExhausted`].

use std::time::Duration;

use serde_json::Value;

use super::transport::CountTransport;
use super::{candidates, CounterSource, Operation, Proxy};
use crate::error::{CandidateFailure, FailureReason, ResolveError};
use crate::key::CounterKey;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Value returned by a successful candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: u64,
    pub candidate: String,
}

pub struct SourceChainResolver<T> {
    transport: T,
    sources: Vec<CounterSource>,
    proxies: Vec<Proxy>,
    timeout: Duration,
}

impl<T: CountTransport> SourceChainResolver<T> {
    pub fn new(transport: T, sources: Vec<CounterSource>, proxies: Vec<Proxy>) -> Self {
        Self {
            transport,
            sources,
            proxies,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sources(&self) -> &[CounterSource] {
        &self.sources
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `op` for `key`, returning only the count.
    pub async fn resolve(&self, op: Operation, key: &CounterKey) -> Result<u64, ResolveError> {
        self.resolve_detailed(op, key).await.map(|r| r.value)
    }

    /// Resolve `op` for `key`, also reporting which candidate answered.
    pub async fn resolve_detailed(
        &self,
        op: Operation,
        key: &CounterKey,
    ) -> Result<Resolved, ResolveError> {
        let mut failures = Vec::new();

        for candidate in candidates(&self.sources, &self.proxies) {
            let label = candidate.label();
            let url = candidate.url_for(op, key);
            tracing::debug!(candidate = %label, op = op.as_str(), %url, "trying count source");

            let outcome = match self.transport.get(&url, self.timeout).await {
                Ok(resp) if !resp.is_success() => Err(FailureReason::Status(resp.status)),
                Ok(resp) => parse_count(&resp.body, &candidate.source.fields),
                Err(reason) => Err(reason),
            };

            match outcome {
                Ok(value) => {
                    tracing::info!(candidate = %label, op = op.as_str(), %key, value, "count resolved");
                    return Ok(Resolved {
                        value,
                        candidate: label,
                    });
                }
                Err(reason) => {
                    tracing::debug!(candidate = %label, %reason, "count source failed");
                    failures.push(CandidateFailure {
                        candidate: label,
                        reason,
                    });
                }
            }
        }

        Err(ResolveError::AllSourcesExhausted { failures })
    }
}

/// Extract the count from a response body.
///
/// The body must be a JSON object. The first accepted field present decides
/// the outcome: a non-negative integral number is the count, anything else is
/// malformed.
pub fn parse_count(body: &str, fields: &[String]) -> Result<u64, FailureReason> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| FailureReason::Malformed(format!("invalid JSON: {e}")))?;
    let obj = json
        .as_object()
        .ok_or_else(|| FailureReason::Malformed("expected a JSON object".into()))?;

    let (field, value) = fields
        .iter()
        .find_map(|f| obj.get(f).map(|v| (f, v)))
        .ok_or_else(|| {
            FailureReason::Malformed(format!("none of [{}] present", fields.join(", ")))
        })?;

    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(FailureReason::Malformed(format!(
            "field '{field}' is not a non-negative integer: {value}"
        ))),
    }
}
