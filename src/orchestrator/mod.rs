use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub mod registry;

pub use registry::ProviderRegistry;

use crate::providers::{ProviderId, Transcript, TranscriptProvider, TranscriptRequest};
use crate::{Result, TranscriptError};

use registry::RegisteredProvider;

/// Default bound on a single availability probe
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Aggregate availability report across all registered providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(rename = "totalProviders")]
    pub total_providers: usize,

    #[serde(rename = "availableCount")]
    pub available_count: usize,

    /// Per-provider availability at probe time
    pub providers: BTreeMap<String, bool>,

    /// True when at least one provider is available
    pub healthy: bool,
}

/// Fallback scheduler over the registered transcript providers
///
/// Each `get_transcript` call computes a deterministic try-order (per-request
/// preferences first, then remaining providers by priority), walks it
/// sequentially, and returns the first successful transcript. Per-provider
/// failures are recovered locally; only the terminal outcome reaches the
/// caller.
///
/// Trials are deliberately sequential, not raced: several upstreams are rate
/// limited, and one cheap deterministic walk costs less than concurrent calls
/// against all of them.
pub struct TranscriptOrchestrator {
    registry: ProviderRegistry,
    probe_timeout: Duration,
}

impl TranscriptOrchestrator {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the bound applied to each availability probe
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Register a provider, replacing any existing one under the same
    /// identifier; the only supported way to add or hot-swap a provider at
    /// runtime
    pub fn register_provider(&self, provider: Arc<dyn TranscriptProvider>) -> Result<()> {
        self.registry.register(provider)
    }

    /// Fetch a transcript, walking providers in try-order until one succeeds
    pub async fn get_transcript(&self, request: &TranscriptRequest) -> Result<Transcript> {
        if !request.has_subject() {
            return Err(TranscriptError::InvalidVideoId);
        }

        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            tracing::warn!("Transcript requested but no providers are registered");
            return Err(TranscriptError::ProviderNotAvailable);
        }

        let try_order = compute_try_order(&snapshot, &request.preferred_providers);

        let mut last_error: Option<TranscriptError> = None;
        let mut attempted = 0usize;

        for provider in try_order {
            let id = provider.provider_id();

            if !self.probe(provider.as_ref()).await {
                tracing::debug!("Skipping unavailable provider: {}", id);
                continue;
            }

            attempted += 1;
            match provider.fetch_transcript(request).await {
                Ok(transcript) => {
                    tracing::info!(
                        "Provider {} produced transcript for video {} ({} segments)",
                        id,
                        transcript.video_id,
                        transcript.segments.len()
                    );
                    return Ok(transcript);
                }
                Err(err) => {
                    // Keep the most recent failure; later providers tend to
                    // produce the more specific diagnostic.
                    tracing::warn!("Provider {} failed: {}", id, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(err),
            None if attempted > 0 => Err(TranscriptError::AllProvidersFailed),
            None => Err(TranscriptError::ProviderNotAvailable),
        }
    }

    /// Fetch a transcript from exactly one named provider, with no fallback
    pub async fn get_transcript_with_provider(
        &self,
        provider_id: &ProviderId,
        request: &TranscriptRequest,
    ) -> Result<Transcript> {
        if !request.has_subject() {
            return Err(TranscriptError::InvalidVideoId);
        }

        let provider = self
            .registry
            .get(provider_id)
            .ok_or(TranscriptError::ProviderNotAvailable)?;

        if !self.probe(provider.as_ref()).await {
            tracing::warn!("Requested provider {} is unavailable", provider_id);
            return Err(TranscriptError::ProviderNotAvailable);
        }

        provider.fetch_transcript(request).await
    }

    /// Identifiers of the providers currently reporting available
    pub async fn available_providers(&self) -> Vec<ProviderId> {
        let snapshot = self.registry.snapshot();

        let probes = snapshot.iter().map(|entry| async {
            let available = self.probe(entry.provider.as_ref()).await;
            (entry.provider.provider_id(), available)
        });

        join_all(probes)
            .await
            .into_iter()
            .filter_map(|(id, available)| available.then_some(id))
            .collect()
    }

    /// Probe every registered provider and summarize availability
    ///
    /// Read-only; availability is never cached between calls, each
    /// `get_transcript` walk re-probes on its own.
    pub async fn health_check(&self) -> HealthReport {
        let snapshot = self.registry.snapshot();

        let probes = snapshot.iter().map(|entry| async {
            let available = self.probe(entry.provider.as_ref()).await;
            (entry.provider.provider_id().to_string(), available)
        });

        let statuses: BTreeMap<String, bool> = join_all(probes).await.into_iter().collect();
        let available_count = statuses.values().filter(|ok| **ok).count();

        HealthReport {
            total_providers: statuses.len(),
            available_count,
            healthy: available_count > 0,
            providers: statuses,
        }
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Availability probe bounded by the configured timeout; a hung probe
    /// counts as unavailable rather than stalling the walk
    async fn probe(&self, provider: &dyn TranscriptProvider) -> bool {
        tokio::time::timeout(self.probe_timeout, provider.is_available())
            .await
            .unwrap_or(false)
    }
}

impl Default for TranscriptOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the provider try-order for one request
///
/// Preferred providers come first in the order given; names not present in
/// the snapshot are silently ignored. Every remaining provider follows in
/// snapshot order, which is already sorted by (priority, registration
/// sequence).
fn compute_try_order(
    snapshot: &[RegisteredProvider],
    preferred: &[ProviderId],
) -> Vec<Arc<dyn TranscriptProvider>> {
    let mut order: Vec<Arc<dyn TranscriptProvider>> = Vec::with_capacity(snapshot.len());
    let mut taken: Vec<ProviderId> = Vec::with_capacity(snapshot.len());

    for id in preferred {
        if taken.contains(id) {
            continue;
        }
        if let Some(entry) = snapshot
            .iter()
            .find(|entry| &entry.provider.provider_id() == id)
        {
            taken.push(id.clone());
            order.push(entry.provider.clone());
        }
    }

    for entry in snapshot {
        let id = entry.provider.provider_id();
        if !taken.contains(&id) {
            taken.push(id);
            order.push(entry.provider.clone());
        }
    }

    order
}
