use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::providers::{ProviderId, TranscriptProvider};
use crate::{Result, TranscriptError};

/// One registered provider plus its registration sequence number
///
/// The sequence number is the tie-break when two providers share a priority:
/// ordering must be deterministic and never depend on map iteration order.
#[derive(Clone)]
pub(crate) struct RegisteredProvider {
    pub provider: Arc<dyn TranscriptProvider>,
    pub seq: u64,
}

#[derive(Default)]
struct RegistryInner {
    providers: HashMap<ProviderId, RegisteredProvider>,
    next_seq: u64,
}

/// Owned mapping from provider identifier to adapter instance
///
/// Concurrent transcript requests take read access to snapshot the set of
/// providers; registration takes write access. The lock is never held across
/// an await point, so a snapshot is taken first and providers are probed and
/// called from the snapshot.
#[derive(Default)]
pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a provider, replacing any existing entry under the same
    /// identifier (last registration wins)
    pub fn register(&self, provider: Arc<dyn TranscriptProvider>) -> Result<()> {
        let id = provider.provider_id();
        if id.is_empty() {
            return Err(TranscriptError::Provider {
                provider: id,
                source: anyhow::anyhow!("provider identifier must not be empty"),
            });
        }

        let mut inner = self.inner.write().expect("registry lock poisoned");
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let replaced = inner
            .providers
            .insert(id.clone(), RegisteredProvider { provider, seq })
            .is_some();

        if replaced {
            tracing::info!("Replaced transcript provider: {}", id);
        } else {
            tracing::info!("Registered transcript provider: {}", id);
        }
        Ok(())
    }

    /// Look up a single provider by identifier
    pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn TranscriptProvider>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.providers.get(id).map(|entry| entry.provider.clone())
    }

    /// Snapshot every registered provider, sorted ascending by
    /// (priority, registration sequence)
    pub(crate) fn snapshot(&self) -> Vec<RegisteredProvider> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut entries: Vec<RegisteredProvider> = inner.providers.values().cloned().collect();
        entries.sort_by_key(|entry| (entry.provider.priority(), entry.seq));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
