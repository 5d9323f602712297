use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::CredentialBundle;

struct CacheEntry {
    bundle: CredentialBundle,
    integration_ids: Vec<Uuid>,
    expires_at: Instant,
}

/// Optional in-process bundle cache, keyed strictly by organization id.
///
/// An entry is dropped when its TTL or the earliest credential expiry passes,
/// or when the organization's connected integration set changes.
pub struct BundleCache {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl BundleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached bundle if it is still valid for the given set of
    /// currently connected integrations.
    pub fn get(&self, organization_id: Uuid, connected: &[Uuid]) -> Option<CredentialBundle> {
        let connected = sorted(connected);
        let observed = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            let entry = entries.get(&organization_id)?;
            if entry.expires_at > Instant::now() && entry.integration_ids == connected {
                return Some(entry.bundle.clone());
            }
            entry.expires_at
        };

        self.evict_stale(organization_id, observed, &connected);
        None
    }

    /// Removes the entry only if it is still the one seen stale at `observed`;
    /// a concurrent `put` may have replaced it since the read lock was released.
    fn evict_stale(&self, organization_id: Uuid, observed: Instant, connected: &[Uuid]) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get(&organization_id) else {
            return;
        };
        if entry.expires_at != observed {
            return;
        }
        if entry.integration_ids != connected {
            tracing::info!(
                organization_id = %organization_id,
                "Connected integrations changed, invalidating cached bundle"
            );
        }
        entries.remove(&organization_id);
    }

    /// Caches `bundle` unless a credential is already inside `leeway` of expiry.
    pub fn put(
        &self,
        bundle: &CredentialBundle,
        connected: &[Uuid],
        now: DateTime<Utc>,
        leeway: chrono::Duration,
    ) {
        let mut lifetime = self.ttl;
        if let Some(expiry) = bundle.earliest_expiry() {
            match (expiry - leeway - now).to_std() {
                Ok(remaining) => lifetime = lifetime.min(remaining),
                Err(_) => return,
            }
        }
        if lifetime.is_zero() {
            return;
        }
        let Some(expires_at) = Instant::now().checked_add(lifetime) else {
            tracing::warn!(
                organization_id = %bundle.organization_id(),
                ttl_secs = lifetime.as_secs(),
                "Cache lifetime out of range, bundle not cached"
            );
            return;
        };

        let entry = CacheEntry {
            bundle: bundle.clone(),
            integration_ids: sorted(connected),
            expires_at,
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(bundle.organization_id(), entry);
    }

    pub fn invalidate(&self, organization_id: Uuid) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&organization_id);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sorted(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids
}
