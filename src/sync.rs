//! Client side of the batch reorder protocol.
//!
//! Every commit carries a per-scope version that only ever increases. The
//! server rejects anything not newer than what it already applied, so a slow
//! older request can never overwrite a newer order. When that happens to one
//! of our own commits the result is [`SyncOutcome::Superseded`], not an error.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::GalleryClient;
use crate::errors::SyncError;
use crate::gallery::models::{OrderScope, ReorderOutcome};

/// Abstraction over sending a reorder batch, for testability.
/// Real implementation: `GalleryClient`.
#[async_trait]
pub trait ReorderTransport: Send + Sync {
    async fn send_reorder(
        &self,
        scope: OrderScope,
        ids: &[i64],
        version: i64,
    ) -> Result<ReorderOutcome, SyncError>;
}

#[async_trait]
impl ReorderTransport for GalleryClient {
    async fn send_reorder(
        &self,
        scope: OrderScope,
        ids: &[i64],
        version: i64,
    ) -> Result<ReorderOutcome, SyncError> {
        self.reorder(scope, ids, version).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server committed this order.
    Applied(ReorderOutcome),
    /// A later commit for the same scope was issued before this one landed.
    Superseded { version: i64 },
}

#[derive(Debug, Default, Clone, Copy)]
struct ScopeVersions {
    issued: i64,
    confirmed: i64,
}

pub struct ReorderSync<T> {
    transport: T,
    versions: Mutex<HashMap<OrderScope, ScopeVersions>>,
}

impl<T: ReorderTransport> ReorderSync<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            versions: Mutex::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Record the version a list response reported so the next commit
    /// is numbered after it.
    pub fn seed(&self, scope: OrderScope, version: i64) {
        let mut versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = versions.entry(scope).or_default();
        entry.issued = entry.issued.max(version);
        entry.confirmed = entry.confirmed.max(version);
    }

    /// Last version the server confirmed for `scope`.
    pub fn confirmed(&self, scope: OrderScope) -> i64 {
        let versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        versions.get(&scope).map(|v| v.confirmed).unwrap_or(0)
    }

    fn issue(&self, scope: OrderScope) -> i64 {
        let mut versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = versions.entry(scope).or_default();
        entry.issued += 1;
        entry.issued
    }

    fn latest_issued(&self, scope: OrderScope) -> i64 {
        let versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        versions.get(&scope).map(|v| v.issued).unwrap_or(0)
    }

    fn confirm(&self, scope: OrderScope, version: i64) {
        let mut versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = versions.entry(scope).or_default();
        entry.confirmed = entry.confirmed.max(version);
        entry.issued = entry.issued.max(version);
    }

    /// Send the full order `ids` for `scope`.
    ///
    /// On any error the caller's working order is unconfirmed and should be
    /// replaced by a fresh listing.
    pub async fn commit(&self, scope: OrderScope, ids: &[i64]) -> Result<SyncOutcome, SyncError> {
        let version = self.issue(scope);
        debug!(scope = %scope, version, count = ids.len(), "committing order");

        match self.transport.send_reorder(scope, ids, version).await {
            Ok(outcome) => {
                if outcome.updated < outcome.total {
                    warn!(
                        scope = %scope,
                        updated = outcome.updated,
                        total = outcome.total,
                        "server reported a partial reorder"
                    );
                    return Err(SyncError::PartialApplication {
                        updated: outcome.updated,
                        total: outcome.total,
                    });
                }
                self.confirm(scope, outcome.version);
                info!(scope = %scope, version = outcome.version, "order committed");
                Ok(SyncOutcome::Applied(outcome))
            }
            Err(SyncError::Rejected { status: 409, .. }) if self.latest_issued(scope) > version => {
                debug!(scope = %scope, version, "commit superseded by a newer one");
                Ok(SyncOutcome::Superseded { version })
            }
            Err(e) => {
                warn!(scope = %scope, version, error = %e, "order commit failed");
                Err(e)
            }
        }
    }
}
