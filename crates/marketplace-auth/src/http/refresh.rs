/*
[INPUT]:  401 responses from concurrent requests
[OUTPUT]: A single shared session refresh per expiry
[POS]:    HTTP layer - refresh de-duplication for the 401 interceptor
[UPDATE]: When refresh semantics change
*/

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::http::{MarketError, Result};
use crate::session::SessionEvents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RefreshOutcome {
    #[default]
    NotAttempted,
    Renewed,
    Failed,
}

/// Serializes refresh calls.
///
/// Every request snapshots [`RefreshGate::generation`] before it is sent. When
/// it comes back with 401, the gate compares that snapshot with the current
/// generation: if a refresh finished in between, the request reuses that
/// outcome instead of issuing its own refresh.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    generation: AtomicU64,
    outcome: Mutex<RefreshOutcome>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `refresh` unless a refresh already completed after `observed`.
    ///
    /// A failed refresh broadcasts `Expired` once; requests that were waiting
    /// on it get [`MarketError::SessionExpired`].
    pub async fn refresh_after<F, Fut>(
        &self,
        observed: u64,
        events: &SessionEvents,
        refresh: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut outcome = self.outcome.lock().await;

        if self.generation() != observed {
            debug!(outcome = ?*outcome, "reusing completed session refresh");
            return match *outcome {
                RefreshOutcome::Failed => Err(MarketError::SessionExpired),
                _ => Ok(()),
            };
        }

        let result = refresh().await;
        *outcome = if result.is_ok() {
            RefreshOutcome::Renewed
        } else {
            RefreshOutcome::Failed
        };
        self.generation.fetch_add(1, Ordering::AcqRel);

        if let Err(err) = &result {
            warn!(error = %err, "session refresh failed");
            events.emit_expired();
        }
        result
    }
}
