/*!
 * Table of running jobs.
 *
 * Each job gets a cancellation token and a completion signal. The token is
 * removed on cancel or finish; the completion signal fires only when the
 * job task itself ends, so waiters see the final persisted state.
 */

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Inner {
    /// Cancellation tokens of jobs not yet canceled or finished
    active: HashMap<i64, CancellationToken>,
    /// Completion signals of jobs whose task is still running
    completions: HashMap<i64, CancellationToken>,
}

/// Cheaply clonable handle to the registry
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job before its task is spawned; returns its token
    pub fn register(&self, job_id: i64) -> CancellationToken {
        let token = CancellationToken::new();
        let mut inner = self.inner.lock();
        inner.active.insert(job_id, token.clone());
        inner.completions.insert(job_id, CancellationToken::new());
        token
    }

    /// Trigger cancellation and drop the entry; false if the job is not active
    pub fn cancel(&self, job_id: i64) -> bool {
        let removed = self.inner.lock().active.remove(&job_id);
        match removed {
            Some(token) => {
                debug!("Cancelling job {}", job_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Called by the job task when it ends, whatever the outcome
    pub fn finish(&self, job_id: i64) {
        let mut inner = self.inner.lock();
        inner.active.remove(&job_id);
        if let Some(done) = inner.completions.remove(&job_id) {
            done.cancel();
        }
    }

    pub fn is_active(&self, job_id: i64) -> bool {
        self.inner.lock().active.contains_key(&job_id)
    }

    /// Wait until the job task has ended; returns at once for unknown jobs
    pub async fn wait(&self, job_id: i64) {
        let signal = self.inner.lock().completions.get(&job_id).cloned();
        if let Some(signal) = signal {
            signal.cancelled().await;
        }
    }
}
