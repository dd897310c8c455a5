//! Live worker bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::error;

use ytvault_models::JobId;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Shared between a running worker and anyone who may cancel it.
#[derive(Debug)]
pub struct WorkerHandle {
    job_id: JobId,
    cancel: Arc<AtomicBool>,
}

impl WorkerHandle {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Request cooperative cancellation. The worker notices at its next
    /// engine callback.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Flag handed to the engine callback thread.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }
}

/// At most one live [`WorkerHandle`] per job id.
#[derive(Debug, Default)]
pub struct JobRegistry {
    workers: RwLock<HashMap<JobId, Arc<WorkerHandle>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the worker slot for `job_id`.
    pub fn register(&self, job_id: &JobId) -> WorkerResult<Arc<WorkerHandle>> {
        let mut workers = self
            .workers
            .write()
            .map_err(|e| WorkerError::internal(format!("RwLock poisoned writing workers: {e}")))?;
        if workers.contains_key(job_id) {
            return Err(WorkerError::AlreadyRunning(job_id.clone()));
        }
        let handle = Arc::new(WorkerHandle::new(job_id.clone()));
        workers.insert(job_id.clone(), Arc::clone(&handle));
        metrics::set_active_workers(workers.len());
        Ok(handle)
    }

    pub fn lookup(&self, job_id: &JobId) -> Option<Arc<WorkerHandle>> {
        match self.workers.read() {
            Ok(workers) => workers.get(job_id).cloned(),
            Err(e) => {
                error!("RwLock poisoned reading workers: {e}");
                None
            }
        }
    }

    /// Flag the live worker for `job_id`; `false` if there is none.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match self.lookup(job_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, job_id: &JobId) -> Option<Arc<WorkerHandle>> {
        match self.workers.write() {
            Ok(mut workers) => {
                let removed = workers.remove(job_id);
                metrics::set_active_workers(workers.len());
                removed
            }
            Err(e) => {
                error!("RwLock poisoned writing workers: {e}");
                None
            }
        }
    }

    /// Remove `handle`'s entry only if it is still the registered one.
    pub fn remove_if_same(&self, handle: &Arc<WorkerHandle>) -> bool {
        match self.workers.write() {
            Ok(mut workers) => {
                let same = workers
                    .get(handle.job_id())
                    .is_some_and(|current| Arc::ptr_eq(current, handle));
                if same {
                    workers.remove(handle.job_id());
                    metrics::set_active_workers(workers.len());
                }
                same
            }
            Err(e) => {
                error!("RwLock poisoned writing workers: {e}");
                false
            }
        }
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        match self.workers.read() {
            Ok(workers) => {
                let mut ids: Vec<JobId> = workers.keys().cloned().collect();
                ids.sort();
                ids
            }
            Err(e) => {
                error!("RwLock poisoned reading workers: {e}");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.workers.read().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_register_refuses_second_live_worker() {
        let registry = JobRegistry::new();
        let id = JobId::from("abc");

        assert_ok!(registry.register(&id));
        let err = assert_err!(registry.register(&id));
        assert!(matches!(err, WorkerError::AlreadyRunning(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cancel_sets_flag() {
        let registry = JobRegistry::new();
        let id = JobId::from("abc");
        let handle = registry.register(&id).unwrap();
        let flag = handle.cancel_flag();

        assert!(!flag.load(Ordering::SeqCst));
        assert!(registry.cancel(&id));
        assert!(flag.load(Ordering::SeqCst));
        assert!(handle.is_cancelled());
        assert!(!registry.cancel(&JobId::from("other")));
    }

    #[test]
    fn test_remove_if_same_ignores_replaced_handle() {
        let registry = JobRegistry::new();
        let id = JobId::from("abc");
        let old = registry.register(&id).unwrap();
        registry.remove(&id);
        let new = registry.register(&id).unwrap();

        assert!(!registry.remove_if_same(&old));
        assert!(registry.lookup(&id).is_some());
        assert!(registry.remove_if_same(&new));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_active_ids_sorted() {
        let registry = JobRegistry::new();
        registry.register(&JobId::from("b")).unwrap();
        registry.register(&JobId::from("a")).unwrap();
        assert_eq!(registry.active_ids(), vec![JobId::from("a"), JobId::from("b")]);
    }
}
