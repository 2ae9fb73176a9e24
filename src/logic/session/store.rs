//! Session store
//!
//! Keyed registry of mission sessions. Each session sits behind its own
//! async mutex, so writers on one key are serialized while different keys
//! proceed independently. Sessions nobody touched for the idle TTL are
//! swept by a background task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::MissionSession;
use crate::logic::triage::rules::ClassPartition;
use crate::logic::triage::types::AnomalyRecord;

pub type SessionHandle = Arc<Mutex<MissionSession>>;

struct SessionEntry {
    handle: SessionHandle,
    last_used: parking_lot::Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }
}

#[derive(Clone)]
pub struct SessionStore {
    partition: ClassPartition,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    pub fn new(partition: ClassPartition) -> Self {
        Self {
            partition,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a session for a new detection run
    pub fn create(&self, records: Vec<AnomalyRecord>) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(MissionSession::with_records(self.partition.clone(), records)));
        let entry = SessionEntry {
            handle: handle.clone(),
            last_used: parking_lot::Mutex::new(Instant::now()),
        };
        self.sessions.write().insert(id, entry);
        tracing::debug!("Session created: {}", id);
        (id, handle)
    }

    /// Look up a session and mark it as used
    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let sessions = self.sessions.read();
        let entry = sessions.get(id)?;
        entry.touch();
        Some(entry.handle.clone())
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::debug!("Session removed: {}", id);
        }
        removed
    }

    /// Drop sessions idle for at least `max_idle`. Sessions whose lock is
    /// currently held are kept. Returns how many were dropped.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let idle = now.saturating_duration_since(*entry.last_used.lock());
            let expired = idle >= max_idle && entry.handle.try_lock().is_ok();
            if expired {
                tracing::debug!("Session expired after {}s idle: {}", idle.as_secs(), id);
            }
            !expired
        });

        before - sessions.len()
    }

    /// Run `sweep_idle` periodically until `shutdown` is cancelled
    pub fn spawn_sweeper(&self, max_idle: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        let period = (max_idle / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let expired = store.sweep_idle(max_idle);
                        if expired > 0 {
                            tracing::info!("Expired {} idle sessions ({} active)", expired, store.len());
                        }
                    }
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
