//! Concurrency-safe session adapter
//!
//! The executor may touch the session from several per-shard sub-calls at
//! once, so each dispatch gets the session behind a shared lock. The
//! resolver copies the adapter's final state back into the caller's session
//! once the executor returns.

use parking_lot::Mutex;
use shardgate_types::{Session, ShardSession, TabletType};
use std::sync::Arc;

/// Shared, lock-protected view of a [`Session`]
#[derive(Debug, Clone, Default)]
pub struct SafeSession {
    inner: Arc<Mutex<Session>>,
}

impl SafeSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.lock().in_transaction
    }

    /// Transaction id already open on the shard, or 0
    pub fn find(&self, keyspace: &str, shard: &str, tablet_type: TabletType) -> i64 {
        let session = self.inner.lock();
        if !session.in_transaction {
            return 0;
        }
        session
            .shard_sessions
            .iter()
            .find(|s| s.keyspace == keyspace && s.shard == shard && s.tablet_type == tablet_type)
            .map(|s| s.transaction_id)
            .unwrap_or(0)
    }

    /// Record a shard joining the transaction
    pub fn append(&self, shard_session: ShardSession) {
        self.inner.lock().shard_sessions.push(shard_session);
    }

    /// Leave the transaction and forget every shard session
    pub fn reset(&self) {
        let mut session = self.inner.lock();
        session.in_transaction = false;
        session.shard_sessions.clear();
    }

    /// Copy of the current session state
    pub fn snapshot(&self) -> Session {
        self.inner.lock().clone()
    }

    pub fn into_session(self) -> Session {
        match Arc::try_unwrap(self.inner) {
            Ok(session) => session.into_inner(),
            Err(shared) => shared.lock().clone(),
        }
    }
}
