//! Transaction session records

use serde::{Deserialize, Serialize};

use crate::topo::TabletType;

/// An open transaction on one shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSession {
    pub keyspace: String,
    pub shard: String,
    pub tablet_type: TabletType,
    pub transaction_id: i64,
}

/// Client session
///
/// Tracks whether the client is inside a transaction and which shards have
/// joined it so far.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub in_transaction: bool,
    pub shard_sessions: Vec<ShardSession>,
}

impl Session {
    /// An autocommit session
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that has begun a transaction
    pub fn begin() -> Self {
        Self {
            in_transaction: true,
            shard_sessions: Vec::new(),
        }
    }
}
