//! Topology lookup errors

use shardgate_types::{KeyspaceId, TabletType};
use thiserror::Error;

/// Failure to resolve a logical address against the serving graph.
///
/// These are never retried by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("keyspace {keyspace} fetch error: {reason}")]
    KeyspaceFetch { keyspace: String, reason: String },

    #[error("No partition found for tabletType {tablet_type} in keyspace {keyspace}")]
    NoPartition {
        keyspace: String,
        tablet_type: TabletType,
    },

    #[error("No shards found for tabletType {tablet_type} in keyspace {keyspace}")]
    NoShards {
        keyspace: String,
        tablet_type: TabletType,
    },

    #[error("KeyspaceId {keyspace_id} didn't match any shards in keyspace {keyspace}")]
    KeyspaceIdNotFound {
        keyspace: String,
        keyspace_id: KeyspaceId,
    },
}

impl TopologyError {
    /// Create a fetch error for a keyspace
    pub fn fetch(keyspace: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyspaceFetch {
            keyspace: keyspace.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TopologyError>;
