//! Shardgate Types
//!
//! Data records shared by the shardgate routing crates:
//! - keyspace ids and key ranges
//! - the serving graph (keyspace → shards per tablet type)
//! - bind values, query requests and results
//! - transaction sessions

// ========== Core Modules ==========
pub mod key;
pub mod query;
pub mod session;
pub mod topo;
pub mod value;

// Export from key module
pub use key::{KeyError, KeyRange, KeyspaceId};

// Export from topo module
pub use topo::{KeyspacePartition, ShardReference, SrvKeyspace, TabletType};

// Export from value module
pub use value::{BindVariables, Value};

// Export from query module
pub use query::{
    BoundQuery, EntityId, EntityIdsQuery, Field, KeyRangeQuery, KeyspaceIdBatchQuery,
    KeyspaceIdQuery, QueryResult, QueryResultList,
};

// Export from session module
pub use session::{Session, ShardSession};
