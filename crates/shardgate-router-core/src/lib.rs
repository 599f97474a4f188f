//! Shardgate Router Core - Shard resolution primitives
//!
//! Turns logical addresses (keyspace ids, key ranges, entity ids) into the
//! physical shards that serve them.
//!
//! # Architecture
//!
//! ```text
//! Logical address
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │     RouteStrategy       │  ShardResolver / EntityResolver
//! │   (What to look up?)    │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │     Shard mapper        │  served_from redirect + key range math
//! │   (Which shards?)       │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │     SrvTopoServer       │  serving graph of a cell
//! └─────────────────────────┘
//! ```
//!
//! # Helpers
//!
//! - **is_dml**: classifies a statement by its leading keyword
//! - **insert_sql_clause**: splices a predicate before GROUP BY / ORDER BY /
//!   LIMIT / FOR UPDATE
//! - **build_entity_ids**: per-shard statements for entity-id queries
//!
//! # Example
//!
//! ```rust,ignore
//! use shardgate_router_core::{Context, MemoryTopoServer, RouteStrategy, ShardResolver};
//!
//! let topo = MemoryTopoServer::new();
//! topo.update_srv_keyspace("cell1", "user", SrvKeyspace::with_shards(&["-80", "80-"])?);
//!
//! let strategy = ShardResolver::keyspace_ids("cell1", TabletType::Master, ids);
//! let shard_set = strategy.resolve(&Context::background(), &topo, "user").await?;
//! ```

// Core modules
mod context;
mod entity;
mod error;
mod shard_mapper;
mod sql;
mod strategy;
mod topology;


// Re-exports: Error types
pub use error::{Result, TopologyError};

// Re-exports: Cancellation
pub use context::{Context, ContextError};

// Re-exports: Serving graph
pub use topology::{MemoryTopoServer, SrvTopoServer};

// Re-exports: Shard mapping
pub use shard_mapper::{
    get_keyspace_shards, get_shard_for_keyspace_id, map_entity_ids_to_shards,
    map_key_ranges_to_shards, map_keyspace_ids_to_shards, resolve_key_range,
};

// Re-exports: SQL helpers
pub use entity::{build_entity_ids, EntityShardPlan, ShardEntityMap};
pub use sql::{insert_sql_clause, is_dml};

// Re-exports: Strategies
pub use strategy::{
    strs_equal, Addressing, EntityResolver, EntityRoute, Route, RouteStrategy, ShardResolver,
    ShardSet,
};
