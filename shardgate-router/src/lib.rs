//! shardgate query resolver
//!
//! Sits between a query front end and the shard executor. Callers address a
//! statement by keyspace ids, key ranges or entity ids; the [`Resolver`]
//! turns that address into a concrete set of shards using the serving graph,
//! hands the statement to the [`ShardExecutor`] and, when the executor says
//! the mapping went stale mid-reshard, resolves again and retries.
//!
//! ```text
//!   caller ──▶ Resolver ──▶ RouteStrategy ──▶ SrvTopoServer
//!                 │   ▲
//!                 ▼   │ retry?
//!            ShardExecutor ──▶ shards
//! ```

mod config;
mod error;
mod executor;
mod resolver;
mod session;

pub use config::ResolverConfig;
pub use error::{Result, RouterError};
pub use executor::{
    ErrorCode, ExecResult, ExecutorError, SendReply, ShardConnError, ShardExecutor, ShardTarget,
};
pub use resolver::Resolver;
pub use session::SafeSession;
