//! Scatter/gather executor boundary
//!
//! The executor owns connection pools, per-connection retries and
//! transaction state. The resolver only hands it a target and reacts to the
//! error code it returns: [`ErrorCode::Retry`] means the shard mapping the
//! target was built from may be stale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shardgate_router_core::{Context, ContextError, EntityShardPlan, Route};
use shardgate_types::{BoundQuery, QueryResult, QueryResultList, TabletType};
use std::fmt;
use thiserror::Error;

use crate::session::SafeSession;

/// Error codes reported by shard connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Ordinary query failure
    Normal,

    /// Shard mapping may be stale; re-resolve and retry if it changed
    Retry,

    /// Tablet is unusable for this query
    Fatal,

    /// Transaction pool exhausted
    TxPoolFull,

    /// Transaction id unknown to the tablet
    NotInTx,
}

/// Failure reported by a shard connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{shard_identifier}, {message}")]
pub struct ShardConnError {
    pub code: ErrorCode,
    /// `keyspace.shard.tablet_type` of the failing connection
    pub shard_identifier: String,
    pub message: String,
}

impl ShardConnError {
    pub fn new(
        code: ErrorCode,
        shard_identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            shard_identifier: shard_identifier.into(),
            message: message.into(),
        }
    }
}

/// Executor errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Shard(#[from] ShardConnError),

    #[error("Executor stopped: {0}")]
    Canceled(#[from] ContextError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExecutorError {
    /// Create a retryable shard error
    pub fn retry(shard_identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Shard(ShardConnError::new(ErrorCode::Retry, shard_identifier, message))
    }

    /// Create a shard error with an arbitrary code
    pub fn shard(
        code: ErrorCode,
        shard_identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Shard(ShardConnError::new(code, shard_identifier, message))
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Shard(err) => Some(err.code),
            _ => None,
        }
    }

    /// Check if this error signals a possibly stale shard mapping
    pub fn is_retry(&self) -> bool {
        self.code() == Some(ErrorCode::Retry)
    }
}

pub type ExecResult<T> = std::result::Result<T, ExecutorError>;

/// Per-result callback of streaming queries
pub type SendReply<'a> = &'a mut (dyn FnMut(QueryResult) -> anyhow::Result<()> + Send);

/// Resolved destination of one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTarget {
    pub keyspace: String,
    pub shards: Vec<String>,
    pub tablet_type: TabletType,
    pub not_in_transaction: bool,
}

impl ShardTarget {
    pub fn from_route(route: &impl Route, tablet_type: TabletType, not_in_transaction: bool) -> Self {
        Self {
            keyspace: route.keyspace().to_string(),
            shards: route.shard_names().to_vec(),
            tablet_type,
            not_in_transaction,
        }
    }
}

impl fmt::Display for ShardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/[{}]@{}",
            self.keyspace,
            self.shards.join(","),
            self.tablet_type
        )
    }
}

/// Runs statements on resolved shards
#[async_trait]
pub trait ShardExecutor: Send + Sync {
    /// Open connections to every serving tablet ahead of traffic
    async fn initialize_connections(&self, ctx: &Context) -> ExecResult<()>;

    /// Run one statement on every target shard
    async fn execute(
        &self,
        ctx: &Context,
        query: &BoundQuery,
        target: &ShardTarget,
        session: &SafeSession,
    ) -> ExecResult<QueryResult>;

    /// Run each shard's own statement from `plan`
    async fn execute_entity_ids(
        &self,
        ctx: &Context,
        plan: &EntityShardPlan,
        target: &ShardTarget,
        session: &SafeSession,
    ) -> ExecResult<QueryResult>;

    /// Run the statements, in order, as one unit on every target shard
    async fn execute_batch(
        &self,
        ctx: &Context,
        queries: &[BoundQuery],
        target: &ShardTarget,
        session: &SafeSession,
    ) -> ExecResult<QueryResultList>;

    /// Stream results shard by shard into `send_reply`
    async fn stream_execute(
        &self,
        ctx: &Context,
        query: &BoundQuery,
        target: &ShardTarget,
        session: &SafeSession,
        send_reply: SendReply<'_>,
    ) -> ExecResult<()>;

    async fn commit(&self, ctx: &Context, session: &SafeSession) -> ExecResult<()>;

    async fn rollback(&self, ctx: &Context, session: &SafeSession) -> ExecResult<()>;
}
