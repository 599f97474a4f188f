//! Resolver errors

use shardgate_router_core::{ContextError, TopologyError};
use thiserror::Error;

use crate::executor::{ErrorCode, ExecutorError};

/// Errors returned to resolver callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Shard resolution failed; never retried
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("DML should not span multiple keyspace_ids")]
    MultiShardDml,

    /// Executor failure, passed through unchanged
    #[error(transparent)]
    Executor(ExecutorError),

    #[error("Request canceled: {0}")]
    Canceled(#[from] ContextError),
}

impl From<ExecutorError> for RouterError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Canceled(reason) => Self::Canceled(reason),
            other => Self::Executor(other),
        }
    }
}

impl RouterError {
    /// Check if this is a stale-mapping signal that escaped the retry loop
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Executor(err) if err.is_retry())
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }

    /// Executor error code, if the failure came from a shard
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Executor(err) => err.code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
