//! Serving graph access
//!
//! [`SrvTopoServer`] is the read side of the topology service. Reads are
//! idempotent and may be repeated freely; the resolver calls it again after
//! every retryable execution failure.

use async_trait::async_trait;
use parking_lot::RwLock;
use shardgate_types::SrvKeyspace;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{Result, TopologyError};

/// Read access to the serving graph of a cell
#[async_trait]
pub trait SrvTopoServer: Send + Sync {
    /// Serving record of `keyspace` in `cell`
    async fn get_srv_keyspace(&self, ctx: &Context, cell: &str, keyspace: &str)
        -> Result<SrvKeyspace>;
}

/// In-memory serving graph
///
/// Records can be replaced at any time, which is how a reshard is simulated:
/// readers see either the old or the new layout of a keyspace, never a mix.
#[derive(Debug, Default, Clone)]
pub struct MemoryTopoServer {
    /// cell → keyspace → record
    cells: Arc<RwLock<HashMap<String, HashMap<String, SrvKeyspace>>>>,
}

impl MemoryTopoServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the serving record of a keyspace
    pub fn update_srv_keyspace(&self, cell: &str, keyspace: &str, srv_keyspace: SrvKeyspace) {
        info!(
            cell = %cell,
            keyspace = %keyspace,
            tablet_types = srv_keyspace.partitions.len(),
            served_from = ?srv_keyspace.served_from,
            "Updating serving keyspace"
        );

        let mut cells = self.cells.write();
        cells
            .entry(cell.to_string())
            .or_default()
            .insert(keyspace.to_string(), srv_keyspace);
    }

    /// Remove a keyspace from a cell's serving graph
    pub fn remove_srv_keyspace(&self, cell: &str, keyspace: &str) -> Option<SrvKeyspace> {
        let mut cells = self.cells.write();
        cells.get_mut(cell)?.remove(keyspace)
    }
}

#[async_trait]
impl SrvTopoServer for MemoryTopoServer {
    async fn get_srv_keyspace(
        &self,
        _ctx: &Context,
        cell: &str,
        keyspace: &str,
    ) -> Result<SrvKeyspace> {
        debug!(cell = %cell, keyspace = %keyspace, "Reading serving keyspace");

        let cells = self.cells.read();
        cells
            .get(cell)
            .and_then(|keyspaces| keyspaces.get(keyspace))
            .cloned()
            .ok_or_else(|| {
                TopologyError::fetch(keyspace, format!("node doesn't exist in cell {}", cell))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_and_read() {
        let topo = MemoryTopoServer::new();
        let ctx = Context::background();
        let srv = SrvKeyspace::with_shards(&["-80", "80-"]).unwrap();

        topo.update_srv_keyspace("cell1", "user", srv.clone());

        assert_eq!(topo.get_srv_keyspace(&ctx, "cell1", "user").await.unwrap(), srv);
        // Records are per cell
        assert!(topo.get_srv_keyspace(&ctx, "cell2", "user").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_keyspace() {
        let topo = MemoryTopoServer::new();
        let ctx = Context::background();

        let err = topo.get_srv_keyspace(&ctx, "cell1", "user").await.unwrap_err();
        assert!(matches!(err, TopologyError::KeyspaceFetch { ref keyspace, .. } if keyspace == "user"));
    }

    #[tokio::test]
    async fn test_remove() {
        let topo = MemoryTopoServer::new();
        let ctx = Context::background();
        topo.update_srv_keyspace("cell1", "user", SrvKeyspace::with_shards(&["-"]).unwrap());

        assert!(topo.remove_srv_keyspace("cell1", "user").is_some());
        assert!(topo.remove_srv_keyspace("cell1", "user").is_none());
        assert!(topo.get_srv_keyspace(&ctx, "cell1", "user").await.is_err());
    }
}
