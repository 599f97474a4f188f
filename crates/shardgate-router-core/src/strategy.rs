//! Route strategies
//!
//! A strategy bundles a logical address with everything needed to resolve
//! it, so the resolver can re-run the exact same lookup after a retryable
//! failure and compare what comes back.
//!
//! - [`ShardResolver`]: keyspace ids or key ranges → [`ShardSet`]
//! - [`EntityResolver`]: entity ids → [`EntityRoute`] (per-shard statements)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shardgate_types::{BindVariables, EntityId, EntityIdsQuery, KeyRange, KeyspaceId, TabletType};
use std::fmt;

use crate::context::Context;
use crate::entity::{build_entity_ids, EntityShardPlan};
use crate::error::Result;
use crate::shard_mapper::{
    map_entity_ids_to_shards, map_key_ranges_to_shards, map_keyspace_ids_to_shards,
};
use crate::topology::SrvTopoServer;

/// Whether two shard lists name the same shards, ignoring order
pub fn strs_equal(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Result of a resolution, compared across retries
pub trait Route: Clone + fmt::Debug + Send + Sync {
    fn keyspace(&self) -> &str;

    fn shard_names(&self) -> &[String];

    /// Whether `other` would send the same statements to the same shards
    fn same_route(&self, other: &Self) -> bool;
}

/// A keyspace and a set of its shards
///
/// Equality ignores shard order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardSet {
    pub keyspace: String,
    pub shards: Vec<String>,
}

impl ShardSet {
    pub fn new(keyspace: impl Into<String>, shards: Vec<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            shards,
        }
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

impl PartialEq for ShardSet {
    fn eq(&self, other: &Self) -> bool {
        self.keyspace == other.keyspace && strs_equal(&self.shards, &other.shards)
    }
}

impl Eq for ShardSet {}

impl Route for ShardSet {
    fn keyspace(&self) -> &str {
        &self.keyspace
    }

    fn shard_names(&self) -> &[String] {
        &self.shards
    }

    fn same_route(&self, other: &Self) -> bool {
        self == other
    }
}

/// Resolved entity-id query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRoute {
    pub keyspace: String,
    pub plan: EntityShardPlan,
}

impl Route for EntityRoute {
    fn keyspace(&self) -> &str {
        &self.keyspace
    }

    fn shard_names(&self) -> &[String] {
        &self.plan.shards
    }

    // Bind variables differ per shard, so an entity id moving between two
    // surviving shards is a different route.
    fn same_route(&self, other: &Self) -> bool {
        self == other
    }
}

/// A re-runnable lookup from a logical address to a route
#[async_trait]
pub trait RouteStrategy: Send + Sync {
    type Route: Route;

    /// Addressing kind, for logs
    fn kind(&self) -> &'static str;

    fn tablet_type(&self) -> TabletType;

    async fn resolve(
        &self,
        ctx: &Context,
        topo: &dyn SrvTopoServer,
        keyspace: &str,
    ) -> Result<Self::Route>;
}

/// Sharding-key based addressing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Addressing {
    KeyspaceIds(Vec<KeyspaceId>),
    KeyRanges(Vec<KeyRange>),
}

/// Resolves keyspace ids or key ranges to a [`ShardSet`]
#[derive(Debug, Clone)]
pub struct ShardResolver {
    pub cell: String,
    pub tablet_type: TabletType,
    pub addressing: Addressing,
}

impl ShardResolver {
    pub fn keyspace_ids(
        cell: impl Into<String>,
        tablet_type: TabletType,
        keyspace_ids: Vec<KeyspaceId>,
    ) -> Self {
        Self {
            cell: cell.into(),
            tablet_type,
            addressing: Addressing::KeyspaceIds(keyspace_ids),
        }
    }

    pub fn key_ranges(
        cell: impl Into<String>,
        tablet_type: TabletType,
        key_ranges: Vec<KeyRange>,
    ) -> Self {
        Self {
            cell: cell.into(),
            tablet_type,
            addressing: Addressing::KeyRanges(key_ranges),
        }
    }
}

#[async_trait]
impl RouteStrategy for ShardResolver {
    type Route = ShardSet;

    fn kind(&self) -> &'static str {
        match self.addressing {
            Addressing::KeyspaceIds(_) => "keyspace_ids",
            Addressing::KeyRanges(_) => "key_ranges",
        }
    }

    fn tablet_type(&self) -> TabletType {
        self.tablet_type
    }

    async fn resolve(
        &self,
        ctx: &Context,
        topo: &dyn SrvTopoServer,
        keyspace: &str,
    ) -> Result<ShardSet> {
        let (keyspace, shards) = match &self.addressing {
            Addressing::KeyspaceIds(ids) => {
                map_keyspace_ids_to_shards(ctx, topo, &self.cell, keyspace, self.tablet_type, ids)
                    .await?
            }
            Addressing::KeyRanges(ranges) => {
                map_key_ranges_to_shards(ctx, topo, &self.cell, keyspace, self.tablet_type, ranges)
                    .await?
            }
        };
        Ok(ShardSet::new(keyspace, shards))
    }
}

/// Resolves entity ids to per-shard statements
#[derive(Debug, Clone)]
pub struct EntityResolver {
    pub cell: String,
    pub tablet_type: TabletType,
    pub entity_ids: Vec<EntityId>,
    pub sql: String,
    pub entity_column_name: String,
    pub bind_variables: BindVariables,
}

impl EntityResolver {
    pub fn from_query(cell: impl Into<String>, query: &EntityIdsQuery) -> Self {
        Self {
            cell: cell.into(),
            tablet_type: query.tablet_type,
            entity_ids: query.entity_keyspace_ids.clone(),
            sql: query.sql.clone(),
            entity_column_name: query.entity_column_name.clone(),
            bind_variables: query.bind_variables.clone(),
        }
    }
}

#[async_trait]
impl RouteStrategy for EntityResolver {
    type Route = EntityRoute;

    fn kind(&self) -> &'static str {
        "entity_ids"
    }

    fn tablet_type(&self) -> TabletType {
        self.tablet_type
    }

    async fn resolve(
        &self,
        ctx: &Context,
        topo: &dyn SrvTopoServer,
        keyspace: &str,
    ) -> Result<EntityRoute> {
        let (keyspace, shard_map) = map_entity_ids_to_shards(
            ctx,
            topo,
            &self.cell,
            keyspace,
            self.tablet_type,
            &self.entity_ids,
        )
        .await?;
        let plan = build_entity_ids(
            &shard_map,
            &self.sql,
            &self.entity_column_name,
            &self.bind_variables,
        );
        Ok(EntityRoute { keyspace, plan })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(shards: &[&str]) -> Vec<String> {
        shards.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strs_equal_ignores_order() {
        assert!(strs_equal(&names(&["-80", "80-"]), &names(&["80-", "-80"])));
        assert!(!strs_equal(&names(&["-80", "80-"]), &names(&["-80"])));
        assert!(!strs_equal(&names(&["-80", "80-"]), &names(&["-80", "80-c0"])));
        assert!(strs_equal(&[], &[]));
    }

    #[test]
    fn test_strs_equal_leaves_inputs_untouched() {
        let a = names(&["c0-", "-40"]);
        let b = names(&["-40", "c0-"]);
        assert!(strs_equal(&a, &b));
        assert_eq!(a, names(&["c0-", "-40"]));
    }

    #[test]
    fn test_shard_set_equality() {
        let a = ShardSet::new("user", names(&["-80", "80-"]));
        let b = ShardSet::new("user", names(&["80-", "-80"]));
        let c = ShardSet::new("user_v2", names(&["-80", "80-"]));

        assert_eq!(a, b);
        assert!(a.same_route(&b));
        assert_ne!(a, c);
    }
}
