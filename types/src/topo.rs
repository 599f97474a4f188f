//! Serving graph records
//!
//! The serving graph describes, per cell, how each keyspace is currently
//! partitioned into shards for each tablet type, and whether a tablet type
//! has been redirected to another keyspace (vertical resharding).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::key::KeyRange;

/// Serving role a query is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabletType {
    /// Primary, accepts writes
    Master,

    /// Read replica, eligible for promotion
    Replica,

    /// Read-only replica for batch and analytics traffic
    Rdonly,
}

impl TabletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabletType::Master => "master",
            TabletType::Replica => "replica",
            TabletType::Rdonly => "rdonly",
        }
    }
}

impl fmt::Display for TabletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabletType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "master" => Ok(TabletType::Master),
            "replica" => Ok(TabletType::Replica),
            "rdonly" => Ok(TabletType::Rdonly),
            other => Err(format!("unknown tablet type: {}", other)),
        }
    }
}

/// A shard and the key range it serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardReference {
    pub name: String,
    pub key_range: KeyRange,
}

impl ShardReference {
    pub fn new(name: impl Into<String>, key_range: KeyRange) -> Self {
        Self {
            name: name.into(),
            key_range,
        }
    }
}

/// Shards serving one tablet type of a keyspace
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyspacePartition {
    pub shard_references: Vec<ShardReference>,
}

/// Serving record of a keyspace in one cell
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SrvKeyspace {
    /// Shards per tablet type
    pub partitions: BTreeMap<TabletType, KeyspacePartition>,

    /// Tablet types whose traffic is served by another keyspace
    pub served_from: BTreeMap<TabletType, String>,

    pub sharding_column_name: String,
}

impl SrvKeyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyspace whose tablet types all share the same shard layout.
    ///
    /// Shard names double as their key range (`"-80"`, `"80-"`), which
    /// is how shards are conventionally named.
    pub fn with_shards(shards: &[&str]) -> Result<Self, crate::key::KeyError> {
        let references = shards
            .iter()
            .map(|name| Ok(ShardReference::new(*name, KeyRange::parse(name)?)))
            .collect::<Result<Vec<_>, crate::key::KeyError>>()?;

        let mut srv = Self::new();
        for tablet_type in [TabletType::Master, TabletType::Replica, TabletType::Rdonly] {
            srv.partitions.insert(
                tablet_type,
                KeyspacePartition {
                    shard_references: references.clone(),
                },
            );
        }
        Ok(srv)
    }

    /// Redirect a tablet type to another keyspace
    pub fn serve_from(mut self, tablet_type: TabletType, keyspace: impl Into<String>) -> Self {
        self.served_from.insert(tablet_type, keyspace.into());
        self
    }

    pub fn partition(&self, tablet_type: TabletType) -> Option<&KeyspacePartition> {
        self.partitions.get(&tablet_type)
    }
}
