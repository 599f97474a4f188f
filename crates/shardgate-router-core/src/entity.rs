//! Per-shard statements for entity-id queries
//!
//! An entity-id query runs as a different statement on every shard: each
//! shard only sees the entity ids it owns, passed as synthetic bind
//! variables named after the entity column.
//!
//! ```text
//! select * from orders where status = :status        entity column: user_id
//!
//!   -80 → ... where status = :status and user_id in (:user_id0, :user_id1)
//!   80- → ... where status = :status and user_id in (:user_id0)
//! ```

use serde::{Deserialize, Serialize};
use shardgate_types::{BindVariables, Value};
use std::collections::BTreeMap;

use crate::sql::insert_sql_clause;

/// Entity values grouped by the shard that owns them, ordered by shard name
pub type ShardEntityMap = BTreeMap<String, Vec<Value>>;

const SEPARATOR: &str = ", ";
const SQL_VAR_IDENTIFIER: &str = ":";
const OPEN_BRACKET: &str = " in (";
const CLOSE_BRACKET: &str = ")";

/// Statements and bind variables to send to each shard
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityShardPlan {
    /// Target shards, in shard-name order
    pub shards: Vec<String>,
    pub sql_per_shard: BTreeMap<String, String>,
    pub bind_vars_per_shard: BTreeMap<String, BindVariables>,
}

impl EntityShardPlan {
    pub fn sql(&self, shard: &str) -> Option<&str> {
        self.sql_per_shard.get(shard).map(String::as_str)
    }

    pub fn bind_vars(&self, shard: &str) -> Option<&BindVariables> {
        self.bind_vars_per_shard.get(shard)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

/// Build the per-shard statements of an entity-id query.
///
/// Caller bind variables are copied first; a caller variable named like a
/// synthetic one (`{column}{n}`) is overwritten.
pub fn build_entity_ids(
    shard_map: &ShardEntityMap,
    query_sql: &str,
    entity_column_name: &str,
    bind_variables: &BindVariables,
) -> EntityShardPlan {
    let mut plan = EntityShardPlan::default();

    for (shard, ids) in shard_map {
        let mut predicate = String::from(entity_column_name);
        predicate.push_str(OPEN_BRACKET);

        let mut bind_vars = bind_variables.clone();
        for (i, id) in ids.iter().enumerate() {
            let bv_name = format!("{}{}", entity_column_name, i);
            if i > 0 {
                predicate.push_str(SEPARATOR);
            }
            predicate.push_str(SQL_VAR_IDENTIFIER);
            predicate.push_str(&bv_name);
            bind_vars.insert(bv_name, id.clone());
        }
        predicate.push_str(CLOSE_BRACKET);

        plan.sql_per_shard
            .insert(shard.clone(), insert_sql_clause(query_sql, &predicate));
        plan.bind_vars_per_shard.insert(shard.clone(), bind_vars);
        plan.shards.push(shard.clone());
    }

    plan
}
