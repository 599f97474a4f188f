//! Logical address → shard lookups
//!
//! Every lookup starts from the serving record of the requested keyspace.
//! When that record redirects the tablet type to another keyspace (vertical
//! resharding), the lookup follows the redirect once and reports the keyspace
//! it actually resolved against, so callers can thread it into later calls.

use shardgate_types::{EntityId, KeyRange, KeyspaceId, ShardReference, TabletType};
use tracing::debug;

use crate::context::Context;
use crate::entity::ShardEntityMap;
use crate::error::{Result, TopologyError};
use crate::topology::SrvTopoServer;

/// Resolve the keyspace serving `tablet_type` and its shard references
pub async fn get_keyspace_shards(
    ctx: &Context,
    topo: &dyn SrvTopoServer,
    cell: &str,
    keyspace: &str,
    tablet_type: TabletType,
) -> Result<(String, Vec<ShardReference>)> {
    let mut keyspace = keyspace.to_string();
    let mut srv_keyspace = topo
        .get_srv_keyspace(ctx, cell, &keyspace)
        .await
        .map_err(|e| refetch_error(&keyspace, e))?;

    // check if the keyspace has been redirected for this tablet type
    if let Some(served_from) = srv_keyspace.served_from.get(&tablet_type).cloned() {
        debug!(
            keyspace = %keyspace,
            served_from = %served_from,
            tablet_type = %tablet_type,
            "Keyspace redirected"
        );
        keyspace = served_from;
        srv_keyspace = topo
            .get_srv_keyspace(ctx, cell, &keyspace)
            .await
            .map_err(|e| refetch_error(&keyspace, e))?;
    }

    let partition = srv_keyspace
        .partitions
        .remove(&tablet_type)
        .ok_or_else(|| TopologyError::NoPartition {
            keyspace: keyspace.clone(),
            tablet_type,
        })?;

    Ok((keyspace, partition.shard_references))
}

fn refetch_error(keyspace: &str, err: TopologyError) -> TopologyError {
    match err {
        TopologyError::KeyspaceFetch { .. } => err,
        other => TopologyError::fetch(keyspace, other.to_string()),
    }
}

/// Name of the shard whose key range contains `keyspace_id`
pub fn get_shard_for_keyspace_id(
    keyspace: &str,
    tablet_type: TabletType,
    all_shards: &[ShardReference],
    keyspace_id: &KeyspaceId,
) -> Result<String> {
    if all_shards.is_empty() {
        return Err(TopologyError::NoShards {
            keyspace: keyspace.to_string(),
            tablet_type,
        });
    }
    all_shards
        .iter()
        .find(|shard| shard.key_range.contains(keyspace_id))
        .map(|shard| shard.name.clone())
        .ok_or_else(|| TopologyError::KeyspaceIdNotFound {
            keyspace: keyspace.to_string(),
            keyspace_id: keyspace_id.clone(),
        })
}

/// Names of the shards whose key ranges overlap `key_range`
pub fn resolve_key_range(key_range: &KeyRange, all_shards: &[ShardReference]) -> Vec<String> {
    all_shards
        .iter()
        .filter(|shard| key_range.intersects(&shard.key_range))
        .map(|shard| shard.name.clone())
        .collect()
}

fn push_unique(shards: &mut Vec<String>, shard: String) {
    if !shards.contains(&shard) {
        shards.push(shard);
    }
}

/// Shards owning the given keyspace ids, de-duplicated in first-seen order
pub async fn map_keyspace_ids_to_shards(
    ctx: &Context,
    topo: &dyn SrvTopoServer,
    cell: &str,
    keyspace: &str,
    tablet_type: TabletType,
    keyspace_ids: &[KeyspaceId],
) -> Result<(String, Vec<String>)> {
    let (keyspace, all_shards) =
        get_keyspace_shards(ctx, topo, cell, keyspace, tablet_type).await?;

    let mut shards = Vec::new();
    for keyspace_id in keyspace_ids {
        let shard = get_shard_for_keyspace_id(&keyspace, tablet_type, &all_shards, keyspace_id)?;
        push_unique(&mut shards, shard);
    }
    Ok((keyspace, shards))
}

/// Shards overlapping the given key ranges, de-duplicated in first-seen order
pub async fn map_key_ranges_to_shards(
    ctx: &Context,
    topo: &dyn SrvTopoServer,
    cell: &str,
    keyspace: &str,
    tablet_type: TabletType,
    key_ranges: &[KeyRange],
) -> Result<(String, Vec<String>)> {
    let (keyspace, all_shards) =
        get_keyspace_shards(ctx, topo, cell, keyspace, tablet_type).await?;

    let mut shards = Vec::new();
    for key_range in key_ranges {
        for shard in resolve_key_range(key_range, &all_shards) {
            push_unique(&mut shards, shard);
        }
    }
    Ok((keyspace, shards))
}

/// Group entity values by the shard owning their keyspace id
pub async fn map_entity_ids_to_shards(
    ctx: &Context,
    topo: &dyn SrvTopoServer,
    cell: &str,
    keyspace: &str,
    tablet_type: TabletType,
    entity_ids: &[EntityId],
) -> Result<(String, ShardEntityMap)> {
    let (keyspace, all_shards) =
        get_keyspace_shards(ctx, topo, cell, keyspace, tablet_type).await?;

    let mut shards = ShardEntityMap::new();
    for entity_id in entity_ids {
        let shard = get_shard_for_keyspace_id(
            &keyspace,
            tablet_type,
            &all_shards,
            &entity_id.keyspace_id,
        )?;
        shards
            .entry(shard)
            .or_default()
            .push(entity_id.external_id.clone());
    }
    Ok((keyspace, shards))
}
