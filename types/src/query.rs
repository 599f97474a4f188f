//! Query requests and results

use serde::{Deserialize, Serialize};

use crate::key::{KeyRange, KeyspaceId};
use crate::topo::TabletType;
use crate::value::{BindVariables, Value};

/// A statement with its bind variables
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundQuery {
    pub sql: String,
    pub bind_variables: BindVariables,
}

impl BoundQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bind_variables: BindVariables::new(),
        }
    }

    pub fn with_bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_variables.insert(name.into(), value.into());
        self
    }
}

/// A query addressed by keyspace ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceIdQuery {
    pub sql: String,
    pub bind_variables: BindVariables,
    pub keyspace: String,
    pub keyspace_ids: Vec<KeyspaceId>,
    pub tablet_type: TabletType,
    pub not_in_transaction: bool,
}

impl KeyspaceIdQuery {
    pub fn new(
        sql: impl Into<String>,
        keyspace: impl Into<String>,
        keyspace_ids: Vec<KeyspaceId>,
        tablet_type: TabletType,
    ) -> Self {
        Self {
            sql: sql.into(),
            bind_variables: BindVariables::new(),
            keyspace: keyspace.into(),
            keyspace_ids,
            tablet_type,
            not_in_transaction: false,
        }
    }

    pub fn with_bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_variables.insert(name.into(), value.into());
        self
    }

    pub fn not_in_transaction(mut self) -> Self {
        self.not_in_transaction = true;
        self
    }
}

/// A query addressed by key ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRangeQuery {
    pub sql: String,
    pub bind_variables: BindVariables,
    pub keyspace: String,
    pub key_ranges: Vec<KeyRange>,
    pub tablet_type: TabletType,
    pub not_in_transaction: bool,
}

impl KeyRangeQuery {
    pub fn new(
        sql: impl Into<String>,
        keyspace: impl Into<String>,
        key_ranges: Vec<KeyRange>,
        tablet_type: TabletType,
    ) -> Self {
        Self {
            sql: sql.into(),
            bind_variables: BindVariables::new(),
            keyspace: keyspace.into(),
            key_ranges,
            tablet_type,
            not_in_transaction: false,
        }
    }

    pub fn with_bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_variables.insert(name.into(), value.into());
        self
    }
}

/// An entity value together with the keyspace id it lives under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityId {
    pub external_id: Value,
    pub keyspace_id: KeyspaceId,
}

impl EntityId {
    pub fn new(external_id: impl Into<Value>, keyspace_id: KeyspaceId) -> Self {
        Self {
            external_id: external_id.into(),
            keyspace_id,
        }
    }
}

/// A query addressed by secondary entity ids
///
/// The resolver narrows the statement on every shard with an
/// `entity_column_name in (...)` predicate listing only the entity ids that
/// live on that shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityIdsQuery {
    pub sql: String,
    pub bind_variables: BindVariables,
    pub keyspace: String,
    pub entity_column_name: String,
    pub entity_keyspace_ids: Vec<EntityId>,
    pub tablet_type: TabletType,
    pub not_in_transaction: bool,
}

impl EntityIdsQuery {
    pub fn new(
        sql: impl Into<String>,
        keyspace: impl Into<String>,
        entity_column_name: impl Into<String>,
        entity_keyspace_ids: Vec<EntityId>,
        tablet_type: TabletType,
    ) -> Self {
        Self {
            sql: sql.into(),
            bind_variables: BindVariables::new(),
            keyspace: keyspace.into(),
            entity_column_name: entity_column_name.into(),
            entity_keyspace_ids,
            tablet_type,
            not_in_transaction: false,
        }
    }

    pub fn with_bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_variables.insert(name.into(), value.into());
        self
    }
}

/// A batch of statements addressed by keyspace ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceIdBatchQuery {
    pub queries: Vec<BoundQuery>,
    pub keyspace: String,
    pub keyspace_ids: Vec<KeyspaceId>,
    pub tablet_type: TabletType,
    pub not_in_transaction: bool,
}

impl KeyspaceIdBatchQuery {
    pub fn new(
        queries: Vec<BoundQuery>,
        keyspace: impl Into<String>,
        keyspace_ids: Vec<KeyspaceId>,
        tablet_type: TabletType,
    ) -> Self {
        Self {
            queries,
            keyspace: keyspace.into(),
            keyspace_ids,
            tablet_type,
            not_in_transaction: false,
        }
    }
}

/// Column metadata of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column_type: String,
}

impl Field {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Result of a single statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub fields: Vec<Field>,
    pub rows_affected: u64,
    pub insert_id: u64,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            fields,
            rows_affected: rows.len() as u64,
            insert_id: 0,
            rows,
        }
    }
}

/// Results of a batch, in statement order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResultList {
    pub list: Vec<QueryResult>,
}
