//! Shared fixtures: an in-memory serving graph and a scripted executor

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use shardgate_router::{
    ExecResult, ExecutorError, Resolver, ResolverConfig, SafeSession, SendReply, ShardExecutor,
    ShardTarget,
};
use shardgate_router_core::{Context, EntityShardPlan, MemoryTopoServer};
use shardgate_types::{
    BoundQuery, KeyRange, KeyspaceId, KeyspacePartition, QueryResult, QueryResultList,
    ShardReference, ShardSession, SrvKeyspace, TabletType, Value,
};
use std::collections::VecDeque;
use std::sync::Arc;

pub const CELL: &str = "cell1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ksid(first_byte: u8) -> KeyspaceId {
    KeyspaceId::new(vec![first_byte, 0x01])
}

pub fn kr(input: &str) -> KeyRange {
    KeyRange::parse(input).unwrap()
}

pub fn shards(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Serving record with fixed shard names over custom ranges
pub fn named_layout(layout: &[(&str, &str)]) -> SrvKeyspace {
    let partition = KeyspacePartition {
        shard_references: layout
            .iter()
            .map(|(name, range)| ShardReference::new(*name, kr(range)))
            .collect(),
    };
    let mut srv = SrvKeyspace::new();
    for tablet_type in [TabletType::Master, TabletType::Replica, TabletType::Rdonly] {
        srv.partitions.insert(tablet_type, partition.clone());
    }
    srv
}

/// `user` keyspace split in two halves
pub fn create_test_topo() -> MemoryTopoServer {
    let topo = MemoryTopoServer::new();
    topo.update_srv_keyspace(CELL, "user", SrvKeyspace::with_shards(&["-80", "80-"]).unwrap());
    topo
}

pub fn create_test_resolver(
    topo: &MemoryTopoServer,
    executor: &Arc<FakeExecutor>,
    config: ResolverConfig,
) -> Resolver {
    init_tracing();
    Resolver::new(config, Arc::new(topo.clone()), executor.clone()).unwrap()
}

pub fn default_config() -> ResolverConfig {
    ResolverConfig::new(CELL)
}

/// Scripted answer to one executor call
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Fail(ExecutorError),
    /// Never completes
    Hang,
}

/// A recorded executor call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    InitializeConnections,
    Execute { sql: String, target: ShardTarget },
    ExecuteEntityIds { plan: EntityShardPlan, target: ShardTarget },
    ExecuteBatch { sqls: Vec<String>, target: ShardTarget },
    StreamExecute { sql: String, target: ShardTarget },
    Commit,
    Rollback,
}

impl Call {
    pub fn target(&self) -> Option<&ShardTarget> {
        match self {
            Call::Execute { target, .. }
            | Call::ExecuteEntityIds { target, .. }
            | Call::ExecuteBatch { target, .. }
            | Call::StreamExecute { target, .. } => Some(target),
            _ => None,
        }
    }
}

type DispatchHook = Box<dyn Fn(usize, &Context) + Send + Sync>;

/// Executor answering from a script
///
/// Replies are consumed in call order; once the script runs out every call
/// gets the fallback (success unless set). The hook runs on every call with
/// the call's index, which is how tests reshard mid-flight.
#[derive(Default)]
pub struct FakeExecutor {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<ExecutorError>>,
    calls: Mutex<Vec<Call>>,
    hook: Mutex<Option<DispatchHook>>,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
        let executor = Self::default();
        *executor.replies.lock() = replies.into();
        Arc::new(executor)
    }

    pub fn always_failing(err: ExecutorError) -> Arc<Self> {
        let executor = Self::default();
        *executor.fallback.lock() = Some(err);
        Arc::new(executor)
    }

    pub fn on_call(&self, hook: impl Fn(usize, &Context) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn targets(&self) -> Vec<ShardTarget> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| call.target().cloned())
            .collect()
    }

    fn record(&self, ctx: &Context, call: Call) -> Reply {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(call);
            calls.len() - 1
        };
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(index, ctx);
        }
        match self.replies.lock().pop_front() {
            Some(reply) => reply,
            None => match self.fallback.lock().clone() {
                Some(err) => Reply::Fail(err),
                None => Reply::Ok,
            },
        }
    }

    async fn respond(&self, reply: Reply) -> ExecResult<()> {
        match reply {
            Reply::Ok => Ok(()),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Join every target shard to the session's transaction
fn join_transaction(target: &ShardTarget, session: &SafeSession) {
    if !session.in_transaction() || target.not_in_transaction {
        return;
    }
    for shard in &target.shards {
        if session.find(&target.keyspace, shard, target.tablet_type) == 0 {
            session.append(ShardSession {
                keyspace: target.keyspace.clone(),
                shard: shard.clone(),
                tablet_type: target.tablet_type,
                transaction_id: 1000,
            });
        }
    }
}

fn shard_result(target: &ShardTarget) -> QueryResult {
    let mut result = QueryResult::new();
    result.rows_affected = target.shards.len() as u64;
    result
}

#[async_trait]
impl ShardExecutor for FakeExecutor {
    async fn initialize_connections(&self, ctx: &Context) -> ExecResult<()> {
        let reply = self.record(ctx, Call::InitializeConnections);
        self.respond(reply).await
    }

    async fn execute(
        &self,
        ctx: &Context,
        query: &BoundQuery,
        target: &ShardTarget,
        session: &SafeSession,
    ) -> ExecResult<QueryResult> {
        let reply = self.record(
            ctx,
            Call::Execute {
                sql: query.sql.clone(),
                target: target.clone(),
            },
        );
        self.respond(reply).await?;
        join_transaction(target, session);
        Ok(shard_result(target))
    }

    async fn execute_entity_ids(
        &self,
        ctx: &Context,
        plan: &EntityShardPlan,
        target: &ShardTarget,
        session: &SafeSession,
    ) -> ExecResult<QueryResult> {
        let reply = self.record(
            ctx,
            Call::ExecuteEntityIds {
                plan: plan.clone(),
                target: target.clone(),
            },
        );
        self.respond(reply).await?;
        join_transaction(target, session);
        Ok(shard_result(target))
    }

    async fn execute_batch(
        &self,
        ctx: &Context,
        queries: &[BoundQuery],
        target: &ShardTarget,
        session: &SafeSession,
    ) -> ExecResult<QueryResultList> {
        let reply = self.record(
            ctx,
            Call::ExecuteBatch {
                sqls: queries.iter().map(|q| q.sql.clone()).collect(),
                target: target.clone(),
            },
        );
        self.respond(reply).await?;
        join_transaction(target, session);
        Ok(QueryResultList {
            list: queries.iter().map(|_| shard_result(target)).collect(),
        })
    }

    async fn stream_execute(
        &self,
        ctx: &Context,
        query: &BoundQuery,
        target: &ShardTarget,
        _session: &SafeSession,
        send_reply: SendReply<'_>,
    ) -> ExecResult<()> {
        let reply = self.record(
            ctx,
            Call::StreamExecute {
                sql: query.sql.clone(),
                target: target.clone(),
            },
        );
        self.respond(reply).await?;
        for shard in &target.shards {
            let mut result = QueryResult::new();
            result.rows.push(vec![Value::from(shard.as_str())]);
            send_reply(result).map_err(|e| ExecutorError::internal(e.to_string()))?;
        }
        Ok(())
    }

    async fn commit(&self, ctx: &Context, session: &SafeSession) -> ExecResult<()> {
        let reply = self.record(ctx, Call::Commit);
        self.respond(reply).await?;
        session.reset();
        Ok(())
    }

    async fn rollback(&self, ctx: &Context, session: &SafeSession) -> ExecResult<()> {
        let reply = self.record(ctx, Call::Rollback);
        self.respond(reply).await?;
        session.reset();
        Ok(())
    }
}
