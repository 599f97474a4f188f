//! Retry-driven query resolver
//!
//! Every non-streaming call runs the same loop:
//!
//! ```text
//! RESOLVE ─▶ DISPATCH ─┬─▶ success ─────────────────────────▶ DONE
//!              ▲       ├─▶ other error ─────────────────────▶ FAILED
//!              │       └─▶ retry ─▶ RESOLVE again
//!              │                     ├─ route unchanged ────▶ FAILED (retry error)
//!              └──── route changed ──┘
//! ```
//!
//! A retry is only worth it when the topology moved underneath the call, so
//! each re-resolution is compared with the route that just failed. Streaming
//! calls resolve once and never retry: rows already handed to the caller
//! cannot be taken back.

use shardgate_router_core::{
    is_dml, Context, EntityResolver, EntityRoute, Route, RouteStrategy, ShardResolver, ShardSet,
    SrvTopoServer,
};
use shardgate_types::{
    BoundQuery, EntityIdsQuery, KeyRangeQuery, KeyspaceIdBatchQuery, KeyspaceIdQuery, QueryResult,
    QueryResultList, Session,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::error::{Result, RouterError};
use crate::executor::{ExecResult, ExecutorError, SendReply, ShardExecutor, ShardTarget};
use crate::session::SafeSession;

/// How a dispatch ended, as far as the retry loop is concerned
#[derive(Debug)]
enum Outcome<T> {
    Success(T),
    /// The shard mapping may be stale
    Retryable(ExecutorError),
    Fatal(ExecutorError),
}

impl<T> From<ExecResult<T>> for Outcome<T> {
    fn from(result: ExecResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) if err.is_retry() => Outcome::Retryable(err),
            Err(err) => Outcome::Fatal(err),
        }
    }
}

/// Routes queries to shards and retries them across resharding
pub struct Resolver {
    config: ResolverConfig,
    topo: Arc<dyn SrvTopoServer>,
    executor: Arc<dyn ShardExecutor>,
}

impl Resolver {
    /// Create a resolver; fails if `config` does not validate
    pub fn new(
        config: ResolverConfig,
        topo: Arc<dyn SrvTopoServer>,
        executor: Arc<dyn ShardExecutor>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        info!(
            cell = %config.cell,
            stats_name = %config.stats_name,
            max_reresolves = ?config.max_reresolves,
            "Creating resolver"
        );

        Ok(Self {
            config,
            topo,
            executor,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cell(&self) -> &str {
        &self.config.cell
    }

    /// Warm up executor connections
    pub async fn initialize_connections(&self, ctx: &Context) -> Result<()> {
        ctx.run(self.executor.initialize_connections(ctx)).await??;
        Ok(())
    }

    /// Execute a statement on the shards owning the given keyspace ids
    pub async fn execute_keyspace_ids(
        &self,
        ctx: &Context,
        query: &KeyspaceIdQuery,
        session: &mut Session,
    ) -> Result<QueryResult> {
        check_single_keyspace_id_dml(&[query.sql.as_str()], query.keyspace_ids.len())?;

        let strategy = ShardResolver::keyspace_ids(
            self.cell(),
            query.tablet_type,
            query.keyspace_ids.clone(),
        );
        let bound = BoundQuery {
            sql: query.sql.clone(),
            bind_variables: query.bind_variables.clone(),
        };
        self.execute(
            ctx,
            &strategy,
            &query.keyspace,
            &bound,
            session,
            query.not_in_transaction,
        )
        .await
    }

    /// Execute a statement on the shards overlapping the given key ranges
    pub async fn execute_key_ranges(
        &self,
        ctx: &Context,
        query: &KeyRangeQuery,
        session: &mut Session,
    ) -> Result<QueryResult> {
        let strategy =
            ShardResolver::key_ranges(self.cell(), query.tablet_type, query.key_ranges.clone());
        let bound = BoundQuery {
            sql: query.sql.clone(),
            bind_variables: query.bind_variables.clone(),
        };
        self.execute(
            ctx,
            &strategy,
            &query.keyspace,
            &bound,
            session,
            query.not_in_transaction,
        )
        .await
    }

    /// Execute one statement on the shards chosen by `strategy`, retrying
    /// whenever the executor reports a stale mapping and the topology moved.
    pub async fn execute<S>(
        &self,
        ctx: &Context,
        strategy: &S,
        keyspace: &str,
        query: &BoundQuery,
        session: &mut Session,
        not_in_transaction: bool,
    ) -> Result<QueryResult>
    where
        S: RouteStrategy<Route = ShardSet>,
    {
        let executor = self.executor.as_ref();
        let tablet_type = strategy.tablet_type();

        self.execute_with_retry(
            ctx,
            strategy,
            keyspace,
            session,
            move |route: ShardSet, safe: SafeSession| {
                let target = ShardTarget::from_route(&route, tablet_type, not_in_transaction);
                async move { executor.execute(ctx, query, &target, &safe).await }
            },
        )
        .await
    }

    /// Execute a statement restricted, per shard, to the entity ids that
    /// shard owns. Every retry rebuilds the per-shard statements.
    pub async fn execute_entity_ids(
        &self,
        ctx: &Context,
        query: &EntityIdsQuery,
        session: &mut Session,
    ) -> Result<QueryResult> {
        let executor = self.executor.as_ref();
        let strategy = EntityResolver::from_query(self.cell(), query);
        let tablet_type = query.tablet_type;
        let not_in_transaction = query.not_in_transaction;

        self.execute_with_retry(
            ctx,
            &strategy,
            &query.keyspace,
            session,
            move |route: EntityRoute, safe: SafeSession| {
                let target = ShardTarget::from_route(&route, tablet_type, not_in_transaction);
                async move {
                    executor
                        .execute_entity_ids(ctx, &route.plan, &target, &safe)
                        .await
                }
            },
        )
        .await
    }

    /// Execute a batch on the shards owning the given keyspace ids
    pub async fn execute_batch_keyspace_ids(
        &self,
        ctx: &Context,
        query: &KeyspaceIdBatchQuery,
        session: &mut Session,
    ) -> Result<QueryResultList> {
        let statements: Vec<&str> = query.queries.iter().map(|q| q.sql.as_str()).collect();
        check_single_keyspace_id_dml(&statements, query.keyspace_ids.len())?;

        let strategy = ShardResolver::keyspace_ids(
            self.cell(),
            query.tablet_type,
            query.keyspace_ids.clone(),
        );
        self.execute_batch(
            ctx,
            &strategy,
            &query.keyspace,
            &query.queries,
            session,
            query.not_in_transaction,
        )
        .await
    }

    /// Execute statements, in order, as one unit on the shards chosen by
    /// `strategy`. Retries the whole batch.
    pub async fn execute_batch<S>(
        &self,
        ctx: &Context,
        strategy: &S,
        keyspace: &str,
        queries: &[BoundQuery],
        session: &mut Session,
        not_in_transaction: bool,
    ) -> Result<QueryResultList>
    where
        S: RouteStrategy<Route = ShardSet>,
    {
        let executor = self.executor.as_ref();
        let tablet_type = strategy.tablet_type();

        self.execute_with_retry(
            ctx,
            strategy,
            keyspace,
            session,
            move |route: ShardSet, safe: SafeSession| {
                let target = ShardTarget::from_route(&route, tablet_type, not_in_transaction);
                async move { executor.execute_batch(ctx, queries, &target, &safe).await }
            },
        )
        .await
    }

    /// Stream a statement from the shards owning the given keyspace ids
    pub async fn stream_execute_keyspace_ids(
        &self,
        ctx: &Context,
        query: &KeyspaceIdQuery,
        session: &mut Session,
        send_reply: SendReply<'_>,
    ) -> Result<()> {
        check_single_keyspace_id_dml(&[query.sql.as_str()], query.keyspace_ids.len())?;

        let strategy = ShardResolver::keyspace_ids(
            self.cell(),
            query.tablet_type,
            query.keyspace_ids.clone(),
        );
        let bound = BoundQuery {
            sql: query.sql.clone(),
            bind_variables: query.bind_variables.clone(),
        };
        self.stream_execute(
            ctx,
            &strategy,
            &query.keyspace,
            &bound,
            session,
            query.not_in_transaction,
            send_reply,
        )
        .await
    }

    /// Stream a statement from the shards overlapping the given key ranges
    pub async fn stream_execute_key_ranges(
        &self,
        ctx: &Context,
        query: &KeyRangeQuery,
        session: &mut Session,
        send_reply: SendReply<'_>,
    ) -> Result<()> {
        let strategy =
            ShardResolver::key_ranges(self.cell(), query.tablet_type, query.key_ranges.clone());
        let bound = BoundQuery {
            sql: query.sql.clone(),
            bind_variables: query.bind_variables.clone(),
        };
        self.stream_execute(
            ctx,
            &strategy,
            &query.keyspace,
            &bound,
            session,
            query.not_in_transaction,
            send_reply,
        )
        .await
    }

    /// Stream a statement from the shards chosen by `strategy`.
    ///
    /// Resolves once and dispatches once. A retry error is returned as is.
    /// Results arrive in shard dispatch order with no cross-shard merge.
    #[allow(clippy::too_many_arguments)]
    pub async fn stream_execute<S>(
        &self,
        ctx: &Context,
        strategy: &S,
        keyspace: &str,
        query: &BoundQuery,
        session: &mut Session,
        not_in_transaction: bool,
        send_reply: SendReply<'_>,
    ) -> Result<()>
    where
        S: RouteStrategy<Route = ShardSet>,
    {
        let call_id = Uuid::new_v4();
        let route = self.resolve(ctx, call_id, strategy, keyspace).await?;
        let target = ShardTarget::from_route(&route, strategy.tablet_type(), not_in_transaction);

        debug!(
            call_id = %call_id,
            target = %target,
            "Dispatching stream"
        );

        let safe = SafeSession::new(session.clone());
        let result = ctx
            .run(
                self.executor
                    .stream_execute(ctx, query, &target, &safe, send_reply),
            )
            .await;
        *session = safe.into_session();

        if let Ok(Err(err)) = &result {
            if err.is_retry() {
                warn!(
                    resolver = %self.config.stats_name,
                    call_id = %call_id,
                    target = %target,
                    error = %err,
                    "Retry signal on stream, not retrying"
                );
            }
        }
        result??;
        Ok(())
    }

    /// Commit the session's transaction. Never retried.
    pub async fn commit(&self, ctx: &Context, session: &mut Session) -> Result<()> {
        let safe = SafeSession::new(session.clone());
        let result = ctx.run(self.executor.commit(ctx, &safe)).await;
        *session = safe.into_session();
        result??;
        Ok(())
    }

    /// Roll back the session's transaction. Never retried.
    pub async fn rollback(&self, ctx: &Context, session: &mut Session) -> Result<()> {
        let safe = SafeSession::new(session.clone());
        let result = ctx.run(self.executor.rollback(ctx, &safe)).await;
        *session = safe.into_session();
        result??;
        Ok(())
    }

    async fn resolve<S>(
        &self,
        ctx: &Context,
        call_id: Uuid,
        strategy: &S,
        keyspace: &str,
    ) -> Result<S::Route>
    where
        S: RouteStrategy,
    {
        let route = ctx
            .run(strategy.resolve(ctx, self.topo.as_ref(), keyspace))
            .await??;

        debug!(
            call_id = %call_id,
            kind = strategy.kind(),
            requested = %keyspace,
            keyspace = %route.keyspace(),
            shards = ?route.shard_names(),
            "Resolved shards"
        );
        Ok(route)
    }

    async fn execute_with_retry<S, T, D, Fut>(
        &self,
        ctx: &Context,
        strategy: &S,
        keyspace: &str,
        session: &mut Session,
        dispatch: D,
    ) -> Result<T>
    where
        S: RouteStrategy,
        D: Fn(S::Route, SafeSession) -> Fut,
        Fut: Future<Output = ExecResult<T>>,
    {
        let call_id = Uuid::new_v4();
        let mut route = self.resolve(ctx, call_id, strategy, keyspace).await?;
        let mut reresolves: u32 = 0;

        loop {
            ctx.check()?;
            debug!(
                call_id = %call_id,
                keyspace = %route.keyspace(),
                shards = ?route.shard_names(),
                attempt = reresolves + 1,
                "Dispatching"
            );

            let safe = SafeSession::new(session.clone());
            let result = ctx.run(dispatch(route.clone(), safe.clone())).await;
            *session = safe.into_session();

            let retry_err = match Outcome::from(result?) {
                Outcome::Success(value) => return Ok(value),
                Outcome::Fatal(err) => return Err(err.into()),
                Outcome::Retryable(err) => err,
            };

            if let Some(max) = self.config.max_reresolves {
                if reresolves >= max {
                    warn!(
                        resolver = %self.config.stats_name,
                        call_id = %call_id,
                        max_reresolves = max,
                        error = %retry_err,
                        "Re-resolve limit reached"
                    );
                    return Err(retry_err.into());
                }
            }

            let next = self.resolve(ctx, call_id, strategy, route.keyspace()).await?;
            reresolves += 1;

            if next.same_route(&route) {
                warn!(
                    resolver = %self.config.stats_name,
                    call_id = %call_id,
                    keyspace = %route.keyspace(),
                    shards = ?route.shard_names(),
                    error = %retry_err,
                    "Shard mapping unchanged, giving up"
                );
                return Err(retry_err.into());
            }

            info!(
                resolver = %self.config.stats_name,
                call_id = %call_id,
                old_keyspace = %route.keyspace(),
                new_keyspace = %next.keyspace(),
                old_shards = ?route.shard_names(),
                new_shards = ?next.shard_names(),
                "Resharding detected, retrying"
            );
            route = next;
        }
    }
}

/// Reject mutations addressed to more than one keyspace id
fn check_single_keyspace_id_dml(statements: &[&str], keyspace_ids: usize) -> Result<()> {
    if keyspace_ids > 1 && statements.iter().any(|sql| is_dml(sql)) {
        debug!(keyspace_ids, "Rejecting multi-keyspace-id DML");
        return Err(RouterError::MultiShardDml);
    }
    Ok(())
}
