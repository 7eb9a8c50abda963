//! Query Assembler
//!
//! Sequences the clauses of a SELECT:
//!
//! ```text
//! SETUP → DISTINCT → SELECT → FROM → WHERE → GROUP BY → HAVING
//!       → (EXPLAIN prefix) → ORDER BY → LIMIT/OFFSET → LOCKING
//! ```
//!
//! An empty [`CompiledQuery`] means the query matches no rows and must not be
//! sent at all.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::dialect::Dialect;
use super::errors::SoqlGeneratorError;
use super::SoqlResult;
use crate::config::{Capabilities, CompilerConfig};
use crate::field_rewriter::{DiagnosticSink, FieldPathRewriter, LogSink};
use crate::query_plan::{QueryPlan, SoqlValue, WhereNode};
use crate::topology::{TopologyCache, TopologyMap};
use crate::where_compiler::{Compiled, WhereCompiler};

/// Final query text with `%s` placeholders and its ordered parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SoqlValue>,
}

impl CompiledQuery {
    /// The "zero rows, no round trip" result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Restores the plan's alias reference counts when dropped.
pub(crate) struct RefcountGuard<'p> {
    plan: &'p mut QueryPlan,
    snapshot: BTreeMap<String, usize>,
}

impl<'p> RefcountGuard<'p> {
    pub(crate) fn new(plan: &'p mut QueryPlan) -> Self {
        let snapshot = plan.alias_refcount.clone();
        Self { plan, snapshot }
    }
}

impl Deref for RefcountGuard<'_> {
    type Target = QueryPlan;

    fn deref(&self) -> &QueryPlan {
        self.plan
    }
}

impl DerefMut for RefcountGuard<'_> {
    fn deref_mut(&mut self) -> &mut QueryPlan {
        self.plan
    }
}

impl Drop for RefcountGuard<'_> {
    fn drop(&mut self) {
        self.plan.reset_refcounts(std::mem::take(&mut self.snapshot));
    }
}

/// Rewriter configured for one plan: minimal aliases come from the query
/// options, the model or the global configuration.
pub(crate) fn build_rewriter<'r>(
    topology: &'r TopologyMap,
    plan: &QueryPlan,
    config: &'r CompilerConfig,
    sink: &'r dyn DiagnosticSink,
) -> FieldPathRewriter<'r> {
    let minimal = plan.options.minimal_aliases
        || config.minimal_aliases
        || plan.model.as_ref().is_some_and(|m| m.minimal_aliases);
    FieldPathRewriter::new(topology)
        .with_sink(sink)
        .with_minimal_aliases(minimal)
        .with_minimal_alias_tables(&config.minimal_alias_tables)
        .strict(config.strict_fragments)
}

pub(crate) fn compile_filter(
    compiler: &WhereCompiler<'_, '_>,
    node: Option<&WhereNode>,
) -> SoqlResult<Compiled> {
    match node {
        Some(node) => Ok(compiler.compile(node)?),
        None => Ok(Compiled::MatchesEverything),
    }
}

/// The single object named in FROM.
pub(crate) fn from_table(topology: &TopologyMap, plan: &QueryPlan) -> SoqlResult<String> {
    if let Some(root) = topology.root_table() {
        return Ok(root.to_string());
    }
    plan.model
        .as_ref()
        .map(|m| m.db_table.clone())
        .ok_or(SoqlGeneratorError::MissingFromTable)
}

pub struct SoqlCompiler<'a> {
    pub(crate) plan: &'a mut QueryPlan,
    pub(crate) dialect: &'a dyn Dialect,
    pub(crate) config: &'a CompilerConfig,
    pub(crate) capabilities: Capabilities,
    pub(crate) sink: &'a dyn DiagnosticSink,
    cache: TopologyCache,
}

impl<'a> SoqlCompiler<'a> {
    pub fn new(plan: &'a mut QueryPlan, dialect: &'a dyn Dialect, config: &'a CompilerConfig) -> Self {
        Self {
            plan,
            dialect,
            config,
            capabilities: config.capabilities(),
            sink: &LogSink,
            cache: TopologyCache::new(),
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn plan(&self) -> &QueryPlan {
        self.plan
    }

    pub fn topology_cache(&self) -> &TopologyCache {
        &self.cache
    }

    /// Alias → relationship path map of the plan, computed once per compiler.
    pub fn query_topology(&mut self) -> SoqlResult<Arc<TopologyMap>> {
        Ok(self.cache.get_or_resolve(&self.plan.alias_map)?)
    }

    /// Build the query text. With `with_limits == false` LIMIT/OFFSET are
    /// left out; `with_col_aliases` names unaliased columns `ColN`.
    pub fn as_sql(&mut self, with_limits: bool, with_col_aliases: bool) -> SoqlResult<CompiledQuery> {
        let dialect = self.dialect;
        let mut plan = RefcountGuard::new(&mut *self.plan);

        // SETUP
        let prepared = plan.pre_sql_setup();
        if with_limits && plan.high_mark == Some(plan.low_mark) {
            log::debug!("as_sql: empty slice at {}, no query needed", plan.low_mark);
            return Ok(CompiledQuery::empty());
        }

        let topology = self.cache.get_or_resolve(&plan.alias_map)?;
        let from = from_table(&topology, &plan)?;
        let rewriter = build_rewriter(&topology, &plan, self.config, self.sink);
        let filters = WhereCompiler::new(&rewriter);

        let (where_sql, where_params) = match compile_filter(&filters, plan.where_node.as_ref())? {
            Compiled::Sql(compiled) => (compiled.sql, compiled.params),
            Compiled::MatchesEverything => (String::new(), Vec::new()),
            Compiled::MatchesNothing => {
                log::debug!("as_sql: WHERE matches nothing, no query needed");
                return Ok(CompiledQuery::empty());
            }
        };
        let (having_sql, having_params) = match compile_filter(&filters, plan.having.as_ref())? {
            Compiled::Sql(compiled) => (compiled.sql, compiled.params),
            Compiled::MatchesEverything => (String::new(), Vec::new()),
            Compiled::MatchesNothing => {
                log::debug!("as_sql: HAVING matches nothing, no query needed");
                return Ok(CompiledQuery::empty());
            }
        };

        let mut params: Vec<SoqlValue> = Vec::new();
        let mut result: Vec<String> = vec!["SELECT".to_string()];

        // DISTINCT
        if plan.distinct {
            let (distinct, distinct_params) =
                dialect.distinct_sql(&prepared.distinct_fields, &prepared.distinct_params)?;
            result.extend(distinct);
            params.extend(distinct_params);
        }

        // SELECT
        let mut out_cols = Vec::with_capacity(prepared.select.len());
        let mut col_idx = 1;
        for column in &prepared.select {
            let mut sql = rewriter.rewrite(&column.sql)?;
            match &column.alias {
                // plain fields cannot be aliased, only function results
                Some(alias) => {
                    if sql.ends_with(')') {
                        sql = format!("{} {}", sql, dialect.quote_name(alias));
                    }
                }
                None if with_col_aliases => {
                    sql = format!("{} AS Col{}", sql, col_idx);
                    col_idx += 1;
                }
                None => {}
            }
            params.extend(column.params.iter().cloned());
            out_cols.push(sql);
        }
        result.push(out_cols.join(", "));

        // FROM
        result.push("FROM".to_string());
        result.push(from);

        // WHERE
        if !where_sql.is_empty() {
            result.push(format!("WHERE {}", where_sql));
            params.extend(where_params);
        }

        // GROUP BY
        let mut order_by = prepared.order_by;
        let mut grouping = Vec::with_capacity(prepared.group_by.len());
        for group in &prepared.group_by {
            grouping.push(rewriter.rewrite(&group.sql)?);
            params.extend(group.params.iter().cloned());
        }
        if !grouping.is_empty() {
            if !prepared.distinct_fields.is_empty() {
                return Err(SoqlGeneratorError::UnsupportedCombination(
                    "annotate() + distinct(fields)".to_string(),
                ));
            }
            if order_by.is_empty() {
                order_by = dialect.force_no_ordering();
            }
            result.push(format!("GROUP BY {}", grouping.join(", ")));
        }

        // HAVING
        if !having_sql.is_empty() {
            result.push(format!("HAVING {}", having_sql));
            params.extend(having_params);
        }

        // EXPLAIN
        if let Some(explain) = &plan.explain {
            let has_options = explain.format.is_some() || !explain.options.is_empty();
            if has_options && !self.capabilities.explain_options {
                return Err(SoqlGeneratorError::DialectCapability(
                    "EXPLAIN with format or options".to_string(),
                ));
            }
            let prefix = dialect.explain_query_prefix(explain.format.as_deref(), &explain.options)?;
            result.insert(0, prefix);
        }

        // ORDER BY
        if !order_by.is_empty() {
            let mut ordering = Vec::with_capacity(order_by.len());
            for order in &order_by {
                ordering.push(rewriter.rewrite(&order.sql)?);
                params.extend(order.params.iter().cloned());
            }
            result.push(format!("ORDER BY {}", ordering.join(", ")));
        }

        // LIMIT / OFFSET
        if with_limits {
            if let Some(high_mark) = plan.high_mark {
                result.push(format!("LIMIT {}", high_mark.saturating_sub(plan.low_mark)));
            }
            if plan.low_mark > 0 {
                if plan.high_mark.is_none() {
                    if let Some(no_limit) = dialect.no_limit_value() {
                        result.push(format!("LIMIT {}", no_limit));
                    }
                }
                result.push(format!("OFFSET {}", plan.low_mark));
            }
        }

        // LOCKING
        if plan.select_for_update && dialect.features().has_select_for_update {
            if dialect.autocommit() {
                return Err(SoqlGeneratorError::TransactionState);
            }
            let nowait = plan.select_for_update_nowait;
            if nowait && !dialect.features().has_select_for_update_nowait {
                return Err(SoqlGeneratorError::DialectCapability("NOWAIT".to_string()));
            }
            result.push(dialect.for_update_sql(nowait));
        }

        // tooling objects take no table qualification anywhere
        if let Some(model) = plan.model.as_ref().filter(|m| m.tooling_api) {
            let prefix = format!("{}.", model.db_table);
            for clause in result.iter_mut() {
                *clause = clause.replace(&prefix, "");
            }
        }

        let sql = result.join(" ");
        log::debug!("as_sql: {} params={:?}", sql, params);
        Ok(CompiledQuery { sql, params })
    }
}
