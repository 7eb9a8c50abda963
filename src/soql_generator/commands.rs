//! Insert, update, delete and aggregate commands.
//!
//! Each command owns its own statement generation and execution glue and
//! shares the topology, rewriter and filter compiler with [`SoqlCompiler`].

use super::assembler::{build_rewriter, compile_filter, from_table, CompiledQuery, SoqlCompiler};
use super::dialect::Dialect;
use super::errors::SoqlGeneratorError;
use super::execution::{Connection, Cursor};
use super::SoqlResult;
use crate::config::{Capabilities, CompilerConfig};
use crate::field_rewriter::{DiagnosticSink, LogSink};
use crate::query_plan::{QueryOptions, QueryPlan, Row, SelectItem, SoqlValue, TableMeta};
use crate::topology::resolve_topology;
use crate::where_compiler::{Compiled, WhereCompiler};

/// `INSERT INTO <table> (<fields>) VALUES (...)[, (...)]`
pub struct InsertCommand<'a> {
    pub table: &'a TableMeta,
    pub fields: Vec<String>,
    pub objs: Vec<Vec<SoqlValue>>,
    pub options: QueryOptions,
    dialect: &'a dyn Dialect,
    capabilities: Capabilities,
}

impl<'a> InsertCommand<'a> {
    pub fn new(
        table: &'a TableMeta,
        fields: Vec<String>,
        objs: Vec<Vec<SoqlValue>>,
        dialect: &'a dyn Dialect,
        config: &CompilerConfig,
    ) -> Self {
        Self {
            table,
            fields,
            objs,
            options: QueryOptions::default(),
            dialect,
            capabilities: config.capabilities(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn as_sql(&self) -> Vec<CompiledQuery> {
        if self.objs.is_empty() {
            return Vec::new();
        }
        let columns = self
            .fields
            .iter()
            .map(|f| self.dialect.quote_name(f))
            .collect::<Vec<_>>()
            .join(", ");
        let head = format!(
            "INSERT INTO {} ({}) VALUES ",
            self.dialect.quote_name(&self.table.db_table),
            columns
        );
        let row_placeholders = format!("({})", vec!["%s"; self.fields.len()].join(", "));

        if self.dialect.features().has_bulk_insert {
            let rows = vec![row_placeholders.as_str(); self.objs.len()].join(", ");
            return vec![CompiledQuery {
                sql: format!("{}{}", head, rows),
                params: self.objs.iter().flatten().cloned().collect(),
            }];
        }
        self.objs
            .iter()
            .map(|obj| CompiledQuery {
                sql: format!("{}{}", head, row_placeholders),
                params: obj.clone(),
            })
            .collect()
    }

    /// Run the insert and fetch `returning_fields` of the new rows.
    pub fn execute_sql(
        &self,
        connection: &dyn Connection,
        returning_fields: &[String],
    ) -> SoqlResult<Vec<Row>> {
        let features = self.dialect.features();
        let bulk = self.objs.len() > 1;
        if !returning_fields.is_empty() && self.objs.len() != 1 && !features.can_return_rows_from_bulk_insert {
            return Err(SoqlGeneratorError::UnsupportedCombination(
                "Returning fields from a bulk insert".to_string(),
            ));
        }
        let returns_columns =
            self.capabilities.insert_returning_columns && features.can_return_columns_from_insert;
        if returns_columns
            && !(bulk && features.can_return_rows_from_bulk_insert)
            && returning_fields.len() > 1
            && !features.can_return_multiple_columns_from_insert
        {
            return Err(SoqlGeneratorError::UnsupportedCombination(
                "Returning multiple columns from INSERT statements".to_string(),
            ));
        }

        let mut cursor = connection.cursor()?;
        cursor.prepare_query(&self.options);
        let result = self.run(cursor.as_mut(), returning_fields, returns_columns);
        cursor.close();
        result
    }

    fn run(
        &self,
        cursor: &mut dyn Cursor,
        returning_fields: &[String],
        returns_columns: bool,
    ) -> SoqlResult<Vec<Row>> {
        for query in self.as_sql() {
            log::debug!("insert: {}", query.sql);
            cursor.execute(&query.sql, &query.params)?;
        }
        if returning_fields.is_empty() {
            return Ok(Vec::new());
        }
        if self.objs.len() > 1 && self.dialect.features().can_return_rows_from_bulk_insert {
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetchone()? {
                rows.push(row);
            }
            return Ok(rows);
        }
        if returns_columns {
            return Ok(cursor.fetchone()?.into_iter().collect());
        }
        let id = cursor.last_insert_id()?.unwrap_or(SoqlValue::Null);
        Ok(vec![vec![id]])
    }
}

/// Filtered statement shared by update and delete.
/// `None` when the filter matches nothing.
fn compile_where(
    plan: &QueryPlan,
    config: &CompilerConfig,
    sink: &dyn DiagnosticSink,
) -> SoqlResult<Option<(String, String, Vec<SoqlValue>)>> {
    let topology = resolve_topology(&plan.alias_map)?;
    let table = from_table(&topology, plan)?;
    let rewriter = build_rewriter(&topology, plan, config, sink);
    let filters = WhereCompiler::new(&rewriter);
    match compile_filter(&filters, plan.where_node.as_ref())? {
        Compiled::MatchesNothing => Ok(None),
        Compiled::MatchesEverything => Ok(Some((table, String::new(), Vec::new()))),
        Compiled::Sql(compiled) => Ok(Some((table, compiled.sql, compiled.params))),
    }
}

fn run_counted(
    connection: &dyn Connection,
    options: &QueryOptions,
    query: &CompiledQuery,
) -> SoqlResult<i64> {
    if query.is_empty() {
        return Ok(0);
    }
    let mut cursor = connection.cursor()?;
    cursor.prepare_query(options);
    let executed = cursor.execute(&query.sql, &query.params);
    let count = cursor.rowcount();
    cursor.close();
    executed.map(|_| count)
}

/// `UPDATE <table> SET <field> = %s, ... [WHERE ...]`
pub struct UpdateCommand<'a> {
    plan: &'a QueryPlan,
    values: Vec<(String, SoqlValue)>,
    dialect: &'a dyn Dialect,
    config: &'a CompilerConfig,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> UpdateCommand<'a> {
    pub fn new(
        plan: &'a QueryPlan,
        values: Vec<(String, SoqlValue)>,
        dialect: &'a dyn Dialect,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            plan,
            values,
            dialect,
            config,
            sink: &LogSink,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn as_sql(&self) -> SoqlResult<CompiledQuery> {
        if self.values.is_empty() {
            return Ok(CompiledQuery::empty());
        }
        let Some((table, where_sql, where_params)) = compile_where(self.plan, self.config, self.sink)? else {
            return Ok(CompiledQuery::empty());
        };

        let mut params = Vec::with_capacity(self.values.len() + where_params.len());
        let assignments = self
            .values
            .iter()
            .map(|(field, value)| {
                params.push(value.clone());
                format!("{} = %s", self.dialect.quote_name(field))
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("UPDATE {} SET {}", self.dialect.quote_name(&table), assignments);
        if !where_sql.is_empty() {
            sql = format!("{} WHERE {}", sql, where_sql);
            params.extend(where_params);
        }
        Ok(CompiledQuery { sql, params })
    }

    /// Number of updated rows.
    pub fn execute_sql(&self, connection: &dyn Connection) -> SoqlResult<i64> {
        let query = self.as_sql()?;
        run_counted(connection, &self.plan.options, &query)
    }
}

/// `DELETE FROM <table> [WHERE ...]`
pub struct DeleteCommand<'a> {
    plan: &'a QueryPlan,
    dialect: &'a dyn Dialect,
    config: &'a CompilerConfig,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> DeleteCommand<'a> {
    pub fn new(plan: &'a QueryPlan, dialect: &'a dyn Dialect, config: &'a CompilerConfig) -> Self {
        Self {
            plan,
            dialect,
            config,
            sink: &LogSink,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn as_sql(&self) -> SoqlResult<CompiledQuery> {
        let Some((table, where_sql, params)) = compile_where(self.plan, self.config, self.sink)? else {
            return Ok(CompiledQuery::empty());
        };
        let mut sql = format!("DELETE FROM {}", self.dialect.quote_name(&table));
        if !where_sql.is_empty() {
            sql = format!("{} WHERE {}", sql, where_sql);
        }
        Ok(CompiledQuery { sql, params })
    }

    /// Number of deleted rows.
    pub fn execute_sql(&self, connection: &dyn Connection) -> SoqlResult<i64> {
        let query = self.as_sql()?;
        run_counted(connection, &self.plan.options, &query)
    }
}

/// Aggregates over a filtered query: the plan's projection is replaced by the
/// aggregates and ordering and slicing are dropped.
pub struct AggregateCommand<'a> {
    plan: QueryPlan,
    dialect: &'a dyn Dialect,
    config: &'a CompilerConfig,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> AggregateCommand<'a> {
    pub fn new(
        source: &QueryPlan,
        aggregates: Vec<SelectItem>,
        dialect: &'a dyn Dialect,
        config: &'a CompilerConfig,
    ) -> Self {
        let plan = QueryPlan {
            select: aggregates,
            extra_select: Vec::new(),
            order_by: Vec::new(),
            low_mark: 0,
            high_mark: None,
            select_for_update: false,
            explain: None,
            ..source.clone()
        };
        Self {
            plan,
            dialect,
            config,
            sink: &LogSink,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    fn compiler(&mut self) -> SoqlCompiler<'_> {
        SoqlCompiler::new(&mut self.plan, self.dialect, self.config).with_sink(self.sink)
    }

    pub fn as_sql(&mut self) -> SoqlResult<CompiledQuery> {
        self.compiler().as_sql(false, false)
    }

    /// The single row of aggregate values, `None` when nothing can match.
    pub fn execute_sql(&mut self, connection: &dyn Connection) -> SoqlResult<Option<Row>> {
        let query = self.as_sql()?;
        if query.is_empty() {
            return Ok(None);
        }
        let mut cursor = connection.cursor()?;
        cursor.prepare_query(&self.plan.options);
        let row = cursor
            .execute(&query.sql, &query.params)
            .and_then(|_| cursor.fetchone());
        cursor.close();
        row
    }
}
