//! Routing compiled queries to a cursor according to the requested result shape.

use super::assembler::SoqlCompiler;
use super::errors::SoqlGeneratorError;
use super::SoqlResult;
use crate::query_plan::{QueryOptions, Row, SoqlValue};

/// Result shape requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    /// All rows, fetched in chunks.
    #[default]
    Multi,
    /// The first row only.
    Single,
    /// The executed cursor, for the caller to read and close.
    Cursor,
    /// Number of affected or matched rows.
    RowCount,
    NoResults,
}

#[cfg_attr(test, mockall::automock)]
pub trait Cursor {
    /// Hand per-query options (`queryAll`, `allOrNone`, ...) to the cursor.
    fn prepare_query(&mut self, options: &QueryOptions);
    fn execute(&mut self, sql: &str, params: &[SoqlValue]) -> SoqlResult<()>;
    fn fetchone(&mut self) -> SoqlResult<Option<Row>>;
    /// An empty batch means the result set is exhausted.
    fn fetchmany(&mut self, size: usize) -> SoqlResult<Vec<Row>>;
    fn rowcount(&self) -> i64;
    fn last_insert_id(&mut self) -> SoqlResult<Option<SoqlValue>>;
    fn close(&mut self);
}

pub trait Connection {
    fn cursor(&self) -> SoqlResult<Box<dyn Cursor>>;
}

/// Lazily fetched row batches; closes the cursor once exhausted or dropped.
pub struct ChunkedRows {
    cursor: Box<dyn Cursor>,
    chunk_size: usize,
    done: bool,
}

impl ChunkedRows {
    pub fn new(cursor: Box<dyn Cursor>, chunk_size: usize) -> Self {
        Self {
            cursor,
            chunk_size,
            done: false,
        }
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.cursor.close();
        }
    }
}

impl Iterator for ChunkedRows {
    type Item = SoqlResult<Vec<Row>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.fetchmany(self.chunk_size) {
            Ok(rows) if rows.is_empty() => {
                self.finish();
                None
            }
            Ok(rows) => Some(Ok(rows)),
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl Drop for ChunkedRows {
    fn drop(&mut self) {
        self.finish();
    }
}

pub enum QueryResult {
    /// Fully materialised rows.
    Rows(Vec<Row>),
    Chunks(ChunkedRows),
    Single(Option<Row>),
    RowCount(i64),
    Cursor(Box<dyn Cursor>),
    NoResults,
}

impl QueryResult {
    /// Collect every row, draining a chunked result if necessary.
    pub fn into_rows(self) -> SoqlResult<Vec<Row>> {
        match self {
            QueryResult::Rows(rows) => Ok(rows),
            QueryResult::Chunks(chunks) => {
                let mut rows = Vec::new();
                for chunk in chunks {
                    rows.extend(chunk?);
                }
                Ok(rows)
            }
            QueryResult::Single(row) => Ok(row.into_iter().collect()),
            QueryResult::RowCount(_) | QueryResult::Cursor(_) | QueryResult::NoResults => Ok(Vec::new()),
        }
    }
}

impl SoqlCompiler<'_> {
    /// Compile and run the query, shaping the result as requested.
    ///
    /// A query that matches no rows never reaches the connection: `Multi`
    /// yields no rows and every other shape yields `NoResults`.
    pub fn execute_sql(
        &mut self,
        connection: &dyn Connection,
        result_type: ResultType,
        chunked_fetch: bool,
        chunk_size: usize,
    ) -> SoqlResult<QueryResult> {
        if result_type == ResultType::RowCount && !self.capabilities.row_count_result {
            return Err(SoqlGeneratorError::DialectCapability(
                "Row count result type".to_string(),
            ));
        }

        let query = self.as_sql(true, false)?;
        if query.is_empty() {
            return Ok(match result_type {
                ResultType::Multi => QueryResult::Rows(Vec::new()),
                _ => QueryResult::NoResults,
            });
        }

        let mut cursor = connection.cursor()?;
        cursor.prepare_query(&self.plan.options);
        let executed = cursor.execute(&query.sql, &query.params);
        if executed.is_err() {
            cursor.close();
        }
        executed?;

        match result_type {
            ResultType::Cursor => Ok(QueryResult::Cursor(cursor)),
            ResultType::RowCount => {
                let count = cursor.rowcount();
                cursor.close();
                Ok(QueryResult::RowCount(count))
            }
            ResultType::Single => {
                let row = cursor.fetchone();
                cursor.close();
                Ok(QueryResult::Single(row?))
            }
            ResultType::NoResults => {
                cursor.close();
                Ok(QueryResult::NoResults)
            }
            ResultType::Multi => {
                let chunks = ChunkedRows::new(cursor, chunk_size);
                if !chunked_fetch && !self.dialect.features().can_use_chunked_reads {
                    return QueryResult::Chunks(chunks).into_rows().map(QueryResult::Rows);
                }
                Ok(QueryResult::Chunks(chunks))
            }
        }
    }

    /// [`execute_sql`](Self::execute_sql) with the configured chunk size.
    pub fn execute(
        &mut self,
        connection: &dyn Connection,
        result_type: ResultType,
    ) -> SoqlResult<QueryResult> {
        let chunk_size = self.config.chunk_size;
        self.execute_sql(connection, result_type, false, chunk_size)
    }
}
