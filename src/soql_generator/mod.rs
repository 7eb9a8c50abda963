//! SOQL generation: assembles complete statements from a [`QueryPlan`].
//!
//! [`QueryPlan`]: crate::query_plan::QueryPlan

pub mod assembler;
pub mod commands;
pub mod dialect;
pub mod errors;
pub mod execution;


pub use assembler::{CompiledQuery, SoqlCompiler};
pub use commands::{AggregateCommand, DeleteCommand, InsertCommand, UpdateCommand};
pub use dialect::{Dialect, DialectFeatures, SalesforceDialect};
pub use errors::SoqlGeneratorError;
pub use execution::{ChunkedRows, Connection, Cursor, QueryResult, ResultType};

pub type SoqlResult<T> = Result<T, SoqlGeneratorError>;
