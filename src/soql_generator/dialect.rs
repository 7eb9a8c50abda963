//! Dialect operations the assembler delegates to.

use std::collections::BTreeMap;

use super::errors::SoqlGeneratorError;
use super::SoqlResult;
use crate::query_plan::{RawFragment, SoqlValue};

/// Feature flags of a backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectFeatures {
    pub has_select_for_update: bool,
    pub has_select_for_update_nowait: bool,
    pub can_use_chunked_reads: bool,
    pub supports_explaining_query_execution: bool,
    pub has_bulk_insert: bool,
    pub can_return_rows_from_bulk_insert: bool,
    pub can_return_columns_from_insert: bool,
    pub can_return_multiple_columns_from_insert: bool,
}

pub trait Dialect {
    fn quote_name(&self, name: &str) -> String;

    /// Keywords and params for `SELECT DISTINCT`, optionally on fields.
    fn distinct_sql(
        &self,
        fields: &[String],
        params: &[SoqlValue],
    ) -> SoqlResult<(Vec<String>, Vec<SoqlValue>)>;

    fn for_update_sql(&self, nowait: bool) -> String;

    fn explain_query_prefix(
        &self,
        format: Option<&str>,
        options: &BTreeMap<String, String>,
    ) -> SoqlResult<String>;

    /// Sentinel LIMIT used when only an OFFSET is requested.
    fn no_limit_value(&self) -> Option<u64>;

    /// ORDER BY fragments injected after GROUP BY when no ordering is set.
    fn force_no_ordering(&self) -> Vec<RawFragment>;

    fn features(&self) -> &DialectFeatures;

    fn autocommit(&self) -> bool;
}

/// The Salesforce SOQL dialect.
#[derive(Debug, Clone)]
pub struct SalesforceDialect {
    features: DialectFeatures,
    autocommit: bool,
}

impl SalesforceDialect {
    pub const FEATURES: DialectFeatures = DialectFeatures {
        has_select_for_update: true,
        has_select_for_update_nowait: false,
        can_use_chunked_reads: true,
        supports_explaining_query_execution: true,
        has_bulk_insert: true,
        can_return_rows_from_bulk_insert: true,
        can_return_columns_from_insert: true,
        can_return_multiple_columns_from_insert: false,
    };

    pub fn new() -> Self {
        Self {
            features: Self::FEATURES,
            autocommit: true,
        }
    }

    /// Dialect state inside an explicit transaction block.
    pub fn in_transaction(mut self) -> Self {
        self.autocommit = false;
        self
    }

    pub fn with_features(mut self, features: DialectFeatures) -> Self {
        self.features = features;
        self
    }
}

impl Default for SalesforceDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for SalesforceDialect {
    fn quote_name(&self, name: &str) -> String {
        // identifiers are case insensitive and never quoted
        name.to_string()
    }

    fn distinct_sql(
        &self,
        fields: &[String],
        params: &[SoqlValue],
    ) -> SoqlResult<(Vec<String>, Vec<SoqlValue>)> {
        if !fields.is_empty() {
            return Err(SoqlGeneratorError::DialectCapability(
                "DISTINCT ON fields".to_string(),
            ));
        }
        Ok((vec!["DISTINCT".to_string()], params.to_vec()))
    }

    fn for_update_sql(&self, nowait: bool) -> String {
        if nowait {
            "FOR UPDATE NOWAIT".to_string()
        } else {
            "FOR UPDATE".to_string()
        }
    }

    fn explain_query_prefix(
        &self,
        format: Option<&str>,
        options: &BTreeMap<String, String>,
    ) -> SoqlResult<String> {
        if !self.features.supports_explaining_query_execution {
            return Err(SoqlGeneratorError::DialectCapability(
                "Explaining query execution".to_string(),
            ));
        }
        if let Some(format) = format {
            if !format.eq_ignore_ascii_case("TEXT") {
                return Err(SoqlGeneratorError::DialectCapability(format!(
                    "EXPLAIN format {}",
                    format
                )));
            }
        }
        if let Some(option) = options.keys().next() {
            return Err(SoqlGeneratorError::DialectCapability(format!(
                "EXPLAIN option {}",
                option
            )));
        }
        Ok("EXPLAIN".to_string())
    }

    fn no_limit_value(&self) -> Option<u64> {
        None
    }

    fn force_no_ordering(&self) -> Vec<RawFragment> {
        Vec::new()
    }

    fn features(&self) -> &DialectFeatures {
        &self.features
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }
}
