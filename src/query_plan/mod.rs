//! Query plan model consumed by the SOQL compiler.
//!
//! A `QueryPlan` is what a generic relational planner hands over: a set of
//! aliased tables joined on foreign keys, projection/ordering/grouping lists,
//! filter trees and pagination marks. Everything here is alias-qualified
//! (`A.Name`); turning aliases into relationship paths is the compiler's job.

pub mod values;
pub mod where_node;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use values::{Row, SoqlValue};
pub use where_node::{Connector, Lookup, LookupKind, LookupRhs, WhereChild, WhereNode};

/// One entry of the planner's alias map.
///
/// `parent_alias == None` marks a standalone table (a root candidate).
/// `join_cols` holds `(parent column, child column)` pairs; the target dialect
/// only understands single-column joins to `Id`, which the resolver enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEdge {
    #[serde(default)]
    pub parent_alias: Option<String>,
    pub table_name: String,
    #[serde(default)]
    pub join_cols: Vec<(String, String)>,
    pub table_alias: String,
}

impl JoinEdge {
    pub fn base(table_name: &str, table_alias: &str) -> Self {
        Self {
            parent_alias: None,
            table_name: table_name.to_string(),
            join_cols: Vec::new(),
            table_alias: table_alias.to_string(),
        }
    }

    pub fn join(
        parent_alias: &str,
        table_name: &str,
        join_cols: (&str, &str),
        table_alias: &str,
    ) -> Self {
        Self {
            parent_alias: Some(parent_alias.to_string()),
            table_name: table_name.to_string(),
            join_cols: vec![(join_cols.0.to_string(), join_cols.1.to_string())],
            table_alias: table_alias.to_string(),
        }
    }
}

/// Metadata of the model the query was issued against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableMeta {
    pub db_table: String,
    /// Tooling API objects take no table qualification on the wire.
    #[serde(default)]
    pub tooling_api: bool,
    /// Forces minimal aliases for every query on this table.
    #[serde(default)]
    pub minimal_aliases: bool,
}

impl TableMeta {
    pub fn new(db_table: &str) -> Self {
        Self {
            db_table: db_table.to_string(),
            ..Default::default()
        }
    }
}

/// Column-shaped expression before alias rewriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnExpr {
    Column {
        alias: String,
        column: String,
    },
    /// Single-argument function or aggregate, e.g. `MAX(A.Amount)`.
    Function {
        name: String,
        arg: Box<ColumnExpr>,
    },
    /// Row count over the primary key, rendered as `COUNT(Id)`.
    CountAll,
    Raw {
        sql: String,
        #[serde(default)]
        params: Vec<SoqlValue>,
    },
}

impl ColumnExpr {
    pub fn col(alias: &str, column: &str) -> Self {
        ColumnExpr::Column {
            alias: alias.to_string(),
            column: column.to_string(),
        }
    }

    pub fn func(name: &str, arg: ColumnExpr) -> Self {
        ColumnExpr::Function {
            name: name.to_string(),
            arg: Box::new(arg),
        }
    }

    /// Render to an alias-qualified fragment plus its parameters.
    pub fn render(&self) -> RawFragment {
        match self {
            ColumnExpr::Column { alias, column } => RawFragment::new(format!("{}.{}", alias, column)),
            ColumnExpr::Function { name, arg } => {
                let inner = arg.render();
                RawFragment {
                    sql: format!("{}({})", name, inner.sql),
                    params: inner.params,
                }
            }
            ColumnExpr::CountAll => RawFragment::new("COUNT(Id)".to_string()),
            ColumnExpr::Raw { sql, params } => RawFragment {
                sql: sql.clone(),
                params: params.clone(),
            },
        }
    }

    /// The table alias this expression reads from, if any.
    pub fn alias(&self) -> Option<&str> {
        match self {
            ColumnExpr::Column { alias, .. } => Some(alias),
            ColumnExpr::Function { arg, .. } => arg.alias(),
            ColumnExpr::CountAll | ColumnExpr::Raw { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: ColumnExpr,
    #[serde(default)]
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: ColumnExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: ColumnExpr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expr: ColumnExpr,
    #[serde(default)]
    pub descending: bool,
    #[serde(default)]
    pub nulls: Option<NullsOrder>,
}

impl OrderByItem {
    pub fn asc(expr: ColumnExpr) -> Self {
        Self {
            expr,
            descending: false,
            nulls: None,
        }
    }

    pub fn desc(expr: ColumnExpr) -> Self {
        Self {
            expr,
            descending: true,
            nulls: None,
        }
    }

    fn render(&self) -> RawFragment {
        let mut fragment = self.expr.render();
        fragment.sql.push_str(if self.descending { " DESC" } else { " ASC" });
        match self.nulls {
            Some(NullsOrder::First) => fragment.sql.push_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => fragment.sql.push_str(" NULLS LAST"),
            None => {}
        }
        fragment
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExplainInfo {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Per-query switches; all but `minimal_aliases` are consumed by the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Include deleted and archived records (`queryAll`).
    #[serde(default)]
    pub query_all: bool,
    #[serde(default)]
    pub all_or_none: Option<bool>,
    #[serde(default)]
    pub edge_updates: bool,
    #[serde(default)]
    pub minimal_aliases: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFragment {
    pub sql: String,
    pub params: Vec<SoqlValue>,
}

impl RawFragment {
    pub fn new(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectFragment {
    pub sql: String,
    pub params: Vec<SoqlValue>,
    pub alias: Option<String>,
}

/// Output of [`QueryPlan::pre_sql_setup`]: alias-qualified raw fragments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedColumns {
    pub select: Vec<SelectFragment>,
    pub order_by: Vec<RawFragment>,
    pub group_by: Vec<RawFragment>,
    pub distinct_fields: Vec<String>,
    pub distinct_params: Vec<SoqlValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub model: Option<TableMeta>,
    #[serde(default)]
    pub alias_map: Vec<JoinEdge>,
    #[serde(default)]
    pub alias_refcount: BTreeMap<String, usize>,
    #[serde(default)]
    pub select: Vec<SelectItem>,
    #[serde(default)]
    pub extra_select: Vec<SelectItem>,
    #[serde(default, rename = "where")]
    pub where_node: Option<WhereNode>,
    #[serde(default)]
    pub group_by: Vec<ColumnExpr>,
    #[serde(default)]
    pub having: Option<WhereNode>,
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub distinct_fields: Vec<ColumnExpr>,
    #[serde(default)]
    pub low_mark: u64,
    #[serde(default)]
    pub high_mark: Option<u64>,
    #[serde(default)]
    pub select_for_update: bool,
    #[serde(default)]
    pub select_for_update_nowait: bool,
    #[serde(default)]
    pub explain: Option<ExplainInfo>,
    #[serde(default)]
    pub options: QueryOptions,
}

impl QueryPlan {
    pub fn new(model: TableMeta) -> Self {
        Self {
            model: Some(model),
            ..Default::default()
        }
    }

    /// Apply a slice `[low, high)` the way the planner does for `qs[low:high]`.
    pub fn set_limits(&mut self, low: Option<u64>, high: Option<u64>) {
        if let Some(high) = high {
            self.high_mark = Some(match self.high_mark {
                Some(current) => current.min(self.low_mark + high),
                None => self.low_mark + high,
            });
        }
        if let Some(low) = low {
            self.low_mark = match self.high_mark {
                Some(current) => current.min(self.low_mark + low),
                None => self.low_mark + low,
            };
        }
    }

    pub fn ref_alias(&mut self, alias: &str) {
        *self.alias_refcount.entry(alias.to_string()).or_insert(0) += 1;
    }

    pub fn reset_refcounts(&mut self, to_counts: BTreeMap<String, usize>) {
        self.alias_refcount = to_counts;
    }

    /// Resolve projection, ordering, grouping and distinct fields into raw
    /// alias-qualified fragments, counting every alias reference on the way.
    pub fn pre_sql_setup(&mut self) -> PreparedColumns {
        let mut referenced: Vec<String> = Vec::new();
        let mut note = |expr: &ColumnExpr| {
            if let Some(alias) = expr.alias() {
                referenced.push(alias.to_string());
            }
        };

        let mut prepared = PreparedColumns::default();
        for item in self.select.iter().chain(self.extra_select.iter()) {
            note(&item.expr);
            let fragment = item.expr.render();
            prepared.select.push(SelectFragment {
                sql: fragment.sql,
                params: fragment.params,
                alias: item.alias.clone(),
            });
        }
        for item in &self.order_by {
            note(&item.expr);
            prepared.order_by.push(item.render());
        }
        for expr in &self.group_by {
            note(expr);
            prepared.group_by.push(expr.render());
        }
        for expr in &self.distinct_fields {
            note(expr);
            let fragment = expr.render();
            prepared.distinct_fields.push(fragment.sql);
            prepared.distinct_params.extend(fragment.params);
        }
        for tree in [&self.where_node, &self.having].into_iter().flatten() {
            for expr in tree.column_refs() {
                note(expr);
            }
        }

        for alias in referenced {
            self.ref_alias(&alias);
        }
        prepared
    }
}
