//! Boolean filter trees as handed over by the upstream query planner.

use serde::{Deserialize, Serialize};

use super::values::SoqlValue;
use super::ColumnExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// An AND/OR node, optionally negated.
///
/// `grouped` marks a node the planner already treats as a parenthesized unit,
/// so a single child is still wrapped in parentheses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WhereNode {
    #[serde(default)]
    pub connector: Connector,
    #[serde(default)]
    pub children: Vec<WhereChild>,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub grouped: bool,
}

impl WhereNode {
    pub fn and(children: Vec<WhereChild>) -> Self {
        Self {
            connector: Connector::And,
            children,
            ..Default::default()
        }
    }

    pub fn or(children: Vec<WhereChild>) -> Self {
        Self {
            connector: Connector::Or,
            children,
            ..Default::default()
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Every column expression referenced by leaves of this tree.
    pub fn column_refs(&self) -> Vec<&ColumnExpr> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                WhereChild::Node(node) => out.extend(node.column_refs()),
                WhereChild::Lookup(lookup) => out.push(&lookup.lhs),
                WhereChild::Raw { .. } | WhereChild::Everything | WhereChild::Nothing => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WhereChild {
    Node(WhereNode),
    Lookup(Lookup),
    /// A pre-rendered fragment, e.g. from an `extra(where=...)` call.
    Raw {
        sql: String,
        #[serde(default)]
        params: Vec<SoqlValue>,
    },
    /// Matches every row (e.g. an empty `Q()`).
    Everything,
    /// Matches no row (e.g. `.none()`).
    Nothing,
}

impl WhereChild {
    pub fn lookup(lhs: ColumnExpr, kind: LookupKind, rhs: impl Into<LookupRhs>) -> Self {
        WhereChild::Lookup(Lookup {
            lhs,
            kind,
            rhs: rhs.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Exact,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    In,
    IsNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    pub lhs: ColumnExpr,
    pub kind: LookupKind,
    #[serde(default)]
    pub rhs: LookupRhs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupRhs {
    List(Vec<SoqlValue>),
    Value(SoqlValue),
}

impl Default for LookupRhs {
    fn default() -> Self {
        LookupRhs::Value(SoqlValue::Null)
    }
}

impl From<SoqlValue> for LookupRhs {
    fn from(value: SoqlValue) -> Self {
        LookupRhs::Value(value)
    }
}

impl From<&str> for LookupRhs {
    fn from(value: &str) -> Self {
        LookupRhs::Value(value.into())
    }
}

impl From<i64> for LookupRhs {
    fn from(value: i64) -> Self {
        LookupRhs::Value(value.into())
    }
}

impl From<bool> for LookupRhs {
    fn from(value: bool) -> Self {
        LookupRhs::Value(value.into())
    }
}

impl From<Vec<SoqlValue>> for LookupRhs {
    fn from(values: Vec<SoqlValue>) -> Self {
        LookupRhs::List(values)
    }
}
