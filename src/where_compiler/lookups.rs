//! Default leaf compiler for planner lookups.

use super::errors::WhereCompileError;
use super::{Compiled, CompiledSql, LeafCompiler, WhereCompileResult};
use crate::query_plan::{Lookup, LookupKind, LookupRhs, SoqlValue};

/// Renders lookups as alias-qualified SOQL predicates with `%s` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupCompiler;

fn comparison_operator(kind: LookupKind) -> &'static str {
    match kind {
        LookupKind::Gt => ">",
        LookupKind::Gte => ">=",
        LookupKind::Lt => "<",
        LookupKind::Lte => "<=",
        _ => "=",
    }
}

/// Escape LIKE wildcards so the value matches literally.
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl LeafCompiler for LookupCompiler {
    fn compile_lookup(&self, lookup: &Lookup) -> WhereCompileResult<Compiled> {
        let lhs = lookup.lhs.render();
        let mut params = lhs.params;
        let invalid = |expected: &'static str| WhereCompileError::InvalidLookupValue {
            lhs: lhs.sql.clone(),
            kind: lookup.kind,
            expected,
        };

        let sql = match (lookup.kind, &lookup.rhs) {
            (LookupKind::Exact, LookupRhs::Value(SoqlValue::Null)) => format!("{} = null", lhs.sql),
            (LookupKind::IsNull, LookupRhs::Value(SoqlValue::Bool(is_null))) => {
                let op = if *is_null { "=" } else { "!=" };
                format!("{} {} null", lhs.sql, op)
            }
            (LookupKind::IsNull, _) => return Err(invalid("a boolean")),
            (
                kind @ (LookupKind::Exact
                | LookupKind::Gt
                | LookupKind::Gte
                | LookupKind::Lt
                | LookupKind::Lte),
                LookupRhs::Value(value),
            ) => {
                params.push(value.clone());
                format!("{} {} %s", lhs.sql, comparison_operator(kind))
            }
            (
                kind @ (LookupKind::Contains | LookupKind::StartsWith | LookupKind::EndsWith),
                LookupRhs::Value(SoqlValue::Text(text)),
            ) => {
                let escaped = escape_like(text);
                let pattern = match kind {
                    LookupKind::Contains => format!("%{}%", escaped),
                    LookupKind::StartsWith => format!("{}%", escaped),
                    _ => format!("%{}", escaped),
                };
                params.push(SoqlValue::Text(pattern));
                format!("{} LIKE %s", lhs.sql)
            }
            (LookupKind::Contains | LookupKind::StartsWith | LookupKind::EndsWith, _) => {
                return Err(invalid("a text value"))
            }
            (LookupKind::In, LookupRhs::List(values)) => {
                if values.is_empty() {
                    return Ok(Compiled::MatchesNothing);
                }
                let placeholders = vec!["%s"; values.len()].join(", ");
                params.extend(values.iter().cloned());
                format!("{} IN ({})", lhs.sql, placeholders)
            }
            (LookupKind::In, _) => return Err(invalid("a list of values")),
            (_, LookupRhs::List(_)) => return Err(invalid("a single value")),
        };

        Ok(Compiled::Sql(CompiledSql {
            sql,
            params,
            resolved: false,
        }))
    }
}
