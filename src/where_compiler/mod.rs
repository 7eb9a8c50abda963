//! Boolean Tree Compiler
//!
//! Compiles WHERE/HAVING trees with three-valued short-circuiting: every
//! subtree yields concrete SQL, "matches everything" or "matches nothing".
//! Leaf text is rewritten through the [`FieldPathRewriter`] as soon as it is
//! compiled, so the returned SQL is already relationship-path qualified.

pub mod errors;
pub mod lookups;


pub use errors::WhereCompileError;
pub use lookups::LookupCompiler;

use crate::field_rewriter::FieldPathRewriter;
use crate::query_plan::{Connector, Lookup, SoqlValue, WhereChild, WhereNode};

pub type WhereCompileResult<T> = Result<T, WhereCompileError>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<SoqlValue>,
    /// Output of a nested node; the rewriter skips it.
    pub resolved: bool,
}

/// Result of compiling a subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    Sql(CompiledSql),
    MatchesEverything,
    MatchesNothing,
}

impl Compiled {
    pub fn is_matches_nothing(&self) -> bool {
        matches!(self, Compiled::MatchesNothing)
    }

    pub fn is_matches_everything(&self) -> bool {
        matches!(self, Compiled::MatchesEverything)
    }

    /// SQL text and params, or `None` for either short-circuit outcome.
    pub fn into_sql(self) -> Option<CompiledSql> {
        match self {
            Compiled::Sql(sql) => Some(sql),
            _ => None,
        }
    }
}

/// Compiles one leaf predicate to alias-qualified SQL.
pub trait LeafCompiler {
    fn compile_lookup(&self, lookup: &Lookup) -> WhereCompileResult<Compiled>;
}

static DEFAULT_LEAVES: LookupCompiler = LookupCompiler;

pub struct WhereCompiler<'r, 'a> {
    rewriter: &'r FieldPathRewriter<'a>,
    leaves: &'r dyn LeafCompiler,
}

impl<'r, 'a> WhereCompiler<'r, 'a> {
    pub fn new(rewriter: &'r FieldPathRewriter<'a>) -> Self {
        Self {
            rewriter,
            leaves: &DEFAULT_LEAVES,
        }
    }

    pub fn with_leaf_compiler(mut self, leaves: &'r dyn LeafCompiler) -> Self {
        self.leaves = leaves;
        self
    }

    pub fn compile(&self, node: &WhereNode) -> WhereCompileResult<Compiled> {
        let count = node.children.len();
        let (mut full_needed, mut empty_needed) = match node.connector {
            Connector::And => (count, 1),
            Connector::Or => (1, count),
        };

        let mut parts: Vec<String> = Vec::with_capacity(count);
        let mut params: Vec<SoqlValue> = Vec::new();

        for child in &node.children {
            match self.compile_child(child)? {
                Compiled::MatchesNothing => empty_needed -= 1,
                Compiled::MatchesEverything => full_needed -= 1,
                Compiled::Sql(compiled) if compiled.sql.is_empty() => full_needed -= 1,
                Compiled::Sql(compiled) => {
                    let sql = if compiled.resolved {
                        compiled.sql
                    } else {
                        self.rewriter.rewrite(&compiled.sql)?
                    };
                    parts.push(sql);
                    params.extend(compiled.params);
                }
            }

            if empty_needed == 0 {
                return Ok(if node.negated {
                    Compiled::MatchesEverything
                } else {
                    Compiled::MatchesNothing
                });
            }
            if full_needed == 0 {
                return Ok(if node.negated {
                    Compiled::MatchesNothing
                } else {
                    Compiled::MatchesEverything
                });
            }
        }

        let joined = parts.join(&format!(" {} ", node.connector.as_str()));
        if joined.is_empty() {
            return Ok(Compiled::MatchesEverything);
        }
        // NOT combined with AND/OR must always be grouped explicitly
        let sql = if node.negated {
            format!("(NOT ({}))", joined)
        } else if parts.len() > 1 || node.grouped {
            format!("({})", joined)
        } else {
            joined
        };

        Ok(Compiled::Sql(CompiledSql {
            sql,
            params,
            resolved: true,
        }))
    }

    fn compile_child(&self, child: &WhereChild) -> WhereCompileResult<Compiled> {
        match child {
            WhereChild::Node(node) => self.compile(node),
            WhereChild::Lookup(lookup) => self.leaves.compile_lookup(lookup),
            WhereChild::Raw { sql, params } => Ok(Compiled::Sql(CompiledSql {
                sql: sql.clone(),
                params: params.clone(),
                resolved: false,
            })),
            WhereChild::Everything => Ok(Compiled::MatchesEverything),
            WhereChild::Nothing => Ok(Compiled::MatchesNothing),
        }
    }
}
