//! Field Path Rewriter
//!
//! Replaces alias-qualified references (`B.Name`) inside single-column SQL
//! fragments with relationship-path-qualified ones (`Contact.Name`), keeping
//! enclosing function calls and trailing operators, placeholders, `IN` lists
//! and column aliases verbatim.
//!
//! Fragments the parser does not recognise are passed through unchanged and
//! reported to a [`DiagnosticSink`], unless the rewriter is strict.

pub mod diagnostics;
pub mod errors;
pub mod fragment_parser;


pub use diagnostics::{CollectingSink, DiagnosticSink, LogSink, RewriteWarning};
pub use errors::RewriteError;
pub use fragment_parser::{parse_field_fragment, FieldFragment, FragmentTail};

use crate::topology::{TopologyMap, PRIMARY_KEY};

/// Trailing segment of a polymorphic reference discriminator, `Owner.Type`.
const TYPE_DISCRIMINATOR: &str = "Type";

/// Objects that only accept minimal aliases on the wire.
pub const DEFAULT_MINIMAL_ALIAS_TABLES: [&str; 5] = [
    "ContentDocumentLink",
    "ContentFolderItem",
    "ContentFolderMember",
    "IdeaComment",
    "Vote",
];

static LOG_SINK: LogSink = LogSink;

pub struct FieldPathRewriter<'a> {
    topology: &'a TopologyMap,
    minimal_aliases: bool,
    minimal_alias_tables: &'a [String],
    strict: bool,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> FieldPathRewriter<'a> {
    pub fn new(topology: &'a TopologyMap) -> Self {
        Self {
            topology,
            minimal_aliases: false,
            minimal_alias_tables: &[],
            strict: false,
            sink: &LOG_SINK,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_minimal_aliases(mut self, minimal_aliases: bool) -> Self {
        self.minimal_aliases = minimal_aliases;
        self
    }

    /// Tables (or aliases) that always use minimal aliases.
    pub fn with_minimal_alias_tables(mut self, tables: &'a [String]) -> Self {
        self.minimal_alias_tables = tables;
        self
    }

    /// Turn unrewritable fragments into [`RewriteError::Unrewritable`].
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn topology(&self) -> &TopologyMap {
        self.topology
    }

    /// Rewrite one fragment. Rewriting an already rewritten fragment is a no-op.
    pub fn rewrite(&self, fragment: &str) -> Result<String, RewriteError> {
        if fragment.starts_with('(') || is_count_all(fragment) {
            return Ok(fragment.to_string());
        }

        let parsed = match parse_field_fragment(fragment) {
            Ok((_, parsed)) => parsed,
            Err(_) => return self.unrewritable(fragment, "not a column expression"),
        };

        let Some((alias, field)) = self.split_core(&parsed.core) else {
            if self.is_resolved_core(&parsed.core) {
                return Ok(fragment.to_string());
            }
            return self.unrewritable(fragment, "expected exactly one table and one field");
        };

        let qualifier = self.qualifier_for(alias)?;
        let mut out = String::with_capacity(fragment.len() + qualifier.len());
        out.push_str(parsed.prefix);
        out.push_str(&qualifier);
        if !qualifier.is_empty() {
            out.push('.');
        }
        out.push_str(&field);
        out.push_str(parsed.suffix);

        log::trace!("rewrite: {:?} -> {:?}", fragment, out);
        Ok(out)
    }

    /// `[alias, field]` or `[alias, field, "Type"]` with a known alias.
    fn split_core<'f>(&self, core: &[&'f str]) -> Option<(&'f str, String)> {
        let (alias, field) = match core {
            [alias, field] => (*alias, field.to_string()),
            [alias, field, discriminator] if *discriminator == TYPE_DISCRIMINATOR => {
                (*alias, format!("{}.{}", field, discriminator))
            }
            _ => return None,
        };
        self.topology.path(alias)?;
        Some((alias, field))
    }

    /// A bare field, or a dotted core whose qualifier is already a path.
    fn is_resolved_core(&self, core: &[&str]) -> bool {
        match core.len() {
            0 => false,
            1 => true,
            n => {
                if self.topology.is_resolved_qualifier(&core[..n - 1].join(".")) {
                    return true;
                }
                // `Contact.Owner.Type` qualifies the polymorphic `Owner.Type`
                if core[n - 1] != TYPE_DISCRIMINATOR {
                    return false;
                }
                if n == 2 {
                    // a bare `Owner.Type` only comes from a root rendered without qualifier
                    return self
                        .topology
                        .root_alias()
                        .is_some_and(|root| self.uses_minimal_aliases(root));
                }
                self.topology.is_resolved_qualifier(&core[..n - 2].join("."))
            }
        }
    }

    fn uses_minimal_aliases(&self, alias: &str) -> bool {
        if self.minimal_aliases {
            return true;
        }
        let table = self.topology.table(alias);
        self.minimal_alias_tables
            .iter()
            .any(|name| name == alias || Some(name.as_str()) == table)
    }

    fn qualifier_for(&self, alias: &str) -> Result<String, RewriteError> {
        let qualified = self
            .topology
            .qualified_path(alias)
            .unwrap_or_else(|| alias.to_string());
        if !self.uses_minimal_aliases(alias) {
            return Ok(qualified);
        }
        if self.topology.is_root(alias) {
            return Ok(String::new());
        }

        let root = self
            .topology
            .root_alias()
            .and_then(|root| self.topology.qualified_path(root))
            .unwrap_or_default();
        match qualified
            .strip_prefix(root.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        {
            Some(relative) => Ok(relative.to_string()),
            None => Err(RewriteError::PathOutsideRoot {
                alias: alias.to_string(),
                path: qualified,
                root,
            }),
        }
    }

    fn unrewritable(&self, fragment: &str, reason: &str) -> Result<String, RewriteError> {
        if self.strict {
            return Err(RewriteError::Unrewritable {
                fragment: fragment.to_string(),
                reason: reason.to_string(),
            });
        }
        self.sink.warn(&RewriteWarning {
            fragment: fragment.to_string(),
            reason: reason.to_string(),
        });
        Ok(fragment.to_string())
    }
}

/// `COUNT(Id)` with an optional trailing column alias.
fn is_count_all(fragment: &str) -> bool {
    let count_all = format!("COUNT({})", PRIMARY_KEY);
    match fragment.strip_prefix(count_all.as_str()) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix(' ')
            .is_some_and(|alias| {
                !alias.is_empty() && alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            }),
        None => false,
    }
}
