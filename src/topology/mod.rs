//! Alias Graph Resolver
//!
//! SOQL has no join syntax. A query names exactly one object in its FROM
//! clause and reaches related objects through dotted relationship names
//! (`Contact.Account.Owner.Name`). This module proves that the planner's
//! alias map is a tree with a single root and assigns every alias its
//! relationship path relative to that root.
//!
//! ## Rules
//!
//! - every join is a single foreign key column to the primary key `Id`
//! - an edge whose first join column is `Id` is a reverse join and is flipped,
//!   so the side holding the foreign key is always on top
//! - the root is the only alias that never appears below another alias
//! - relationship names come from the foreign key column:
//!   `AccountId` → `Account`, `Parent__c` → `Parent__r`

pub mod cache;
pub mod errors;


use std::collections::{BTreeMap, BTreeSet};

pub use cache::TopologyCache;
pub use errors::TopologyError;

use crate::query_plan::JoinEdge;

/// The target dialect's universal primary key.
pub const PRIMARY_KEY: &str = "Id";
pub const CUSTOM_FIELD_SUFFIX: &str = "__c";
pub const CUSTOM_RELATIONSHIP_SUFFIX: &str = "__r";

/// Alias → relationship path mapping for one query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologyMap {
    root_alias: Option<String>,
    /// Relative to the root; the root itself maps to "".
    paths: BTreeMap<String, String>,
    tables: BTreeMap<String, String>,
}

impl TopologyMap {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn root_alias(&self) -> Option<&str> {
        self.root_alias.as_deref()
    }

    pub fn root_table(&self) -> Option<&str> {
        self.root_alias.as_deref().and_then(|alias| self.table(alias))
    }

    pub fn is_root(&self, alias: &str) -> bool {
        self.root_alias.as_deref() == Some(alias)
    }

    /// Relationship path of `alias` relative to the root.
    pub fn path(&self, alias: &str) -> Option<&str> {
        self.paths.get(alias).map(String::as_str)
    }

    pub fn table(&self, alias: &str) -> Option<&str> {
        self.tables.get(alias).map(String::as_str)
    }

    /// Path prefixed by the root object name, e.g. `Contact.Account`.
    /// This is the qualifier used on the wire outside minimal-alias mode.
    pub fn qualified_path(&self, alias: &str) -> Option<String> {
        let path = self.path(alias)?;
        let root_table = self.root_table()?;
        if path.is_empty() {
            Some(root_table.to_string())
        } else {
            Some(format!("{}.{}", root_table, path))
        }
    }

    /// Whether `qualifier` is the output of a previous rewrite, in either the
    /// qualified or the root-relative form.
    pub fn is_resolved_qualifier(&self, qualifier: &str) -> bool {
        self.paths.keys().any(|alias| {
            self.path(alias) == Some(qualifier)
                || self.qualified_path(alias).as_deref() == Some(qualifier)
        })
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }
}

/// An edge after orientation: `top.foreign_key = bottom.Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrientedEdge<'a> {
    top: &'a str,
    foreign_key: &'a str,
    bottom: &'a str,
}

fn orient(edge: &JoinEdge) -> Result<Option<OrientedEdge<'_>>, TopologyError> {
    let Some(parent) = edge.parent_alias.as_deref() else {
        return Ok(None);
    };
    let (parent_column, child_column) = match edge.join_cols.as_slice() {
        [] => return Err(TopologyError::MissingJoinColumns(edge.table_alias.clone())),
        [pair] => (pair.0.as_str(), pair.1.as_str()),
        pairs => {
            return Err(TopologyError::MultiColumnJoin {
                alias: edge.table_alias.clone(),
                count: pairs.len(),
            })
        }
    };

    if parent_column == PRIMARY_KEY {
        if child_column == PRIMARY_KEY {
            return Err(TopologyError::PrimaryKeySelfJoin(edge.table_alias.clone()));
        }
        // reverse join: the child table holds the foreign key
        return Ok(Some(OrientedEdge {
            top: &edge.table_alias,
            foreign_key: child_column,
            bottom: parent,
        }));
    }
    if child_column != PRIMARY_KEY {
        return Err(TopologyError::NotPrimaryKeyJoin {
            alias: edge.table_alias.clone(),
            parent_column: parent_column.to_string(),
            child_column: child_column.to_string(),
        });
    }
    Ok(Some(OrientedEdge {
        top: parent,
        foreign_key: parent_column,
        bottom: &edge.table_alias,
    }))
}

/// Relationship name for a foreign key column.
pub fn relationship_name(foreign_key: &str) -> Result<String, TopologyError> {
    if let Some(stem) = foreign_key.strip_suffix(CUSTOM_FIELD_SUFFIX) {
        if !stem.is_empty() {
            return Ok(format!("{}{}", stem, CUSTOM_RELATIONSHIP_SUFFIX));
        }
    }
    match foreign_key.strip_suffix(PRIMARY_KEY) {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => Err(TopologyError::UnrecognizedForeignKey(foreign_key.to_string())),
    }
}

/// Resolve the alias map into a [`TopologyMap`].
///
/// An empty edge list yields an empty map (expression-only queries).
pub fn resolve_topology(edges: &[JoinEdge]) -> Result<TopologyMap, TopologyError> {
    if edges.is_empty() {
        return Ok(TopologyMap::default());
    }

    let mut tables: BTreeMap<String, String> = BTreeMap::new();
    for edge in edges {
        if tables
            .insert(edge.table_alias.clone(), edge.table_name.clone())
            .is_some()
        {
            return Err(TopologyError::DuplicateAlias(edge.table_alias.clone()));
        }
    }

    let mut oriented = Vec::with_capacity(edges.len());
    let mut parent_side: BTreeSet<&str> = BTreeSet::new();
    let mut child_side: BTreeSet<&str> = BTreeSet::new();
    for edge in edges {
        match orient(edge)? {
            Some(o) => {
                parent_side.insert(o.top);
                child_side.insert(o.bottom);
                oriented.push(o);
            }
            None => {
                parent_side.insert(&edge.table_alias);
            }
        }
    }

    if let Some(unknown) = parent_side
        .union(&child_side)
        .find(|alias| !tables.contains_key(**alias))
    {
        return Err(TopologyError::UnknownAlias(unknown.to_string()));
    }

    let roots: Vec<String> = parent_side
        .difference(&child_side)
        .map(|alias| alias.to_string())
        .collect();
    let root = match roots.as_slice() {
        [root] => root.clone(),
        _ => return Err(TopologyError::RootCount(roots)),
    };

    let mut paths: BTreeMap<String, String> = BTreeMap::new();
    paths.insert(root.clone(), String::new());
    let mut frontier: Vec<&str> = vec![root.as_str()];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for edge in &oriented {
            if !frontier.contains(&edge.top) {
                continue;
            }
            if paths.contains_key(edge.bottom) {
                return Err(TopologyError::NotATree(edge.bottom.to_string()));
            }
            let name = relationship_name(edge.foreign_key)?;
            let parent_path = paths.get(edge.top).cloned().unwrap_or_default();
            let path = if parent_path.is_empty() {
                name
            } else {
                format!("{}.{}", parent_path, name)
            };
            paths.insert(edge.bottom.to_string(), path);
            next.push(edge.bottom);
        }
        frontier = next;
    }

    if paths.len() != tables.len() {
        let unresolved: Vec<String> = tables
            .keys()
            .filter(|alias| !paths.contains_key(*alias))
            .cloned()
            .collect();
        return Err(TopologyError::Disconnected(unresolved));
    }

    log::debug!("resolve_topology: root={} paths={:?}", root, paths);
    Ok(TopologyMap {
        root_alias: Some(root),
        paths,
        tables,
    })
}
