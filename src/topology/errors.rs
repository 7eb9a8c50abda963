use thiserror::Error;

/// Structural problems with the alias graph. None of these can be repaired
/// locally: the query has no single-root relationship form.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TopologyError {
    #[error("Join to alias '{0}' has no join columns")]
    MissingJoinColumns(String),

    #[error("Join to alias '{alias}' uses {count} column pairs; only single-key relationships are supported")]
    MultiColumnJoin { alias: String, count: usize },

    #[error("Join to alias '{0}' joins the primary key 'Id' to itself")]
    PrimaryKeySelfJoin(String),

    #[error("Join to alias '{alias}' is not a foreign key to 'Id' ({parent_column} = {child_column})")]
    NotPrimaryKeyJoin {
        alias: String,
        parent_column: String,
        child_column: String,
    },

    #[error("Alias '{0}' is defined more than once")]
    DuplicateAlias(String),

    #[error("Alias '{0}' is used by a join but never defined")]
    UnknownAlias(String),

    #[error(
        "Query is not expressible as a single relationship tree: found {} root aliases {:?}. Rewrite it as a subquery.",
        .0.len(),
        .0
    )]
    RootCount(Vec<String>),

    #[error("Alias '{0}' is reachable by more than one relationship path")]
    NotATree(String),

    #[error("Aliases {0:?} are not connected to the root alias")]
    Disconnected(Vec<String>),

    #[error("Cannot derive a relationship name from foreign key column '{0}'")]
    UnrecognizedForeignKey(String),
}
