use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RewriteError {
    /// Only raised in strict mode; otherwise reported as a warning.
    #[error("Cannot rewrite unexpected fragment {fragment:?}: {reason}")]
    Unrewritable { fragment: String, reason: String },

    #[error("Path '{path}' of alias '{alias}' does not start with the root path '{root}'")]
    PathOutsideRoot {
        alias: String,
        path: String,
        root: String,
    },
}
