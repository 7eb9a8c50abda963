use thiserror::Error;

use crate::field_rewriter::RewriteError;
use crate::query_plan::LookupKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WhereCompileError {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("Lookup {kind:?} on '{lhs}' expects {expected}")]
    InvalidLookupValue {
        lhs: String,
        kind: LookupKind,
        expected: &'static str,
    },
}
