use std::cell::RefCell;
use std::fmt;

/// A fragment that was passed through without rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteWarning {
    pub fragment: String,
    pub reason: String,
}

impl fmt::Display for RewriteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Can not recompile unexpected fragment {:?}: {}",
            self.fragment, self.reason
        )
    }
}

/// Receiver of non-fatal rewrite warnings.
pub trait DiagnosticSink {
    fn warn(&self, warning: &RewriteWarning);
}

/// Forwards warnings to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn warn(&self, warning: &RewriteWarning) {
        log::warn!("{}", warning);
    }
}

/// Keeps warnings in memory so callers can report them after compilation.
#[derive(Debug, Default)]
pub struct CollectingSink {
    warnings: RefCell<Vec<RewriteWarning>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<RewriteWarning> {
        self.warnings.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn warn(&self, warning: &RewriteWarning) {
        log::warn!("{}", warning);
        self.warnings.borrow_mut().push(warning.clone());
    }
}
