//! Escape analysis ports

use crate::errors::EscapeResult;
use crate::features::escape_analysis::domain::{EscapeReport, FunctionSummary, SummaryStore};
use crate::features::ir::{FuncId, Program};

/// Source of finalized callee summaries consulted while building a batch
pub trait SummaryProvider: Sync {
    fn summary(&self, func: FuncId) -> Option<&FunctionSummary>;
}

impl SummaryProvider for SummaryStore {
    fn summary(&self, func: FuncId) -> Option<&FunctionSummary> {
        self.get(func)
    }
}

/// Port trait for whole-program escape analyzers
pub trait EscapeAnalyzerPort {
    fn analyze(&self, program: &Program) -> EscapeResult<EscapeReport>;
}
