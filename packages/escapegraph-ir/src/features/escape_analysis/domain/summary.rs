//! Finalized function summaries

use super::decision::FunctionSummary;
use crate::errors::{EscapeGraphError, EscapeResult};
use crate::features::ir::FuncId;
use rustc_hash::FxHashMap;

/// Write-once store of function summaries
///
/// A summary enters the store when its batch completes and is never
/// replaced afterwards.
#[derive(Debug, Clone, Default)]
pub struct SummaryStore {
    summaries: FxHashMap<FuncId, FunctionSummary>,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, summary: FunctionSummary) -> EscapeResult<()> {
        if self.summaries.contains_key(&summary.func) {
            return Err(EscapeGraphError::SummaryFinalized(summary.func));
        }
        self.summaries.insert(summary.func, summary);
        Ok(())
    }

    pub fn get(&self, func: FuncId) -> Option<&FunctionSummary> {
        self.summaries.get(&func)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Summaries ordered by function id
    pub fn sorted(&self) -> Vec<&FunctionSummary> {
        let mut out: Vec<_> = self.summaries.values().collect();
        out.sort_by_key(|s| s.func);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::escape_analysis::domain::Leaks;

    #[test]
    fn test_insert_is_write_once() {
        let mut store = SummaryStore::new();
        let summary = FunctionSummary {
            func: FuncId(1),
            params: vec![Leaks::heap_leak()],
        };
        store.insert(summary.clone()).unwrap();
        assert_eq!(store.get(FuncId(1)), Some(&summary));
        assert!(matches!(
            store.insert(summary),
            Err(EscapeGraphError::SummaryFinalized(FuncId(1)))
        ));
        assert_eq!(store.len(), 1);
    }
}
