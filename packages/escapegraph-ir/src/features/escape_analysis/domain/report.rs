//! Whole-program analysis result

use super::decision::{AllocDecision, EscapeDiagnostic, EscapeStats, FunctionSummary, SiteDecision};
use super::summary::SummaryStore;
use crate::errors::{EscapeGraphError, EscapeResult};
use crate::features::ir::{FuncId, Site, SiteId, VarId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Decisions side table plus summaries, diagnostics and statistics
#[derive(Debug, Clone, Default)]
pub struct EscapeReport {
    pub(crate) decisions: BTreeMap<Site, SiteDecision>,
    pub(crate) summaries: SummaryStore,
    pub(crate) diagnostics: Vec<EscapeDiagnostic>,
    pub(crate) stats: EscapeStats,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    decisions: Vec<&'a SiteDecision>,
    summaries: Vec<&'a FunctionSummary>,
    diagnostics: &'a [EscapeDiagnostic],
    stats: &'a EscapeStats,
}

impl EscapeReport {
    pub fn decision(&self, site: Site) -> Option<AllocDecision> {
        self.decisions.get(&site).map(|d| d.decision)
    }

    pub fn var_decision(&self, var: VarId) -> Option<AllocDecision> {
        self.decision(Site::Var(var))
    }

    pub fn alloc_decision(&self, site: SiteId) -> Option<AllocDecision> {
        self.decision(Site::Alloc(site))
    }

    pub fn site_decision(&self, site: Site) -> Option<&SiteDecision> {
        self.decisions.get(&site)
    }

    pub fn is_heap(&self, site: Site) -> bool {
        self.decision(site) == Some(AllocDecision::Heap)
    }

    /// All decisions in site order
    pub fn decisions(&self) -> impl Iterator<Item = &SiteDecision> + '_ {
        self.decisions.values()
    }

    pub fn summary(&self, func: FuncId) -> Option<&FunctionSummary> {
        self.summaries.get(func)
    }

    pub fn summaries(&self) -> &SummaryStore {
        &self.summaries
    }

    pub fn diagnostics(&self) -> &[EscapeDiagnostic] {
        &self.diagnostics
    }

    /// Diagnostic messages, in emission order
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn stats(&self) -> &EscapeStats {
        &self.stats
    }

    pub fn to_json(&self) -> EscapeResult<String> {
        let doc = ReportJson {
            decisions: self.decisions.values().collect(),
            summaries: self.summaries.sorted(),
            diagnostics: &self.diagnostics,
            stats: &self.stats,
        };
        serde_json::to_string_pretty(&doc)
            .map_err(|e| EscapeGraphError::internal(format!("report serialization: {}", e)))
    }
}
