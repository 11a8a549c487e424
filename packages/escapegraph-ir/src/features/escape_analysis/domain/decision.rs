//! Analysis outputs: per-site decisions, function summaries, diagnostics

use super::leaks::Leaks;
use super::location::LocAttrs;
use crate::features::ir::{FuncId, Site};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocDecision {
    Stack,
    Heap,
}

impl fmt::Display for AllocDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocDecision::Stack => write!(f, "stack"),
            AllocDecision::Heap => write!(f, "heap"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDecision {
    pub site: Site,
    pub func: Option<FuncId>,
    pub decision: AllocDecision,
    pub attrs: LocAttrs,
    /// Stack allocated and dead once the creating statement completes
    pub transient: bool,
}

impl SiteDecision {
    pub fn is_heap(&self) -> bool {
        self.decision == AllocDecision::Heap
    }
}

/// Frozen leak summaries of one function, one entry per parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub func: FuncId,
    pub params: Vec<Leaks>,
}

impl FunctionSummary {
    pub fn param(&self, i: usize) -> Option<&Leaks> {
        self.params.get(i)
    }
}

/// One hop of an explanation path: `dst = {&,*..}src`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub dst: String,
    pub src: String,
    pub derefs: i32,
    pub notes: Vec<String>,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = match self.derefs {
            d if d < 0 => "&".to_string(),
            d => "*".repeat(d as usize),
        };
        write!(f, "flow: {} = {}{}", self.dst, sigil, self.src)?;
        if !self.notes.is_empty() {
            write!(f, ": {}", self.notes.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeDiagnostic {
    pub func: Option<FuncId>,
    pub site: Option<Site>,
    pub message: String,
    /// Flow path that forced the escape (diagnostic level 2)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<FlowStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeStats {
    pub functions: usize,
    pub batches: usize,
    pub recursive_batches: usize,
    pub waves: usize,
    pub locations: usize,
    pub edges: usize,
    pub walks: usize,
    pub heap_sites: usize,
    pub stack_sites: usize,
    pub round_limit_hits: usize,
    pub duration_ms: u64,
}

impl EscapeStats {
    pub fn merge(&mut self, other: &EscapeStats) {
        self.locations += other.locations;
        self.edges += other.edges;
        self.walks += other.walks;
        self.heap_sites += other.heap_sites;
        self.stack_sites += other.stack_sites;
        self.round_limit_hits += other.round_limit_hits;
    }
}
