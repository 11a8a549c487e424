//! Decision & summary emitter
//!
//! Freezes a solved batch graph into per-site decisions, per-function leak
//! summaries and (optionally) human-readable diagnostics.

use crate::features::escape_analysis::domain::{
    AllocDecision, EscapeDiagnostic, EscapeStats, FlowHop, FlowStep, FunctionSummary, LeakKind,
    Leaks, LocationId, SiteDecision, Synthetic,
};
use crate::features::escape_analysis::infrastructure::call_graph::Batch;
use crate::features::escape_analysis::infrastructure::graph_builder::BatchGraph;
use crate::features::ir::{FuncId, FunctionDecl, Program, Site};

/// Everything a finished batch contributes to the report
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub batch: usize,
    pub decisions: Vec<SiteDecision>,
    pub summaries: Vec<FunctionSummary>,
    pub diagnostics: Vec<EscapeDiagnostic>,
    pub stats: EscapeStats,
}

pub struct DecisionEmitter<'a> {
    program: &'a Program,
    batch: &'a Batch,
    graph: &'a BatchGraph,
    diagnostic_level: u8,
}

impl<'a> DecisionEmitter<'a> {
    pub fn new(program: &'a Program, batch: &'a Batch, graph: &'a BatchGraph) -> Self {
        Self {
            program,
            batch,
            graph,
            diagnostic_level: 0,
        }
    }

    pub fn diagnostic_level(mut self, level: u8) -> Self {
        self.diagnostic_level = level;
        self
    }

    pub fn emit(&self) -> BatchOutput {
        let mut out = BatchOutput {
            batch: self.batch.index,
            ..Default::default()
        };

        for (id, loc) in self.graph.arena.iter() {
            let Some(site) = loc.site else { continue };
            if loc.is_global {
                continue;
            }
            let decision = if loc.escapes() {
                AllocDecision::Heap
            } else {
                AllocDecision::Stack
            };
            let transient = matches!(site, Site::Alloc(_))
                && decision == AllocDecision::Stack
                && !loc.attrs.persists();
            match decision {
                AllocDecision::Heap => out.stats.heap_sites += 1,
                AllocDecision::Stack => out.stats.stack_sites += 1,
            }
            if self.diagnostic_level >= 1 {
                if let Some(message) = self.decision_message(site, decision) {
                    let path = if decision == AllocDecision::Heap {
                        self.explain(id)
                    } else {
                        Vec::new()
                    };
                    out.diagnostics.push(EscapeDiagnostic {
                        func: loc.func,
                        site: Some(site),
                        message,
                        path,
                    });
                }
            }
            out.decisions.push(SiteDecision {
                site,
                func: loc.func,
                decision,
                attrs: loc.attrs,
                transient,
            });
        }

        for &func in &self.batch.functions {
            let Some(decl) = self.program.function(func) else {
                continue;
            };
            let summary = self.summarize(decl);
            if self.diagnostic_level >= 1 {
                self.leak_messages(decl, &summary, &mut out.diagnostics);
            }
            out.summaries.push(summary);
        }

        for diag in &out.diagnostics {
            tracing::debug!("{}: {}", self.func_label(diag.func), diag.message);
            for step in &diag.path {
                tracing::debug!("  {}", step);
            }
        }

        out.stats.locations = self.graph.arena.len();
        out.stats.edges = self.graph.arena.edge_count();
        out
    }

    fn summarize(&self, decl: &FunctionDecl) -> FunctionSummary {
        let params = decl
            .params
            .iter()
            .map(|p| {
                if decl.is_external() {
                    if decl.noescape {
                        Leaks::default()
                    } else {
                        Leaks::heap_leak()
                    }
                } else {
                    let mut leaks = self
                        .graph
                        .var_loc(*p)
                        .map(|id| self.graph.arena[id].leaks)
                        .unwrap_or_default();
                    leaks.optimize();
                    leaks
                }
            })
            .collect();
        FunctionSummary {
            func: decl.id,
            params,
        }
    }

    fn decision_message(&self, site: Site, decision: AllocDecision) -> Option<String> {
        match (site, decision) {
            (Site::Var(v), AllocDecision::Heap) => {
                Some(format!("moved to heap: {}", self.program.var_name(v)))
            }
            (Site::Var(_), AllocDecision::Stack) => None,
            (Site::Alloc(s), decision) => {
                let kind = self
                    .program
                    .site(s)
                    .map(|info| info.kind.describe())
                    .unwrap_or("allocation");
                Some(match decision {
                    AllocDecision::Heap => format!("{} escapes to heap", kind),
                    AllocDecision::Stack => format!("{} does not escape", kind),
                })
            }
        }
    }

    fn leak_messages(
        &self,
        decl: &FunctionDecl,
        summary: &FunctionSummary,
        out: &mut Vec<EscapeDiagnostic>,
    ) {
        for (&p, leaks) in decl.params.iter().zip(&summary.params) {
            let name = self.program.var_name(p);
            let mut messages = Vec::new();
            if leaks.is_empty() {
                messages.push(format!("{} does not escape", name));
            }
            for tag in leaks.tags() {
                messages.push(match tag.kind {
                    LeakKind::Heap if tag.derefs == 0 => format!("leaking param: {}", name),
                    LeakKind::Heap => format!("leaking param content: {}", name),
                    LeakKind::Result(i) => {
                        let result = decl
                            .results
                            .get(i)
                            .map(|r| self.program.var_name(*r).to_string())
                            .unwrap_or_else(|| format!("~r{}", i));
                        format!(
                            "leaking param: {} to result {} level={}",
                            name, result, tag.derefs
                        )
                    }
                    LeakKind::Mutator => format!("mutates param: {} derefs={}", name, tag.derefs),
                    LeakKind::Callee => format!("calls param: {} derefs={}", name, tag.derefs),
                });
            }
            out.extend(messages.into_iter().map(|message| EscapeDiagnostic {
                func: Some(decl.id),
                site: Some(Site::Var(p)),
                message,
                path: Vec::new(),
            }));
        }
    }

    fn explain(&self, id: LocationId) -> Vec<FlowStep> {
        if self.diagnostic_level < 2 {
            return Vec::new();
        }
        self.graph
            .explanations
            .get(&id)
            .map(|hops| hops.iter().map(|hop| self.step(hop)).collect())
            .unwrap_or_default()
    }

    fn step(&self, hop: &FlowHop) -> FlowStep {
        FlowStep {
            dst: self.describe(hop.dst),
            src: self.describe(hop.src),
            derefs: hop.derefs,
            notes: hop.notes.iter().map(|n| n.why.to_string()).collect(),
        }
    }

    /// Short name of a location for flow paths
    fn describe(&self, id: LocationId) -> String {
        let loc = &self.graph.arena[id];
        match (loc.site, loc.synthetic) {
            (Some(Site::Var(v)), _) => self.program.var_name(v).to_string(),
            (Some(Site::Alloc(s)), _) => self
                .program
                .site(s)
                .map(|info| info.kind.describe().to_string())
                .unwrap_or_else(|| format!("alloc#{}", s.0)),
            (None, Some(Synthetic::Heap)) => "{heap}".to_string(),
            (None, Some(Synthetic::Mutator)) => "{mutator}".to_string(),
            (None, Some(Synthetic::Callee)) => "{callee}".to_string(),
            (None, _) => "{temp}".to_string(),
        }
    }

    fn func_label(&self, func: Option<FuncId>) -> &str {
        func.map(|f| self.program.func_name(f)).unwrap_or("<global>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::escape_analysis::domain::SummaryStore;
    use crate::features::escape_analysis::infrastructure::call_graph::plan_batches;
    use crate::features::escape_analysis::infrastructure::graph_builder::LocationGraphBuilder;
    use crate::features::escape_analysis::infrastructure::solver::GraphSolver;
    use crate::features::ir::{Expr, ProgramBuilder, Stmt};

    fn run(program: &Program, level: u8) -> Vec<BatchOutput> {
        let plan = plan_batches(program);
        let summaries = SummaryStore::new();
        plan.batches
            .iter()
            .map(|batch| {
                let mut graph = LocationGraphBuilder::new(program, batch, &summaries)
                    .record_notes(level >= 2)
                    .build()
                    .unwrap();
                GraphSolver::new(program, &mut graph)
                    .record_paths(level >= 2)
                    .walk_all();
                DecisionEmitter::new(program, batch, &graph)
                    .diagnostic_level(level)
                    .emit()
            })
            .collect()
    }

    #[test]
    fn test_returned_address_is_heap_with_path() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let r = b.result(f, "~r0");
        let x = b.local(f, "x");
        b.set_body(
            f,
            vec![
                Stmt::decl(x, Some(Expr::int(0))),
                Stmt::ret(vec![Expr::addr_of(Expr::ident(x))]),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();
        let _ = r;

        let out = run(&program, 2);
        let decision = out[0]
            .decisions
            .iter()
            .find(|d| d.site == Site::Var(x))
            .unwrap();
        assert_eq!(decision.decision, AllocDecision::Heap);

        let diag = out[0]
            .diagnostics
            .iter()
            .find(|d| d.message == "moved to heap: x")
            .unwrap();
        assert_eq!(diag.path.len(), 1);
        assert_eq!(diag.path[0].to_string(), "flow: ~r0 = &x: return, address-of");
    }

    #[test]
    fn test_transient_allocation() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let alloc = b.new_alloc(f);
        b.set_body(f, vec![Stmt::expr(Expr::deref(alloc.clone()))])
            .unwrap();
        let program = b.build().unwrap();

        let out = run(&program, 1);
        let decision = &out[0].decisions[0];
        assert_eq!(decision.decision, AllocDecision::Stack);
        assert!(decision.transient);
        assert_eq!(out[0].diagnostics[0].message, "new does not escape");
    }

    #[test]
    fn test_external_summaries() {
        let mut b = ProgramBuilder::new();
        let ext = b.declare_function("memmove");
        b.param(ext, "dst");
        let pure = b.declare_function("len");
        b.param(pure, "s");
        b.mark_noescape(pure);
        let program = b.build().unwrap();

        let out = run(&program, 1);
        let all: Vec<&FunctionSummary> = out.iter().flat_map(|o| o.summaries.iter()).collect();
        let ext_summary = all.iter().find(|s| s.func == ext).unwrap();
        assert_eq!(ext_summary.params[0].heap(), Some(0));
        let pure_summary = all.iter().find(|s| s.func == pure).unwrap();
        assert!(pure_summary.params[0].is_empty());

        let messages: Vec<&str> = out
            .iter()
            .flat_map(|o| o.diagnostics.iter().map(|d| d.message.as_str()))
            .collect();
        assert!(messages.contains(&"leaking param: dst"));
        assert!(messages.contains(&"s does not escape"));
    }

    #[test]
    fn test_no_diagnostics_at_level_zero() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let p = b.param(f, "p");
        b.set_body(f, vec![Stmt::ret(vec![])]).unwrap();
        let program = b.build().unwrap();
        let _ = p;

        let out = run(&program, 0);
        assert!(out[0].diagnostics.is_empty());
        assert_eq!(out[0].summaries.len(), 1);
    }
}
