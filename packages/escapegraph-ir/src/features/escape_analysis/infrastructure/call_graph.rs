//! Call-graph batching
//!
//! Splits the program into batches analyzed bottom-up: each batch is one
//! strongly connected component of the static call graph over top-level
//! functions, plus every closure lexically nested in its members.
//!
//! Tarjan's algorithm completes an SCC only after every SCC reachable from
//! it, so emitting components in completion order yields callees first.
//!
//! # References
//! - Tarjan, R. "Depth-First Search and Linear Graph Algorithms" (1972)

use crate::features::ir::visit::{self, Visitor};
use crate::features::ir::{Expr, FuncId, Program};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::min;

/// Static references between top-level functions
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<FuncId>,
    adj: FxHashMap<FuncId, Vec<FuncId>>,
}

impl CallGraph {
    /// References made inside closures count for their outermost function
    pub fn build(program: &Program) -> Self {
        let mut graph = CallGraph::default();
        for func in program.top_level() {
            let mut collector = RefCollector {
                program,
                refs: Vec::new(),
                seen: FxHashSet::default(),
            };
            visit::walk_block(&mut collector, func.body());
            for closure in program.nested_closures(func.id) {
                if let Some(decl) = program.function(closure) {
                    visit::walk_block(&mut collector, decl.body());
                }
            }
            graph.nodes.push(func.id);
            graph.adj.insert(func.id, collector.refs);
        }
        graph
    }

    pub fn callees(&self, func: FuncId) -> &[FuncId] {
        self.adj.get(&func).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.values().map(Vec::len).sum()
    }
}

struct RefCollector<'a> {
    program: &'a Program,
    refs: Vec<FuncId>,
    seen: FxHashSet<FuncId>,
}

impl Visitor for RefCollector<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::FuncRef(f) = expr {
            if self.program.function(*f).is_some() {
                let target = self.program.outermost(*f);
                if self.seen.insert(target) {
                    self.refs.push(target);
                }
            }
        }
        visit::walk_expr(self, expr);
    }
}

/// Unit of analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position in bottom-up order
    pub index: usize,
    /// SCC members (top-level functions)
    pub roots: Vec<FuncId>,
    /// Roots followed by their nested closures
    pub functions: Vec<FuncId>,
    /// More than one member, or a member references itself
    pub recursive: bool,
    /// Dependency level: one more than the highest wave it calls into
    pub wave: usize,
}

impl Batch {
    pub fn contains(&self, func: FuncId) -> bool {
        self.functions.contains(&func)
    }
}

/// Batches in bottom-up order grouped into waves
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub batches: Vec<Batch>,
    /// `waves[w]` lists batch indices whose dependencies all lie in earlier waves
    pub waves: Vec<Vec<usize>>,
}

impl BatchPlan {
    pub fn batch_of(&self, func: FuncId) -> Option<&Batch> {
        self.batches.iter().find(|b| b.contains(func))
    }
}

/// Compute batches (callees before callers) and their waves
pub fn plan_batches(program: &Program) -> BatchPlan {
    let graph = CallGraph::build(program);

    let mut state = TarjanState::new();
    for &node in &graph.nodes {
        if !state.index.contains_key(&node) {
            tarjan_dfs(node, &graph, &mut state);
        }
    }

    let mut batches = Vec::with_capacity(state.sccs.len());
    let mut batch_of: FxHashMap<FuncId, usize> = FxHashMap::default();
    for mut scc in state.sccs {
        scc.sort();
        let index = batches.len();
        let recursive = scc.len() > 1 || graph.callees(scc[0]).contains(&scc[0]);

        let mut wave = 0;
        for &member in &scc {
            for callee in graph.callees(member) {
                if let Some(&b) = batch_of.get(callee) {
                    let callee_batch: &Batch = &batches[b];
                    wave = wave.max(callee_batch.wave + 1);
                }
            }
        }

        let mut functions = scc.clone();
        for &member in &scc {
            functions.extend(program.nested_closures(member));
            batch_of.insert(member, index);
        }

        batches.push(Batch {
            index,
            roots: scc,
            functions,
            recursive,
            wave,
        });
    }

    let wave_count = batches.iter().map(|b| b.wave + 1).max().unwrap_or(0);
    let mut waves = vec![Vec::new(); wave_count];
    for batch in &batches {
        waves[batch.wave].push(batch.index);
    }

    tracing::debug!(
        "call graph: {} functions, {} references, {} batches, {} waves",
        graph.node_count(),
        graph.edge_count(),
        batches.len(),
        waves.len()
    );

    BatchPlan { batches, waves }
}

struct TarjanState {
    index: FxHashMap<FuncId, usize>,
    lowlink: FxHashMap<FuncId, usize>,
    on_stack: FxHashSet<FuncId>,
    stack: Vec<FuncId>,
    current_index: usize,
    sccs: Vec<Vec<FuncId>>,
}

impl TarjanState {
    fn new() -> Self {
        Self {
            index: FxHashMap::default(),
            lowlink: FxHashMap::default(),
            on_stack: FxHashSet::default(),
            stack: Vec::new(),
            current_index: 0,
            sccs: Vec::new(),
        }
    }
}

fn tarjan_dfs(v: FuncId, graph: &CallGraph, state: &mut TarjanState) {
    state.index.insert(v, state.current_index);
    state.lowlink.insert(v, state.current_index);
    state.current_index += 1;
    state.stack.push(v);
    state.on_stack.insert(v);

    for &w in graph.callees(v) {
        if !state.index.contains_key(&w) {
            tarjan_dfs(w, graph, state);
            let new_lowlink = min(state.lowlink[&v], state.lowlink[&w]);
            state.lowlink.insert(v, new_lowlink);
        } else if state.on_stack.contains(&w) {
            let new_lowlink = min(state.lowlink[&v], state.index[&w]);
            state.lowlink.insert(v, new_lowlink);
        }
    }

    // v is the root of an SCC: pop it off
    if state.lowlink[&v] == state.index[&v] {
        let mut scc = Vec::new();
        while let Some(w) = state.stack.pop() {
            state.on_stack.remove(&w);
            scc.push(w);
            if w == v {
                break;
            }
        }
        state.sccs.push(scc);
    }
}
