//! Fixed-point solver over a batch's location graph
//!
//! Each root walk computes, for every location reaching the root, the
//! minimal number of dereferences along any path (negative meaning the
//! location's address reaches the root), lower-bounding intermediate
//! distances at zero. Attributes learned during a walk re-enqueue the
//! location as a root so its own consequences get propagated.
//!
//! Time: O(V * (V + E)) worst case, near-linear in practice.

use crate::features::escape_analysis::domain::{
    FlowHop, LocAttrs, LocationArena, LocationId, NUM_ESC_RESULTS,
};
use crate::features::escape_analysis::infrastructure::graph_builder::BatchGraph;
use crate::features::ir::Program;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub walks: usize,
    pub round_limit_hit: bool,
}

pub struct GraphSolver<'a> {
    program: &'a Program,
    graph: &'a mut BatchGraph,
    max_walk_rounds: usize,
    record_paths: bool,
    walkgen: u32,
    todo: Vec<LocationId>,
}

impl<'a> GraphSolver<'a> {
    pub fn new(program: &'a Program, graph: &'a mut BatchGraph) -> Self {
        Self {
            program,
            graph,
            max_walk_rounds: 0,
            record_paths: false,
            walkgen: 0,
            todo: Vec::new(),
        }
    }

    /// Bound on root walks (0 = unlimited)
    pub fn max_walk_rounds(mut self, v: usize) -> Self {
        self.max_walk_rounds = v;
        self
    }

    /// Remember the path that first forced each location to escape
    pub fn record_paths(mut self, v: bool) -> Self {
        self.record_paths = v;
        self
    }

    /// Propagate until no location gains attributes
    pub fn walk_all(mut self) -> SolveStats {
        let mut stats = SolveStats::default();

        // popped in id order, heap first
        let ids: Vec<LocationId> = self.graph.arena.ids().rev().collect();
        for id in ids {
            self.enqueue(id);
        }

        while let Some(root) = self.todo.pop() {
            self.graph.arena[root].queued = false;
            if self.max_walk_rounds > 0 && stats.walks >= self.max_walk_rounds {
                tracing::warn!(
                    "walk limit {} reached with {} roots pending; treating every location as escaping",
                    self.max_walk_rounds,
                    self.todo.len() + 1
                );
                self.escape_everything();
                stats.round_limit_hit = true;
                break;
            }
            self.walkgen += 1;
            stats.walks += 1;
            self.walk_one(root);
        }

        stats
    }

    fn enqueue(&mut self, id: LocationId) {
        let loc = &mut self.graph.arena[id];
        if !loc.queued {
            loc.queued = true;
            self.todo.push(id);
        }
    }

    /// Relax every location that flows into `root`
    fn walk_one(&mut self, root: LocationId) {
        let walkgen = self.walkgen;
        {
            let r = &mut self.graph.arena[root];
            r.walkgen = walkgen;
            r.derefs = 0;
            r.dst = None;
            r.walk_queued = true;
        }

        let mut stack = vec![root];
        while let Some(l) = stack.pop() {
            self.graph.arena[l].walk_queued = false;
            let root_attrs = self.graph.arena[root].attrs;

            let mut derefs = self.graph.arena[l].derefs;
            let mut new_attrs = LocAttrs::NONE;

            // l's address flows to root
            if derefs < 0 {
                derefs = 0;
                if self.outlives(root, l) {
                    new_attrs |= LocAttrs::ALL;
                    if self.record_paths && !self.graph.arena[l].escapes() {
                        self.record_path(l);
                    }
                } else if root_attrs.persists() {
                    new_attrs |= LocAttrs::PERSISTS;
                }
            }
            if derefs == 0 {
                new_attrs |= root_attrs.intersection(LocAttrs::MUTATES | LocAttrs::CALLS);
            }

            if self.graph.arena[l].is_param {
                if self.outlives(root, l) {
                    self.leak_to(l, root, derefs);
                }
                if root_attrs.mutates() {
                    self.graph.arena[l].leaks.add_mutator(derefs);
                }
                if root_attrs.calls() {
                    self.graph.arena[l].leaks.add_callee(derefs);
                }
            }

            if !new_attrs.difference(self.graph.arena[l].attrs).is_empty() {
                self.graph.arena[l].attrs |= new_attrs;
                self.enqueue(l);
                if self.graph.arena[l].escapes() {
                    continue;
                }
            }

            let arena = &mut self.graph.arena;
            for i in 0..arena[l].edges.len() {
                let (src, weight) = {
                    let edge = &arena[l].edges[i];
                    (edge.src, edge.derefs)
                };
                if arena[src].escapes() {
                    continue;
                }
                let d = derefs + weight;
                let s = &mut arena[src];
                if s.walkgen != walkgen || d < s.derefs {
                    s.walkgen = walkgen;
                    s.derefs = d;
                    s.dst = Some(l);
                    s.dst_edge = i;
                    if !s.walk_queued {
                        s.walk_queued = true;
                        stack.push(src);
                    }
                    tracing::trace!("relax {} -> {} derefs={}", src, l, d);
                }
            }
        }
    }

    /// Whether `other`'s storage must outlive `root`'s
    fn outlives(&self, root: LocationId, other: LocationId) -> bool {
        let arena = &self.graph.arena;
        let r = &arena[root];
        if r.escapes() {
            return true;
        }
        if root == LocationArena::MUTATOR || root == LocationArena::CALLEE {
            return false;
        }
        // callers may keep results arbitrarily long
        if r.is_result {
            return true;
        }
        let o = &arena[other];
        if let (Some(rf), Some(of)) = (r.func, o.func) {
            if rf == of && r.loop_depth < o.loop_depth {
                return true;
            }
            if self.program.contains_closure(rf, of) {
                return true;
            }
        }
        false
    }

    fn leak_to(&mut self, l: LocationId, root: LocationId, derefs: i32) {
        let arena = &mut self.graph.arena;
        let r = &arena[root];
        if !r.escapes() && r.is_result && r.func == arena[l].func {
            let ri = r.result_index.saturating_sub(1);
            if ri < NUM_ESC_RESULTS {
                arena[l].leaks.add_result(ri, derefs);
                return;
            }
        }
        arena[l].leaks.add_heap(derefs);
    }

    fn record_path(&mut self, l: LocationId) {
        if self.graph.explanations.contains_key(&l) {
            return;
        }
        let arena = &self.graph.arena;
        let mut hops = Vec::new();
        let mut cur = l;
        for _ in 0..arena.len() {
            let Some(dst) = arena[cur].dst else {
                break;
            };
            let Some(edge) = arena[dst].edges.get(arena[cur].dst_edge) else {
                break;
            };
            hops.push(FlowHop {
                dst,
                src: cur,
                derefs: edge.derefs,
                notes: edge.notes.clone(),
            });
            cur = dst;
        }
        self.graph.explanations.insert(l, hops);
    }

    fn escape_everything(&mut self) {
        let ids: Vec<LocationId> = self.graph.arena.ids().collect();
        for id in ids {
            if LocationArena::is_sink(id) {
                continue;
            }
            let loc = &mut self.graph.arena[id];
            loc.attrs |= LocAttrs::ALL;
            if loc.is_param {
                loc.leaks.add_heap(0);
            }
        }
    }
}
