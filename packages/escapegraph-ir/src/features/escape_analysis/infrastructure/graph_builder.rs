//! Location graph construction for one batch
//!
//! Pass 1 declares a location for every identifier declared by the batch's
//! functions. Pass 2 walks the bodies in source order and, for every
//! expression, records where its value flows by evaluating it into a
//! [`Hole`]. Calls to functions finalized in earlier batches are modelled
//! through their parameter leak summaries.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{EscapeGraphError, EscapeResult};
use crate::features::escape_analysis::domain::{
    Edge, FlowHop, Hole, LocAttrs, Location, LocationArena, LocationId, NUM_ESC_RESULTS,
};
use crate::features::escape_analysis::infrastructure::call_graph::Batch;
use crate::features::escape_analysis::ports::SummaryProvider;
use crate::features::ir::visit::{self, Visitor};
use crate::features::ir::{
    CompositeKind, Expr, FuncId, FunctionDecl, IndexKind, LabelId, Program, Site, SiteId, Stmt,
    VarId,
};

/// Built graph of a batch plus its side tables
#[derive(Debug, Clone)]
pub struct BatchGraph {
    pub arena: LocationArena,
    pub vars: FxHashMap<VarId, LocationId>,
    pub sites: FxHashMap<SiteId, LocationId>,
    /// Flow path recorded the first time a location was forced to escape
    pub explanations: FxHashMap<LocationId, Vec<FlowHop>>,
}

impl BatchGraph {
    pub fn var_loc(&self, var: VarId) -> Option<LocationId> {
        self.vars.get(&var).copied()
    }

    pub fn site_loc(&self, site: SiteId) -> Option<LocationId> {
        self.sites.get(&site).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Plain,
    Go,
    Defer,
}

pub struct LocationGraphBuilder<'a> {
    program: &'a Program,
    batch: &'a Batch,
    summaries: &'a dyn SummaryProvider,
    precise_recursive_calls: bool,
    record_notes: bool,

    arena: LocationArena,
    vars: FxHashMap<VarId, LocationId>,
    sites: FxHashMap<SiteId, LocationId>,
    explanations: FxHashMap<LocationId, Vec<FlowHop>>,

    cur_fn: FuncId,
    loop_depth: u32,
    looping_labels: FxHashSet<LabelId>,
    reassigned: FxHashSet<VarId>,
    addrtaken: FxHashSet<VarId>,
}

impl<'a> LocationGraphBuilder<'a> {
    pub fn new(program: &'a Program, batch: &'a Batch, summaries: &'a dyn SummaryProvider) -> Self {
        Self {
            program,
            batch,
            summaries,
            precise_recursive_calls: false,
            record_notes: false,
            arena: LocationArena::new(),
            vars: FxHashMap::default(),
            sites: FxHashMap::default(),
            explanations: FxHashMap::default(),
            cur_fn: batch.roots.first().copied().unwrap_or(FuncId(0)),
            loop_depth: 0,
            looping_labels: FxHashSet::default(),
            reassigned: FxHashSet::default(),
            addrtaken: FxHashSet::default(),
        }
    }

    pub fn precise_recursive_calls(mut self, v: bool) -> Self {
        self.precise_recursive_calls = v;
        self
    }

    /// Keep edge notes and short-circuit paths for diagnostics
    pub fn record_notes(mut self, v: bool) -> Self {
        self.record_notes = v;
        self
    }

    pub fn build(mut self) -> EscapeResult<BatchGraph> {
        let program = self.program;
        let mut decls: Vec<&'a FunctionDecl> = Vec::with_capacity(self.batch.functions.len());
        for &f in &self.batch.functions {
            decls.push(program.function(f).ok_or(EscapeGraphError::UnknownFunction(f))?);
        }

        let mut scan = VarUsageScan::default();
        for decl in &decls {
            visit::walk_block(&mut scan, decl.body());
        }
        self.reassigned = scan.reassigned;
        self.addrtaken = scan.addrtaken;

        for decl in &decls {
            self.declare(decl)?;
        }

        for decl in &decls {
            if let Some(body) = &decl.body {
                self.cur_fn = decl.id;
                self.loop_depth = 0;
                self.looping_labels = looping_labels(body);
                self.block(body)?;
            }
        }

        tracing::trace!(
            "built batch {}: {} locations, {} edges",
            self.batch.index,
            self.arena.len(),
            self.arena.edge_count()
        );

        Ok(BatchGraph {
            arena: self.arena,
            vars: self.vars,
            sites: self.sites,
            explanations: self.explanations,
        })
    }

    // ---------------------------------------------------------------
    // Pass 1
    // ---------------------------------------------------------------

    fn declare(&mut self, decl: &FunctionDecl) -> EscapeResult<()> {
        for &p in &decl.params {
            let loc = self.declare_var(p, decl.id)?;
            self.arena[loc].is_param = true;
        }
        for (i, &r) in decl.results.iter().enumerate() {
            let loc = self.declare_var(r, decl.id)?;
            self.arena[loc].is_result = true;
            self.arena[loc].result_index = i + 1;
        }
        for &l in &decl.locals {
            self.declare_var(l, decl.id)?;
        }
        Ok(())
    }

    fn declare_var(&mut self, var: VarId, func: FuncId) -> EscapeResult<LocationId> {
        if self.vars.contains_key(&var) {
            return Err(EscapeGraphError::DuplicateLocation(
                self.program.var_name(var).to_string(),
            ));
        }
        let mut loc = Location::new(Some(Site::Var(var)), Some(func), 0);
        loc.attrs = LocAttrs::PERSISTS;
        loc.reassigned = self.reassigned.contains(&var);
        loc.addrtaken = self.addrtaken.contains(&var);
        let id = self.arena.alloc(loc);
        self.vars.insert(var, id);
        Ok(id)
    }

    fn var_loc(&self, var: VarId) -> EscapeResult<LocationId> {
        self.vars
            .get(&var)
            .copied()
            .ok_or(EscapeGraphError::UnknownVariable(var))
    }

    fn global_loc(&mut self, var: VarId) -> LocationId {
        if let Some(&loc) = self.vars.get(&var) {
            return loc;
        }
        let mut loc = Location::new(Some(Site::Var(var)), None, 0);
        loc.is_global = true;
        loc.attrs = LocAttrs::ALL;
        let id = self.arena.alloc(loc);
        self.vars.insert(var, id);
        id
    }

    fn is_global(&self, var: VarId) -> EscapeResult<bool> {
        self.program
            .var(var)
            .map(|v| v.is_global())
            .ok_or(EscapeGraphError::UnknownVariable(var))
    }

    fn site_loc(&mut self, site: SiteId) -> EscapeResult<LocationId> {
        if self.program.site(site).is_none() {
            return Err(EscapeGraphError::InvalidSite(site));
        }
        if self.sites.contains_key(&site) {
            return Err(EscapeGraphError::DuplicateLocation(
                Site::Alloc(site).to_string(),
            ));
        }
        let loc = Location::new(Some(Site::Alloc(site)), Some(self.cur_fn), self.loop_depth);
        let id = self.arena.alloc(loc);
        self.sites.insert(site, id);
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Holes
    // ---------------------------------------------------------------

    fn heap_hole(&self) -> Hole {
        Hole::to(LocationArena::HEAP)
    }

    fn note(&self, k: Hole, why: &'static str) -> Hole {
        if self.record_notes {
            k.note(why, None)
        } else {
            k
        }
    }

    /// Records `k = src`
    fn flow(&mut self, k: &Hole, src: LocationId) {
        if k.addrtaken {
            self.arena[src].addrtaken = true;
        }
        let Some(dst) = k.dst else {
            return;
        };
        if dst == src && k.derefs >= 0 {
            return;
        }
        if self.arena[dst].escapes() && k.derefs < 0 {
            // address flows into escaping storage: no need for an edge
            if self.record_notes && !self.arena[src].escapes() {
                self.explanations.entry(src).or_insert_with(|| {
                    vec![FlowHop {
                        dst,
                        src,
                        derefs: k.derefs,
                        notes: k.notes.clone(),
                    }]
                });
            }
            self.arena[src].attrs |= LocAttrs::ALL;
            return;
        }
        let notes = if self.record_notes {
            k.notes.clone()
        } else {
            Vec::new()
        };
        self.arena[dst].edges.push(Edge {
            src,
            derefs: k.derefs,
            notes,
        });
    }

    /// New storage for `site`: its address flows to `k`, contents to the result
    fn spill(&mut self, k: Hole, site: SiteId) -> EscapeResult<Hole> {
        let loc = self.site_loc(site)?;
        let k = self.note(k.addr()?, "spill");
        self.flow(&k, loc);
        Ok(Hole::to(loc))
    }

    /// Aggregate value built in place: the value itself flows to `k`
    fn aggregate(&mut self, k: Hole, site: SiteId) -> EscapeResult<Hole> {
        let loc = self.site_loc(site)?;
        self.flow(&k, loc);
        Ok(Hole::to(loc))
    }

    /// Persisting temporary feeding `k`, alive until the function returns
    fn later(&mut self, k: Hole) -> Hole {
        let loc = self
            .arena
            .alloc_temp(Some(self.cur_fn), self.loop_depth, true);
        self.flow(&k, loc);
        Hole::to(loc)
    }

    /// Single hole that feeds every hole of `ks`
    fn tee_hole(&mut self, mut ks: Vec<Hole>) -> EscapeResult<Hole> {
        if ks.len() <= 1 {
            return Ok(ks.pop().unwrap_or_else(Hole::discard));
        }
        let loc = self
            .arena
            .alloc_temp(Some(self.cur_fn), self.loop_depth, false);
        for k in &ks {
            if k.derefs < 0 {
                return Err(EscapeGraphError::internal("tee hole with negative derefs"));
            }
            self.flow(k, loc);
        }
        Ok(Hole::to(loc))
    }

    /// Where argument `i` of a call to `callee` flows
    fn tag_hole(
        &mut self,
        ks: Option<&[Hole]>,
        callee: Option<FuncId>,
        i: usize,
    ) -> EscapeResult<Hole> {
        let Some(callee) = callee else {
            return Ok(self.heap_hole());
        };

        if self.batch.contains(callee) {
            if self.precise_recursive_calls {
                let decl = self
                    .program
                    .function(callee)
                    .ok_or(EscapeGraphError::UnknownFunction(callee))?;
                if let Some(&p) = decl.params.get(i) {
                    return Ok(Hole::to(self.var_loc(p)?));
                }
            }
            return Ok(self.heap_hole());
        }

        let leaks = match self.summaries.summary(callee).and_then(|s| s.param(i)) {
            Some(leaks) => *leaks,
            None => return Ok(self.heap_hole()),
        };

        let mut tagged = Vec::new();
        if let Some(x) = leaks.heap() {
            tagged.push(self.heap_hole().shift(x as i32)?);
        }
        if let Some(x) = leaks.mutator() {
            tagged.push(Hole::to(LocationArena::MUTATOR).shift(x as i32)?);
        }
        if let Some(x) = leaks.callee() {
            tagged.push(Hole::to(LocationArena::CALLEE).shift(x as i32)?);
        }
        if let Some(ks) = ks {
            for r in 0..NUM_ESC_RESULTS {
                if let (Some(x), Some(k)) = (leaks.result(r), ks.get(r)) {
                    tagged.push(k.clone().shift(x as i32)?);
                }
            }
        }
        self.tee_hole(tagged)
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn block(&mut self, stmts: &[Stmt]) -> EscapeResult<()> {
        let saved = self.loop_depth;
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        self.loop_depth = saved;
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> EscapeResult<()> {
        match stmt {
            Stmt::Decl { var, init } => {
                let loc = self.var_loc(*var)?;
                self.arena[loc].loop_depth = self.loop_depth;
                if let Some(init) = init {
                    let k = self.note(Hole::to(loc), "assign");
                    self.expr(k, init)?;
                }
            }
            Stmt::Assign { lhs, rhs } => self.assign(lhs, rhs)?,
            Stmt::Expr(Expr::Call { callee, args }) => {
                self.call(None, callee, args, CallKind::Plain)?
            }
            Stmt::Expr(e) => self.discard(e)?,
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.discard(cond)?;
                self.block(then_body)?;
                self.block(else_body)?;
            }
            Stmt::Loop { cond, body } => {
                self.loop_depth += 1;
                if let Some(cond) = cond {
                    self.discard(cond)?;
                }
                self.block(body)?;
                self.loop_depth -= 1;
            }
            Stmt::Block(body) => self.block(body)?,
            Stmt::Return(values) => self.ret(values)?,
            Stmt::Label(label) => {
                if self.looping_labels.contains(label) {
                    self.loop_depth += 1;
                }
            }
            Stmt::Goto(_) => {}
            Stmt::Go(e) => self.spawned_call(e, CallKind::Go)?,
            Stmt::Defer(e) => self.spawned_call(e, CallKind::Defer)?,
        }
        Ok(())
    }

    fn assign(&mut self, lhs: &[Expr], rhs: &[Expr]) -> EscapeResult<()> {
        if let [Expr::Call { callee, args }] = rhs {
            if lhs.len() > 1 {
                let mut ks = Vec::with_capacity(lhs.len());
                for target in lhs {
                    ks.push(self.addr_hole(target)?);
                }
                return self.call(Some(ks), callee, args, CallKind::Plain);
            }
        }
        if lhs.len() != rhs.len() {
            return Err(EscapeGraphError::malformed(format!(
                "assignment of {} values to {} targets",
                rhs.len(),
                lhs.len()
            )));
        }
        for (target, value) in lhs.iter().zip(rhs) {
            let k = self.addr_hole(target)?;
            let k = self.note(k, "assign");
            self.expr(k, value)?;
        }
        Ok(())
    }

    fn ret(&mut self, values: &[Expr]) -> EscapeResult<()> {
        let program = self.program;
        let decl = program
            .function(self.cur_fn)
            .ok_or(EscapeGraphError::UnknownFunction(self.cur_fn))?;

        if let [Expr::Call { callee, args }] = values {
            if decl.results.len() > 1 {
                let mut ks = Vec::with_capacity(decl.results.len());
                for &r in &decl.results {
                    ks.push(Hole::to(self.var_loc(r)?));
                }
                return self.call(Some(ks), callee, args, CallKind::Plain);
            }
        }
        if values.len() > decl.results.len() {
            return Err(EscapeGraphError::malformed(format!(
                "{} returns {} values, declares {}",
                decl.name,
                values.len(),
                decl.results.len()
            )));
        }
        for (&r, value) in decl.results.iter().zip(values) {
            let k = self.note(Hole::to(self.var_loc(r)?), "return");
            self.expr(k, value)?;
        }
        Ok(())
    }

    fn spawned_call(&mut self, e: &Expr, kind: CallKind) -> EscapeResult<()> {
        match e {
            Expr::Call { callee, args } => self.call(None, callee, args, kind),
            other => Err(EscapeGraphError::malformed(format!(
                "go/defer of non-call {:?}",
                other
            ))),
        }
    }

    // ---------------------------------------------------------------
    // Calls
    // ---------------------------------------------------------------

    fn call(
        &mut self,
        ks: Option<Vec<Hole>>,
        callee: &Expr,
        args: &[Expr],
        kind: CallKind,
    ) -> EscapeResult<()> {
        let static_fn = callee.static_callee();
        let top_level_defer = kind == CallKind::Defer && self.loop_depth == 0;
        let to_heap = kind == CallKind::Go || (kind == CallKind::Defer && !top_level_defer);

        if let (Some(ks), Some(f)) = (&ks, static_fn) {
            if self.precise_recursive_calls && self.batch.contains(f) {
                let program = self.program;
                let decl = program
                    .function(f)
                    .ok_or(EscapeGraphError::UnknownFunction(f))?;
                for (&r, k) in decl.results.iter().zip(ks) {
                    let loc = self.var_loc(r)?;
                    let k = self.note(k.clone(), "call result");
                    self.flow(&k, loc);
                }
            }
        }

        let callee_k = if to_heap {
            self.heap_hole()
        } else if top_level_defer {
            self.later(Hole::discard())
        } else if static_fn.is_some() {
            Hole::discard()
        } else {
            Hole::to(LocationArena::CALLEE)
        };
        let callee_k = self.note(callee_k, "callee operand");
        self.expr(callee_k, callee)?;

        for (i, arg) in args.iter().enumerate() {
            let k = if to_heap {
                self.heap_hole()
            } else {
                let k = self.tag_hole(ks.as_deref(), static_fn, i)?;
                if top_level_defer {
                    self.later(k)
                } else {
                    k
                }
            };
            let k = self.note(k, "call parameter");
            self.expr(k, arg)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn discard(&mut self, e: &Expr) -> EscapeResult<()> {
        self.expr(Hole::discard(), e)
    }

    fn mutate(&mut self, e: &Expr) -> EscapeResult<()> {
        let k = self.note(Hole::to(LocationArena::MUTATOR), "mutate");
        self.expr(k, e)
    }

    /// Evaluate `e` for its value, flowing it into `k`
    fn expr(&mut self, k: Hole, e: &Expr) -> EscapeResult<()> {
        match e {
            Expr::Ident(v) => {
                // globals are read from the heap
                if !self.is_global(*v)? {
                    let loc = self.var_loc(*v)?;
                    self.flow(&k, loc);
                }
            }
            Expr::Literal(_) | Expr::FuncRef(_) => {}
            Expr::AddrOf(inner) => match inner.as_ref() {
                // pointer literal: a fresh cell holding the slice header or map
                Expr::Composite {
                    kind: CompositeKind::Slice,
                    ..
                }
                | Expr::MapLit { .. } => {
                    let cell = self
                        .arena
                        .alloc_temp(Some(self.cur_fn), self.loop_depth, false);
                    let k = self.note(k.addr()?, "pointer literal");
                    self.flow(&k, cell);
                    self.expr(Hole::to(cell), inner)?;
                }
                _ => {
                    let k = self.note(k.addr()?, "address-of");
                    self.expr(k, inner)?;
                }
            },
            Expr::Deref(inner) => {
                let k = self.note(k.deref()?, "indirection");
                self.expr(k, inner)?;
            }
            Expr::Field { base, .. } => {
                let k = self.note(k, "dot");
                self.expr(k, base)?;
            }
            Expr::PtrField { base, .. } => {
                let k = self.note(k.deref()?, "dot of pointer");
                self.expr(k, base)?;
            }
            Expr::Index { base, index, kind } => {
                match kind {
                    IndexKind::Array => {
                        let k = self.note(k, "fixed-array-index-of");
                        self.expr(k, base)?;
                    }
                    IndexKind::Slice => {
                        let k = self.note(k.deref()?, "dot of pointer");
                        self.expr(k, base)?;
                    }
                    IndexKind::Map => self.discard(base)?,
                }
                self.discard(index)?;
            }
            Expr::Binary { lhs, rhs } => {
                self.discard(lhs)?;
                self.discard(rhs)?;
            }
            Expr::Call { callee, args } => {
                self.call(Some(vec![k]), callee, args, CallKind::Plain)?;
            }
            Expr::New { site } => {
                self.spill(k, *site)?;
            }
            Expr::Composite { site, kind, elems } => {
                let (k, why) = match kind {
                    CompositeKind::Slice => (self.spill(k, *site)?, "slice-literal-element"),
                    CompositeKind::Array => (self.aggregate(k, *site)?, "array literal element"),
                    CompositeKind::Struct => (self.aggregate(k, *site)?, "struct literal element"),
                };
                for elem in elems {
                    let k = self.note(k.clone(), why);
                    self.expr(k, elem)?;
                }
            }
            Expr::MapLit { site, entries } => {
                self.spill(k, *site)?;
                for (key, value) in entries {
                    let hk = self.note(self.heap_hole(), "map literal key");
                    self.expr(hk, key)?;
                    let hv = self.note(self.heap_hole(), "map literal value");
                    self.expr(hv, value)?;
                }
            }
            Expr::Closure { site, func } => {
                let k = self.spill(k, *site)?;
                let program = self.program;
                let decl = program
                    .function(*func)
                    .ok_or(EscapeGraphError::UnknownFunction(*func))?;
                for &var in &decl.captures {
                    if self.is_global(var)? {
                        continue;
                    }
                    let loc = self.var_loc(var)?;
                    self.arena[loc].captured = true;
                    let by_value = !self.reassigned.contains(&var) && !self.addrtaken.contains(&var);
                    let ck = if by_value { k.clone() } else { k.clone().addr()? };
                    let ck = self.note(ck, "captured by a closure");
                    self.flow(&ck, loc);
                }
            }
        }
        Ok(())
    }

    /// Hole for storing into the memory designated by `target`
    fn addr_hole(&mut self, target: &Expr) -> EscapeResult<Hole> {
        match target {
            Expr::Ident(v) => {
                let loc = if self.is_global(*v)? {
                    self.global_loc(*v)
                } else {
                    self.var_loc(*v)?
                };
                Ok(Hole::to(loc))
            }
            Expr::Field { base, .. } => self.addr_hole(base),
            Expr::Index {
                base,
                index,
                kind: IndexKind::Array,
            } => {
                self.discard(index)?;
                self.addr_hole(base)
            }
            Expr::Index {
                base,
                index,
                kind: IndexKind::Slice,
            } => {
                self.discard(index)?;
                self.mutate(base)?;
                Ok(self.heap_hole())
            }
            Expr::Index {
                base,
                index,
                kind: IndexKind::Map,
            } => {
                self.discard(base)?;
                let k = self.note(self.heap_hole(), "key of map put");
                self.expr(k, index)?;
                Ok(self.heap_hole())
            }
            Expr::Deref(base) | Expr::PtrField { base, .. } => {
                self.mutate(base)?;
                Ok(self.heap_hole())
            }
            other => Err(EscapeGraphError::malformed(format!(
                "not assignable: {:?}",
                other
            ))),
        }
    }
}

/// Variables assigned after declaration, or whose address is taken
#[derive(Default)]
struct VarUsageScan {
    reassigned: FxHashSet<VarId>,
    addrtaken: FxHashSet<VarId>,
}

impl Visitor for VarUsageScan {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Assign { lhs, .. } = stmt {
            for target in lhs {
                if let Expr::Ident(v) = target {
                    self.reassigned.insert(*v);
                }
            }
        }
        visit::walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::AddrOf(inner) = expr {
            if let Some(v) = addressed_var(inner) {
                self.addrtaken.insert(v);
            }
        }
        visit::walk_expr(self, expr);
    }
}

/// Variable whose storage `e` designates, if any
fn addressed_var(e: &Expr) -> Option<VarId> {
    match e {
        Expr::Ident(v) => Some(*v),
        Expr::Field { base, .. }
        | Expr::Index {
            base,
            kind: IndexKind::Array,
            ..
        } => addressed_var(base),
        _ => None,
    }
}

/// Labels targeted by a `goto` that appears after them
fn looping_labels(body: &[Stmt]) -> FxHashSet<LabelId> {
    #[derive(Default)]
    struct LabelScan {
        seen: FxHashSet<LabelId>,
        looping: FxHashSet<LabelId>,
    }

    impl Visitor for LabelScan {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            match stmt {
                Stmt::Label(l) => {
                    self.seen.insert(*l);
                }
                Stmt::Goto(l) if self.seen.contains(l) => {
                    self.looping.insert(*l);
                }
                _ => {}
            }
            visit::walk_stmt(self, stmt);
        }
    }

    let mut scan = LabelScan::default();
    visit::walk_block(&mut scan, body);
    scan.looping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::escape_analysis::domain::{FunctionSummary, Leaks, SummaryStore};
    use crate::features::escape_analysis::infrastructure::call_graph::plan_batches;
    use crate::features::ir::ProgramBuilder;

    fn build_for(program: &Program, func: FuncId, summaries: &SummaryStore) -> BatchGraph {
        let plan = plan_batches(program);
        let batch = plan.batch_of(func).unwrap().clone();
        LocationGraphBuilder::new(program, &batch, summaries)
            .record_notes(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_declares_signature_in_order() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let p = b.param(f, "p");
        let r0 = b.result(f, "r0");
        let r1 = b.result(f, "r1");
        let x = b.local(f, "x");
        b.set_body(f, vec![]).unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        let arena = &graph.arena;
        let p_loc = graph.var_loc(p).unwrap();
        assert!(arena[p_loc].is_param);
        assert_eq!(arena[graph.var_loc(r0).unwrap()].result_index, 1);
        assert_eq!(arena[graph.var_loc(r1).unwrap()].result_index, 2);
        assert!(!arena[graph.var_loc(x).unwrap()].is_result);
        // three sinks plus four declared identifiers
        assert_eq!(arena.len(), 7);
        assert!(p_loc < graph.var_loc(x).unwrap());
    }

    #[test]
    fn test_global_store_short_circuits() {
        let mut b = ProgramBuilder::new();
        let g = b.global("g");
        let f = b.declare_function("f");
        let x = b.local(f, "x");
        b.set_body(
            f,
            vec![
                Stmt::decl(x, Some(Expr::int(0))),
                Stmt::assign(Expr::ident(g), Expr::addr_of(Expr::ident(x))),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        let x_loc = graph.var_loc(x).unwrap();
        let g_loc = graph.var_loc(g).unwrap();
        assert_eq!(graph.arena[x_loc].attrs, LocAttrs::ALL);
        assert!(graph.arena[x_loc].addrtaken);
        assert!(graph.arena[g_loc].is_global);
        assert!(graph.arena[g_loc].edges.is_empty());
        assert_eq!(graph.explanations[&x_loc].len(), 1);
    }

    #[test]
    fn test_address_edge_has_negative_derefs() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let x = b.local(f, "x");
        let p = b.local(f, "p");
        b.set_body(
            f,
            vec![
                Stmt::decl(x, None),
                Stmt::decl(p, Some(Expr::addr_of(Expr::ident(x)))),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        let p_loc = graph.var_loc(p).unwrap();
        let x_loc = graph.var_loc(x).unwrap();
        let edges = &graph.arena[p_loc].edges;
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].src, x_loc);
        assert_eq!(edges[0].derefs, -1);
        assert!(edges[0].notes.iter().any(|n| n.why == "address-of"));
    }

    #[test]
    fn test_store_through_pointer_targets_heap_and_mutator() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let p = b.param(f, "p");
        let q = b.param(f, "q");
        b.set_body(f, vec![Stmt::assign(Expr::deref(Expr::ident(p)), Expr::ident(q))])
            .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        let heap = &graph.arena[LocationArena::HEAP].edges;
        let mutator = &graph.arena[LocationArena::MUTATOR].edges;
        assert_eq!(heap.len(), 1);
        assert_eq!(heap[0].src, graph.var_loc(q).unwrap());
        assert_eq!(mutator.len(), 1);
        assert_eq!(mutator[0].src, graph.var_loc(p).unwrap());
    }

    #[test]
    fn test_loop_sets_declaration_depth() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let outer = b.local(f, "outer");
        let inner = b.local(f, "inner");
        let alloc = b.new_alloc(f);
        let site = match &alloc {
            Expr::New { site } => *site,
            _ => unreachable!(),
        };
        b.set_body(
            f,
            vec![
                Stmt::decl(outer, None),
                Stmt::looping(vec![
                    Stmt::decl(inner, None),
                    Stmt::assign(Expr::ident(outer), alloc),
                ]),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        assert_eq!(graph.arena[graph.var_loc(outer).unwrap()].loop_depth, 0);
        assert_eq!(graph.arena[graph.var_loc(inner).unwrap()].loop_depth, 1);
        assert_eq!(graph.arena[graph.site_loc(site).unwrap()].loop_depth, 1);
    }

    #[test]
    fn test_backward_goto_label_increments_depth() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let before = b.local(f, "before");
        let after = b.local(f, "after");
        let top = b.label();
        b.set_body(
            f,
            vec![
                Stmt::decl(before, None),
                Stmt::Label(top),
                Stmt::decl(after, None),
                Stmt::Goto(top),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        assert_eq!(graph.arena[graph.var_loc(before).unwrap()].loop_depth, 0);
        assert_eq!(graph.arena[graph.var_loc(after).unwrap()].loop_depth, 1);
    }

    #[test]
    fn test_forward_goto_label_keeps_depth() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let after = b.local(f, "after");
        let skip = b.label();
        b.set_body(
            f,
            vec![
                Stmt::Goto(skip),
                Stmt::Label(skip),
                Stmt::decl(after, None),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        assert_eq!(graph.arena[graph.var_loc(after).unwrap()].loop_depth, 0);
    }

    #[test]
    fn test_summary_expands_into_tee() {
        let mut b = ProgramBuilder::new();
        let callee = b.declare_function("callee");
        let cp = b.param(callee, "p");
        let caller = b.declare_function("caller");
        let x = b.local(caller, "x");
        let y = b.local(caller, "y");
        b.set_body(callee, vec![]).unwrap();
        b.set_body(
            caller,
            vec![
                Stmt::decl(x, None),
                Stmt::decl(y, Some(Expr::call_func(callee, vec![Expr::addr_of(Expr::ident(x))]))),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();
        let _ = cp;

        let mut leaks = Leaks::default();
        leaks.add_result(0, 0);
        leaks.add_mutator(0);
        let mut summaries = SummaryStore::new();
        summaries
            .insert(FunctionSummary {
                func: callee,
                params: vec![leaks],
            })
            .unwrap();

        let graph = build_for(&program, caller, &summaries);
        let y_loc = graph.var_loc(y).unwrap();
        let x_loc = graph.var_loc(x).unwrap();

        // y <- tee, mutator <- tee, tee <- &x
        let y_edges = &graph.arena[y_loc].edges;
        assert_eq!(y_edges.len(), 1);
        let tee = y_edges[0].src;
        assert!(graph.arena[tee].site.is_none());
        assert!(graph.arena[LocationArena::MUTATOR]
            .edges
            .iter()
            .any(|e| e.src == tee));
        let tee_edges = &graph.arena[tee].edges;
        assert_eq!(tee_edges.len(), 1);
        assert_eq!(tee_edges[0].src, x_loc);
        assert_eq!(tee_edges[0].derefs, -1);
    }

    #[test]
    fn test_unknown_callee_flows_to_callee_sink() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let fnv = b.param(f, "fn");
        let arg = b.param(f, "arg");
        b.set_body(
            f,
            vec![Stmt::expr(Expr::call(Expr::ident(fnv), vec![Expr::ident(arg)]))],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        let fn_loc = graph.var_loc(fnv).unwrap();
        let arg_loc = graph.var_loc(arg).unwrap();
        assert!(graph.arena[LocationArena::CALLEE]
            .edges
            .iter()
            .any(|e| e.src == fn_loc));
        assert!(graph.arena[LocationArena::HEAP]
            .edges
            .iter()
            .any(|e| e.src == arg_loc));
    }

    #[test]
    fn test_closure_capture_modes() {
        let mut b = ProgramBuilder::new();
        let outer = b.declare_function("outer");
        let read_only = b.local(outer, "a");
        let mutated = b.local(outer, "b");
        let f = b.local(outer, "f");
        let c = b.declare_closure("outer.func1", outer);
        b.capture(c, read_only);
        b.capture(c, mutated);
        b.set_body(c, vec![Stmt::assign(Expr::ident(mutated), Expr::ident(read_only))])
            .unwrap();
        let lit = b.closure_lit(c).unwrap();
        b.set_body(
            outer,
            vec![
                Stmt::decl(read_only, Some(Expr::int(1))),
                Stmt::decl(mutated, Some(Expr::int(2))),
                Stmt::decl(f, Some(lit)),
            ],
        )
        .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, outer, &SummaryStore::new());
        let f_loc = graph.var_loc(f).unwrap();
        let closure_loc = graph.arena[f_loc].edges[0].src;
        let captures: Vec<(LocationId, i32)> = graph.arena[closure_loc]
            .edges
            .iter()
            .map(|e| (e.src, e.derefs))
            .collect();
        assert!(captures.contains(&(graph.var_loc(read_only).unwrap(), 0)));
        assert!(captures.contains(&(graph.var_loc(mutated).unwrap(), -1)));
        assert!(graph.arena[graph.var_loc(mutated).unwrap()].captured);
        assert!(graph.arena[graph.var_loc(mutated).unwrap()].reassigned);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let x = b.local(f, "x");
        b.set_body(f, vec![]).unwrap();
        let mut program = b.build().unwrap();
        program.functions[0].locals.push(x);

        let plan = plan_batches(&program);
        let summaries = SummaryStore::new();
        let result = LocationGraphBuilder::new(&program, &plan.batches[0], &summaries).build();
        assert!(matches!(result, Err(EscapeGraphError::DuplicateLocation(name)) if name == "x"));
    }

    #[test]
    fn test_go_statement_requires_call() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        b.set_body(f, vec![Stmt::Go(Expr::int(1))]).unwrap();
        let program = b.build().unwrap();

        let plan = plan_batches(&program);
        let summaries = SummaryStore::new();
        let result = LocationGraphBuilder::new(&program, &plan.batches[0], &summaries).build();
        assert!(matches!(result, Err(EscapeGraphError::MalformedIr(_))));
    }

    #[test]
    fn test_address_of_slice_literal_goes_through_cell() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let p = b.local(f, "p");
        let lit = b.composite(f, CompositeKind::Slice, vec![Expr::int(1)]);
        let site = match &lit {
            Expr::Composite { site, .. } => *site,
            _ => unreachable!(),
        };
        b.set_body(f, vec![Stmt::decl(p, Some(Expr::addr_of(lit)))])
            .unwrap();
        let program = b.build().unwrap();

        let graph = build_for(&program, f, &SummaryStore::new());
        let arena = &graph.arena;
        let p_edges = &arena[graph.var_loc(p).unwrap()].edges;
        assert_eq!(p_edges.len(), 1);
        assert_eq!(p_edges[0].derefs, -1);

        let cell = p_edges[0].src;
        assert!(!arena[cell].attrs.persists());
        let cell_edges = &arena[cell].edges;
        assert_eq!(cell_edges.len(), 1);
        assert_eq!(cell_edges[0].src, graph.site_loc(site).unwrap());
        assert_eq!(cell_edges[0].derefs, -1);
    }
}
