//! Programmatic construction of a [`Program`]
//!
//! Functions are declared first and receive their bodies later, so mutually
//! recursive functions can reference each other.
//!
//! ```rust,ignore
//! let mut b = ProgramBuilder::new();
//! let f = b.declare_function("f");
//! let p = b.param(f, "p");
//! let r = b.result(f, "r");
//! b.set_body(f, vec![Stmt::ret(vec![Expr::ident(p)])])?;
//! let program = b.build()?;
//! ```

use super::ids::{FuncId, LabelId, SiteId, VarId};
use super::node::{AllocKind, CompositeKind, Expr, Stmt};
use super::program::{FunctionDecl, Program, SiteInfo, VarClass, VarDecl};
use super::visit::{self, Visitor};
use crate::errors::{EscapeGraphError, EscapeResult};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_label: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarClass::Global, None)
    }

    pub fn declare_function(&mut self, name: impl Into<String>) -> FuncId {
        self.push_function(name.into(), None)
    }

    /// Declare a closure lexically nested in `enclosing`
    pub fn declare_closure(&mut self, name: impl Into<String>, enclosing: FuncId) -> FuncId {
        self.push_function(name.into(), Some(enclosing))
    }

    pub fn param(&mut self, func: FuncId, name: impl Into<String>) -> VarId {
        let id = self.push_var(name.into(), VarClass::Param, Some(func));
        if let Some(f) = self.program.functions.get_mut(func.index()) {
            f.params.push(id);
        }
        id
    }

    pub fn result(&mut self, func: FuncId, name: impl Into<String>) -> VarId {
        let id = self.push_var(name.into(), VarClass::Result, Some(func));
        if let Some(f) = self.program.functions.get_mut(func.index()) {
            f.results.push(id);
        }
        id
    }

    pub fn local(&mut self, func: FuncId, name: impl Into<String>) -> VarId {
        let id = self.push_var(name.into(), VarClass::Local, Some(func));
        if let Some(f) = self.program.functions.get_mut(func.index()) {
            f.locals.push(id);
        }
        id
    }

    /// Record that closure `func` references `var` of an enclosing function
    pub fn capture(&mut self, func: FuncId, var: VarId) {
        if let Some(f) = self.program.functions.get_mut(func.index()) {
            if !f.captures.contains(&var) {
                f.captures.push(var);
            }
        }
    }

    /// Mark an external function's parameters as non-escaping
    pub fn mark_noescape(&mut self, func: FuncId) {
        if let Some(f) = self.program.functions.get_mut(func.index()) {
            f.noescape = true;
        }
    }

    pub fn label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// `new(T)` inside `func`
    pub fn new_alloc(&mut self, func: FuncId) -> Expr {
        Expr::New {
            site: self.push_site(AllocKind::New, func),
        }
    }

    pub fn composite(&mut self, func: FuncId, kind: CompositeKind, elems: Vec<Expr>) -> Expr {
        Expr::Composite {
            site: self.push_site(AllocKind::Composite(kind), func),
            kind,
            elems,
        }
    }

    pub fn map_lit(&mut self, func: FuncId, entries: Vec<(Expr, Expr)>) -> Expr {
        Expr::MapLit {
            site: self.push_site(AllocKind::Map, func),
            entries,
        }
    }

    /// Function literal for `closure`, evaluated inside its enclosing function
    pub fn closure_lit(&mut self, closure: FuncId) -> EscapeResult<Expr> {
        let enclosing = self
            .program
            .function(closure)
            .ok_or(EscapeGraphError::UnknownFunction(closure))?
            .enclosing
            .ok_or_else(|| {
                EscapeGraphError::malformed(format!("{:?} is not a closure", closure))
            })?;
        Ok(Expr::Closure {
            site: self.push_site(AllocKind::Closure, enclosing),
            func: closure,
        })
    }

    pub fn set_body(&mut self, func: FuncId, body: Vec<Stmt>) -> EscapeResult<()> {
        let f = self
            .program
            .functions
            .get_mut(func.index())
            .ok_or(EscapeGraphError::UnknownFunction(func))?;
        f.body = Some(body);
        Ok(())
    }

    /// Validate references and hand out the finished program
    pub fn build(self) -> EscapeResult<Program> {
        let program = self.program;
        for f in &program.functions {
            if let Some(outer) = f.enclosing {
                if program.function(outer).is_none() || program.outermost(f.id) == f.id {
                    return Err(EscapeGraphError::malformed(format!(
                        "closure {} has no valid enclosing function",
                        f.name
                    )));
                }
            }
            for var in f.declared() {
                match program.var(var) {
                    Some(decl) if decl.func == Some(f.id) => {}
                    Some(_) => {
                        return Err(EscapeGraphError::DuplicateLocation(
                            program.var_name(var).to_string(),
                        ))
                    }
                    None => return Err(EscapeGraphError::UnknownVariable(var)),
                }
            }
            if let Some(body) = &f.body {
                let mut check = ReferenceCheck {
                    program: &program,
                    error: None,
                };
                visit::walk_block(&mut check, body);
                if let Some(err) = check.error {
                    return Err(err);
                }
            }
        }
        Ok(program)
    }

    fn push_var(&mut self, name: String, class: VarClass, func: Option<FuncId>) -> VarId {
        let id = VarId(self.program.vars.len() as u32);
        self.program.vars.push(VarDecl {
            id,
            name,
            class,
            func,
        });
        id
    }

    fn push_function(&mut self, name: String, enclosing: Option<FuncId>) -> FuncId {
        let id = FuncId(self.program.functions.len() as u32);
        self.program.functions.push(FunctionDecl {
            id,
            name,
            params: Vec::new(),
            results: Vec::new(),
            locals: Vec::new(),
            body: None,
            enclosing,
            captures: Vec::new(),
            noescape: false,
        });
        id
    }

    fn push_site(&mut self, kind: AllocKind, func: FuncId) -> SiteId {
        let id = SiteId(self.program.sites.len() as u32);
        self.program.sites.push(SiteInfo { id, kind, func });
        id
    }
}

/// Rejects references to functions, variables or sites missing from the tables,
/// and `&` applied to operands that have no storage
struct ReferenceCheck<'a> {
    program: &'a Program,
    error: Option<EscapeGraphError>,
}

impl ReferenceCheck<'_> {
    fn fail(&mut self, err: EscapeGraphError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl Visitor for ReferenceCheck<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(v) if self.program.var(*v).is_none() => {
                self.fail(EscapeGraphError::UnknownVariable(*v))
            }
            Expr::FuncRef(f) | Expr::Closure { func: f, .. }
                if self.program.function(*f).is_none() =>
            {
                self.fail(EscapeGraphError::UnknownFunction(*f))
            }
            Expr::New { site } | Expr::Composite { site, .. } | Expr::MapLit { site, .. }
                if self.program.site(*site).is_none() =>
            {
                self.fail(EscapeGraphError::InvalidSite(*site))
            }
            Expr::AddrOf(inner) if !is_addressable(inner) => self.fail(
                EscapeGraphError::malformed(format!("cannot take the address of {:?}", inner)),
            ),
            _ => {}
        }
        visit::walk_expr(self, expr);
    }
}

/// Operands `&` may apply to: storage locations and composite literals
fn is_addressable(e: &Expr) -> bool {
    !matches!(
        e,
        Expr::Literal(_)
            | Expr::FuncRef(_)
            | Expr::AddrOf(_)
            | Expr::Binary { .. }
            | Expr::Call { .. }
            | Expr::New { .. }
            | Expr::Closure { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_order() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let x = b.local(f, "x");
        let p = b.param(f, "p");
        let r = b.result(f, "r");
        let program = b.build().unwrap();

        let declared: Vec<_> = program.function(f).unwrap().declared().collect();
        assert_eq!(declared, vec![p, r, x]);
    }

    #[test]
    fn test_closure_nesting() {
        let mut b = ProgramBuilder::new();
        let outer = b.declare_function("outer");
        let c1 = b.declare_closure("outer.func1", outer);
        let c2 = b.declare_closure("outer.func1.1", c1);
        let other = b.declare_function("other");
        let program = b.build().unwrap();

        assert_eq!(program.outermost(c2), outer);
        assert!(program.contains_closure(outer, c2));
        assert!(program.contains_closure(c1, c2));
        assert!(!program.contains_closure(c2, c1));
        assert!(!program.contains_closure(other, c1));
        assert!(!program.contains_closure(outer, outer));
        assert_eq!(program.nested_closures(outer), vec![c1, c2]);
    }

    #[test]
    fn test_sites_are_attributed_to_enclosing_function() {
        let mut b = ProgramBuilder::new();
        let outer = b.declare_function("outer");
        let c = b.declare_closure("outer.func1", outer);
        let lit = b.closure_lit(c).unwrap();
        let program = b.build().unwrap();

        match lit {
            Expr::Closure { site, func } => {
                assert_eq!(func, c);
                assert_eq!(program.site(site).unwrap().func, outer);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_closure_lit_requires_closure() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        assert!(matches!(
            b.closure_lit(f),
            Err(EscapeGraphError::MalformedIr(_))
        ));
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        b.set_body(f, vec![Stmt::expr(Expr::ident(VarId(42)))])
            .unwrap();
        assert!(matches!(
            b.build(),
            Err(EscapeGraphError::UnknownVariable(VarId(42)))
        ));
    }

    #[test]
    fn test_address_of_value_rejected() {
        for operand in [Expr::int(1), Expr::binary(Expr::int(1), Expr::int(2))] {
            let mut b = ProgramBuilder::new();
            let f = b.declare_function("f");
            b.set_body(f, vec![Stmt::expr(Expr::addr_of(operand))])
                .unwrap();
            assert!(matches!(b.build(), Err(EscapeGraphError::MalformedIr(_))));
        }

        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let alloc = b.new_alloc(f);
        b.set_body(f, vec![Stmt::expr(Expr::addr_of(alloc))]).unwrap();
        assert!(matches!(b.build(), Err(EscapeGraphError::MalformedIr(_))));
    }

    #[test]
    fn test_address_of_literals_accepted() {
        let mut b = ProgramBuilder::new();
        let f = b.declare_function("f");
        let slice = b.composite(f, CompositeKind::Slice, vec![Expr::int(1)]);
        let map = b.map_lit(f, vec![]);
        b.set_body(
            f,
            vec![
                Stmt::expr(Expr::addr_of(slice)),
                Stmt::expr(Expr::addr_of(map)),
            ],
        )
        .unwrap();
        assert!(b.build().is_ok());
    }
}
