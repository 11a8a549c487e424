//! Read-only tree traversal
//!
//! Override `visit_*` to observe nodes; call the matching `walk_*` from the
//! override to keep descending.

use super::node::{Expr, Stmt};

pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, stmts: &[Stmt]) {
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Decl { init, .. } => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        Stmt::Assign { lhs, rhs } => {
            for e in lhs.iter().chain(rhs.iter()) {
                v.visit_expr(e);
            }
        }
        Stmt::Expr(e) | Stmt::Go(e) | Stmt::Defer(e) => v.visit_expr(e),
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            v.visit_expr(cond);
            walk_block(v, then_body);
            walk_block(v, else_body);
        }
        Stmt::Loop { cond, body } => {
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            walk_block(v, body);
        }
        Stmt::Block(body) => walk_block(v, body),
        Stmt::Return(values) => {
            for e in values {
                v.visit_expr(e);
            }
        }
        Stmt::Label(_) | Stmt::Goto(_) => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Ident(_)
        | Expr::Literal(_)
        | Expr::FuncRef(_)
        | Expr::New { .. }
        | Expr::Closure { .. } => {}
        Expr::AddrOf(inner) | Expr::Deref(inner) => v.visit_expr(inner),
        Expr::Field { base, .. } | Expr::PtrField { base, .. } => v.visit_expr(base),
        Expr::Index { base, index, .. } => {
            v.visit_expr(base);
            v.visit_expr(index);
        }
        Expr::Binary { lhs, rhs } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Call { callee, args } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Composite { elems, .. } => {
            for e in elems {
                v.visit_expr(e);
            }
        }
        Expr::MapLit { entries, .. } => {
            for (k, val) in entries {
                v.visit_expr(k);
                v.visit_expr(val);
            }
        }
    }
}
