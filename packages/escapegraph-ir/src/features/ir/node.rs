//! Statement and expression trees
//!
//! Closed enums: every consumer matches exhaustively, so adding a node kind
//! forces each pass to decide what the new kind does to data flow.

use super::ids::{FuncId, LabelId, SiteId, VarId};
use serde::{Deserialize, Serialize};

/// Constant value (contents are irrelevant to escape, only the kind is kept)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    Nil,
}

/// How an index expression addresses its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Fixed-size array value: element lives inside the base
    Array,
    /// Slice: element lives behind the slice's data pointer
    Slice,
    /// Map: element lives in runtime-managed storage
    Map,
}

/// Composite literal flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeKind {
    Struct,
    Array,
    Slice,
}

/// What an allocation site constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocKind {
    New,
    Composite(CompositeKind),
    Map,
    Closure,
}

impl AllocKind {
    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            AllocKind::New => "new",
            AllocKind::Composite(CompositeKind::Struct) => "composite literal",
            AllocKind::Composite(CompositeKind::Array) => "array literal",
            AllocKind::Composite(CompositeKind::Slice) => "slice literal",
            AllocKind::Map => "map literal",
            AllocKind::Closure => "func literal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Ident(VarId),
    Literal(Literal),
    /// Reference to a named function
    FuncRef(FuncId),
    AddrOf(Box<Expr>),
    Deref(Box<Expr>),
    /// `base.field` on an aggregate value
    Field { base: Box<Expr>, field: String },
    /// `base.field` through a pointer
    PtrField { base: Box<Expr>, field: String },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        kind: IndexKind,
    },
    Binary { lhs: Box<Expr>, rhs: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    New { site: SiteId },
    Composite {
        site: SiteId,
        kind: CompositeKind,
        elems: Vec<Expr>,
    },
    MapLit {
        site: SiteId,
        entries: Vec<(Expr, Expr)>,
    },
    Closure { site: SiteId, func: FuncId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Local declaration, optionally initialized
    Decl { var: VarId, init: Option<Expr> },
    /// `lhs... = rhs...`; a single call on the right may feed several targets
    Assign { lhs: Vec<Expr>, rhs: Vec<Expr> },
    Expr(Expr),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    Loop { cond: Option<Expr>, body: Vec<Stmt> },
    Block(Vec<Stmt>),
    Return(Vec<Expr>),
    Label(LabelId),
    Goto(LabelId),
    Go(Expr),
    Defer(Expr),
}

impl Expr {
    pub fn ident(var: VarId) -> Self {
        Expr::Ident(var)
    }

    pub fn int(v: i64) -> Self {
        Expr::Literal(Literal::Int(v))
    }

    pub fn nil() -> Self {
        Expr::Literal(Literal::Nil)
    }

    pub fn func(func: FuncId) -> Self {
        Expr::FuncRef(func)
    }

    pub fn addr_of(inner: Expr) -> Self {
        Expr::AddrOf(Box::new(inner))
    }

    pub fn deref(inner: Expr) -> Self {
        Expr::Deref(Box::new(inner))
    }

    pub fn field(base: Expr, field: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(base),
            field: field.into(),
        }
    }

    pub fn ptr_field(base: Expr, field: impl Into<String>) -> Self {
        Expr::PtrField {
            base: Box::new(base),
            field: field.into(),
        }
    }

    pub fn index(base: Expr, index: Expr, kind: IndexKind) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
            kind,
        }
    }

    pub fn binary(lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Call of a named function
    pub fn call_func(func: FuncId, args: Vec<Expr>) -> Self {
        Expr::call(Expr::FuncRef(func), args)
    }

    /// Function statically bound to this expression when it is called
    pub fn static_callee(&self) -> Option<FuncId> {
        match self {
            Expr::FuncRef(f) => Some(*f),
            Expr::Closure { func, .. } => Some(*func),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }
}

impl Stmt {
    pub fn decl(var: VarId, init: Option<Expr>) -> Self {
        Stmt::Decl { var, init }
    }

    /// Single-target assignment
    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        Stmt::Assign {
            lhs: vec![lhs],
            rhs: vec![rhs],
        }
    }

    pub fn assign_multi(lhs: Vec<Expr>, rhs: Vec<Expr>) -> Self {
        Stmt::Assign { lhs, rhs }
    }

    pub fn expr(e: Expr) -> Self {
        Stmt::Expr(e)
    }

    pub fn ret(values: Vec<Expr>) -> Self {
        Stmt::Return(values)
    }

    /// Infinite loop
    pub fn looping(body: Vec<Stmt>) -> Self {
        Stmt::Loop { cond: None, body }
    }

    pub fn if_else(cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then_body,
            else_body,
        }
    }
}
