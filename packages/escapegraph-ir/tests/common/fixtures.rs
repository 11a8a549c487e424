//! Program fixtures
//!
//! Small hand-built programs covering the classic escape patterns.

use escapegraph_ir::{Expr, FuncId, Program, ProgramBuilder, SiteId, Stmt, VarId};

/// Allocation site of a `new`, composite, map or closure expression
pub fn site_of(e: &Expr) -> SiteId {
    match e {
        Expr::New { site }
        | Expr::Composite { site, .. }
        | Expr::MapLit { site, .. }
        | Expr::Closure { site, .. } => *site,
        other => panic!("not an allocation: {:?}", other),
    }
}

/// `func f(p *int) *int { *p = *p + 1; return p }` plus two callers:
///
/// ```text
/// var y *int
/// func leaks()  { x := 0; y = f(&x) }
/// func keeps()  { z := 0; w := f(&z); _ = *w }
/// ```
pub struct PassThrough {
    pub program: Program,
    pub f: FuncId,
    pub p: VarId,
    pub leaks: FuncId,
    pub x: VarId,
    pub keeps: FuncId,
    pub z: VarId,
}

pub fn pass_through() -> PassThrough {
    let mut b = ProgramBuilder::new();
    let y = b.global("y");

    let f = b.declare_function("f");
    let p = b.param(f, "p");
    b.result(f, "~r0");
    b.set_body(
        f,
        vec![
            Stmt::assign(
                Expr::deref(Expr::ident(p)),
                Expr::binary(Expr::deref(Expr::ident(p)), Expr::int(1)),
            ),
            Stmt::ret(vec![Expr::ident(p)]),
        ],
    )
    .unwrap();

    let leaks = b.declare_function("leaks");
    let x = b.local(leaks, "x");
    b.set_body(
        leaks,
        vec![
            Stmt::decl(x, Some(Expr::int(0))),
            Stmt::assign(
                Expr::ident(y),
                Expr::call_func(f, vec![Expr::addr_of(Expr::ident(x))]),
            ),
        ],
    )
    .unwrap();

    let keeps = b.declare_function("keeps");
    let z = b.local(keeps, "z");
    let w = b.local(keeps, "w");
    b.set_body(
        keeps,
        vec![
            Stmt::decl(z, Some(Expr::int(0))),
            Stmt::decl(
                w,
                Some(Expr::call_func(f, vec![Expr::addr_of(Expr::ident(z))])),
            ),
            Stmt::expr(Expr::deref(Expr::ident(w))),
        ],
    )
    .unwrap();

    PassThrough {
        program: b.build().unwrap(),
        f,
        p,
        leaks,
        x,
        keeps,
        z,
    }
}

/// `n` independent functions, each returning the address of one local and
/// keeping another one private. Every function is its own batch of wave 0.
pub fn independent_functions(n: usize) -> (Program, Vec<(VarId, VarId)>) {
    let mut b = ProgramBuilder::new();
    let mut vars = Vec::with_capacity(n);
    for i in 0..n {
        let f = b.declare_function(format!("f{i}"));
        b.result(f, "~r0");
        let out = b.local(f, "out");
        let tmp = b.local(f, "tmp");
        let alloc = b.new_alloc(f);
        b.set_body(
            f,
            vec![
                Stmt::decl(out, Some(Expr::int(i as i64))),
                Stmt::decl(tmp, Some(alloc)),
                Stmt::assign(Expr::deref(Expr::ident(tmp)), Expr::ident(out)),
                Stmt::ret(vec![Expr::addr_of(Expr::ident(out))]),
            ],
        )
        .unwrap();
        vars.push((out, tmp));
    }
    (b.build().unwrap(), vars)
}

/// Chain `f0 -> f1 -> ... -> f{n-1}` where each function forwards its
/// parameter to the next and the last one stores it into a global.
pub fn call_chain(n: usize) -> (Program, Vec<FuncId>) {
    let mut b = ProgramBuilder::new();
    let g = b.global("sink");
    let funcs: Vec<FuncId> = (0..n).map(|i| b.declare_function(format!("f{i}"))).collect();
    let params: Vec<VarId> = funcs.iter().map(|&f| b.param(f, "p")).collect();
    for i in 0..n {
        let body = if i + 1 < n {
            vec![Stmt::expr(Expr::call_func(
                funcs[i + 1],
                vec![Expr::ident(params[i])],
            ))]
        } else {
            vec![Stmt::assign(Expr::ident(g), Expr::ident(params[i]))]
        };
        b.set_body(funcs[i], body).unwrap();
    }
    (b.build().unwrap(), funcs)
}
