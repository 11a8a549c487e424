//! Property-based tests for the escape analysis
//!
//! Invariants over randomly generated straight-line functions:
//! - Monotonicity: adding a statement never moves a variable back to the stack
//! - Soundness: a local whose address is stored in a global is on the heap

mod common;

use common::*;
use escapegraph_ir::{AllocDecision, Expr, Program, ProgramBuilder, Stmt, VarId};
use proptest::prelude::*;

const LOCALS: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Op {
    /// `xi = &xj`
    AddrOf(usize, usize),
    /// `xi = xj`
    Copy(usize, usize),
    /// `xi = *xj`
    Load(usize, usize),
    /// `*xi = xj`
    Store(usize, usize),
    /// `g = xi`
    Publish(usize),
    /// `return xi`
    Return(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let idx = 0..LOCALS;
    prop_oneof![
        (idx.clone(), idx.clone()).prop_map(|(i, j)| Op::AddrOf(i, j)),
        (idx.clone(), idx.clone()).prop_map(|(i, j)| Op::Copy(i, j)),
        (idx.clone(), idx.clone()).prop_map(|(i, j)| Op::Load(i, j)),
        (idx.clone(), idx.clone()).prop_map(|(i, j)| Op::Store(i, j)),
        idx.clone().prop_map(Op::Publish),
        idx.prop_map(Op::Return),
    ]
}

fn build(ops: &[Op]) -> (Program, Vec<VarId>) {
    let mut b = ProgramBuilder::new();
    let g = b.global("g");
    let f = b.declare_function("f");
    b.result(f, "~r0");
    let xs: Vec<VarId> = (0..LOCALS).map(|i| b.local(f, format!("x{i}"))).collect();

    let mut body: Vec<Stmt> = xs.iter().map(|&x| Stmt::decl(x, None)).collect();
    for op in ops {
        body.push(match *op {
            Op::AddrOf(i, j) => Stmt::assign(Expr::ident(xs[i]), Expr::addr_of(Expr::ident(xs[j]))),
            Op::Copy(i, j) => Stmt::assign(Expr::ident(xs[i]), Expr::ident(xs[j])),
            Op::Load(i, j) => Stmt::assign(Expr::ident(xs[i]), Expr::deref(Expr::ident(xs[j]))),
            Op::Store(i, j) => Stmt::assign(Expr::deref(Expr::ident(xs[i])), Expr::ident(xs[j])),
            Op::Publish(i) => Stmt::assign(Expr::ident(g), Expr::ident(xs[i])),
            Op::Return(i) => Stmt::ret(vec![Expr::ident(xs[i])]),
        });
    }
    b.set_body(f, body).unwrap();
    (b.build().unwrap(), xs)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_adding_flows_is_monotone(
        ops in prop::collection::vec(op_strategy(), 0..12),
        extra in op_strategy(),
    ) {
        let (base, xs) = build(&ops);
        let mut extended_ops = ops.clone();
        extended_ops.push(extra);
        let (extended, _) = build(&extended_ops);

        let before = analyze(&base, 0);
        let after = analyze(&extended, 0);
        for &x in &xs {
            if before.var_decision(x) == Some(AllocDecision::Heap) {
                prop_assert_eq!(after.var_decision(x), Some(AllocDecision::Heap));
            }
        }
    }

    #[test]
    fn prop_published_address_escapes(
        ops in prop::collection::vec(op_strategy(), 0..12),
        target in 0..LOCALS,
        via in 0..LOCALS,
    ) {
        // x_via = &x_target; g = x_via, then arbitrary noise
        let mut all = vec![Op::AddrOf(via, target), Op::Publish(via)];
        all.extend(ops);
        let (program, xs) = build(&all);
        let report = analyze(&program, 0);
        prop_assert_eq!(report.var_decision(xs[target]), Some(AllocDecision::Heap));
    }

    #[test]
    fn prop_every_local_gets_a_decision(ops in prop::collection::vec(op_strategy(), 0..12)) {
        let (program, xs) = build(&ops);
        let report = analyze(&program, 1);
        for &x in &xs {
            prop_assert!(report.var_decision(x).is_some());
        }
    }
}
