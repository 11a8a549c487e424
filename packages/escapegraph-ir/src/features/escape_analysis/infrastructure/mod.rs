//! Escape analysis infrastructure
//!
//! One batch flows through the stages in order:
//! `plan_batches` -> `LocationGraphBuilder` -> `GraphSolver` -> `DecisionEmitter`.

pub mod call_graph;
pub mod emitter;
pub mod graph_builder;
pub mod solver;

pub use call_graph::{plan_batches, Batch, BatchPlan, CallGraph};
pub use emitter::{BatchOutput, DecisionEmitter};
pub use graph_builder::{BatchGraph, LocationGraphBuilder};
pub use solver::{GraphSolver, SolveStats};
