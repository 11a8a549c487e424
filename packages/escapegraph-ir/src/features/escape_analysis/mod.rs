//! Escape Analysis (Hexagonal Architecture)
//!
//! Decides, for every local variable and allocation site, whether its storage
//! may live in the stack frame or must move to the heap, and summarizes how
//! each function's parameters leak.
//!
//! ## Hexagonal Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Application Layer                            │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │ EscapeAnalysisService (waves, rayon pool, merge)        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                         ▲                                       │
//! │                         │ uses                                  │
//! │                         ▼                                       │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                   Domain Layer                          │   │
//! │  │ Location, Hole, Leaks, SiteDecision, EscapeReport       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                         ▲                                       │
//! │                         │ defines                               │
//! │                         ▼                                       │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                   Ports Layer                           │   │
//! │  │ SummaryProvider, EscapeAnalyzerPort                     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                         ▲                                       │
//! │                         │ implements                            │
//! │                         ▼                                       │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Infrastructure Layer                     │   │
//! │  │ plan_batches, LocationGraphBuilder, GraphSolver,        │   │
//! │  │ DecisionEmitter                                         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pipeline
//!
//! 1. **Batching**: strongly connected components of the static call graph,
//!    callees first, grouped into waves of independent batches.
//! 2. **Graph building**: every expression is evaluated into a `Hole`; flows
//!    become weighted edges between locations.
//! 3. **Solving**: shortest-dereference walks from each root until no
//!    attribute or leak changes.
//! 4. **Emission**: stack/heap decisions, parameter leak summaries and
//!    optional diagnostics.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{analyze_batch, EscapeAnalysisService};
pub use domain::{
    AllocDecision, EscapeDiagnostic, EscapeReport, EscapeStats, FlowStep, FunctionSummary,
    LeakKind, LeakTag, Leaks, LocAttrs, SiteDecision, SummaryStore,
};
pub use infrastructure::{plan_batches, Batch, BatchOutput, BatchPlan};
pub use ports::{EscapeAnalyzerPort, SummaryProvider};
