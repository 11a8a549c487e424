//! Escape Analysis Application Layer
//!
//! ## Hexagonal Architecture
//! - **Application**: Orchestrates batches and waves (this module)
//! - **Domain**: Locations, holes, leaks, decisions
//! - **Ports**: `SummaryProvider`, `EscapeAnalyzerPort`
//! - **Infrastructure**: Batch planner, graph builder, solver, emitter

mod analyze_escapes;

pub use analyze_escapes::{analyze_batch, EscapeAnalysisService};
