/*
 * Escapegraph IR - Static Escape Analysis Engine
 *
 * Feature-First Hexagonal Architecture:
 * - config/    : Presets, validation, YAML overrides
 * - features/  : Vertical slices (ir → escape_analysis)
 * - errors     : Crate-wide error type
 *
 * Performance:
 * - Arena-backed location graphs, one per call-graph batch
 * - Rayon work-stealing across independent batches of a wave
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Graph builder helpers thread many params
#![allow(clippy::type_complexity)] // Side tables keyed by ids
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::collapsible_else_if)] // else if clarity
#![allow(clippy::derivable_impls)] // Manual impl for documentation
#![allow(clippy::only_used_in_recursion)] // Recursive params for API clarity
#![allow(clippy::needless_range_loop)] // Range loop for indexing
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::match_like_matches_macro)] // Match for readability

pub mod config;
pub mod errors;
pub mod features;

pub use config::{ConfigError, EscapeConfig, Preset};
pub use errors::{EscapeGraphError, EscapeResult};
pub use features::escape_analysis::{
    AllocDecision, EscapeAnalysisService, EscapeAnalyzerPort, EscapeDiagnostic, EscapeReport,
    EscapeStats, FlowStep, FunctionSummary, LeakKind, Leaks, SiteDecision,
};
pub use features::ir::{
    AllocKind, CompositeKind, Expr, FuncId, IndexKind, Program, ProgramBuilder, Site, SiteId,
    Stmt, VarId,
};
