//! Escape analysis domain models

pub mod decision;
pub mod hole;
pub mod leaks;
pub mod location;
pub mod report;
pub mod summary;

pub use decision::{
    AllocDecision, EscapeDiagnostic, EscapeStats, FlowStep, FunctionSummary, SiteDecision,
};
pub use hole::Hole;
pub use leaks::{LeakKind, LeakTag, Leaks, NUM_ESC_RESULTS};
pub use location::{Edge, FlowHop, LocAttrs, Location, LocationArena, LocationId, Note, Synthetic};
pub use report::EscapeReport;
pub use summary::SummaryStore;
