//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! - ir/              - Program model consumed by the analysis
//! - escape_analysis/ - domain, ports, application, infrastructure

pub mod escape_analysis;
pub mod ir;
