//! Configuration System
//!
//! Two tiers:
//! - Level 1: Preset - `EscapeConfig::from_preset(Preset::Fast)`
//! - Level 2: Overrides - builder setters or a YAML v1 document
//!
//! # Examples
//!
//! ```rust,ignore
//! use escapegraph_ir::config::{EscapeConfig, Preset};
//!
//! let config = EscapeConfig::from_preset(Preset::Balanced).diagnostic_level(1);
//! let config = EscapeConfig::from_yaml_file("escape.yaml")?;
//! ```

pub mod error;
pub mod escape_config;
pub mod io;
pub mod preset;
pub mod validation;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use escape_config::{EscapeConfig, EscapeConfigPatch};
pub use io::ConfigExportV1;
pub use preset::Preset;
pub use validation::{validated, Validatable};
