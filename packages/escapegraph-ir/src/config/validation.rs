//! Configuration validation

use super::error::ConfigResult;

/// Trait for validatable configuration objects
///
/// # Example
/// ```rust,ignore
/// fn build_service<C: Validatable>(config: C) -> Result<Service, ConfigError> {
///     config.validate()?;
///     // ... build service
/// }
/// ```
pub trait Validatable {
    /// Validate the configuration
    ///
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

/// Validate and hand back the config, logging which one failed.
pub fn validated<C: Validatable>(config: C) -> ConfigResult<C> {
    if let Err(e) = config.validate() {
        tracing::warn!("{} rejected: {}", config.config_name(), e);
        return Err(e);
    }
    Ok(config)
}
