//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CritterConfig (validated, immutable)
//!     → RetryPolicy / BreakerPolicy / provider backends
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    BreakerConfig, CritterConfig, ObservabilityConfig, ProviderConfig, RetryConfig, ReviewConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
