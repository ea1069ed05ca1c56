//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, PORT override)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared by value with the subsystems that need it
//!
//! Signing secret:
//!     environment variable named by token.secret_env
//!     → loader.rs (read_secret, fatal if missing)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - The secret never lives in the config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, read_secret, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, PageConfig, RateLimitConfig, ServiceConfig, StoreConfig,
    TimeoutConfig, TokenConfig,
};
pub use validation::{validate_config, ValidationError};
