//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NodeConfig (validated, immutable)
//!     → TransportOptions + advertise address for the factory
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Address usability (wildcard, non-TCP) is decided by the advertiser, not here

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::{LogSinkConfig, LoggingConfig, NodeConfig, ObservabilityConfig, TransportConfig};
pub use validation::{validate_config, ValidationError};
