//! # Tandem Configuration Library
//!
//! Type-safe configuration for the Tandem synchronization core: the status
//! vocabulary, the field names being kept in step, the tracked locations and
//! the event bus / sync engine timing knobs.
//!
//! ## Features
//!
//! - Multi-format support (TOML, YAML, JSON)
//! - Serde defaults for every section, so a partial file is enough
//! - Validation with actionable error messages
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tandem_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("tandem.toml").await?;
//!     for status in &config.statuses {
//!         println!("{} (done: {})", status.name, status.is_done);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod config;
mod error;
mod loader;

pub use components::*;
pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::*;
