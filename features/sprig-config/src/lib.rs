//! Sprig Config provides layered property sources that the container reads its own settings
//! from, and that literal bean values are resolved against.
//!
//! Sprig Config is split into two major parts:
//! 1. PropertySources: An ordered registry of named sources, first source wins
//! 2. Placeholders: `${key}` and `${key:default}` resolution over those sources
//!
//! # Examples
//!
//! ```rust
//! use sprig_config::{PropertySource, PropertySources};
//!
//! let mut sources = PropertySources::new();
//! sources
//!     .add_last(PropertySource::from_pairs(
//!         "application",
//!         [("app.host", "localhost"), ("app.port", "8080")],
//!     ))
//!     .unwrap();
//!
//! let url = sources.resolve_placeholders("http://${app.host}:${app.port}").unwrap();
//! assert_eq!(url, "http://localhost:8080");
//!
//! let port: Option<u16> = sources.get_parsed("app.port").unwrap();
//! assert_eq!(port, Some(8080));
//! ```
//!
//! Sprig Config consists of the following components:
//!
//! 1. Provider - for registering sources and reading properties
//! 2. Placeholder - for resolving placeholders in values
//! 3. Errors - for property errors

pub mod errors;
mod placeholder;
pub mod provider;

pub use errors::{PropertyError, RegisterSourceError};
pub use provider::{PropertySource, PropertySources};
