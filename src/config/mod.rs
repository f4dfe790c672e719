//! Configuration module for pixelframe
//!
//! Provides types and loading for `pxf.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
