//! Pixelframe - layered pixel-art and frame-animation document model
//!
//! This library provides:
//! - Raster buffers with lossless text and PNG data-URL codecs
//! - Artworks made of ordered layers sharing one frame timeline
//! - Structural edits (layers, frames) and frame-count normalization
//! - Persistence of the artwork and its undo history to session storage

pub mod cli;
pub mod config;
pub mod history;
pub mod identity;
pub mod models;
pub mod persist;
pub mod raster;
pub mod session;
pub mod storage;
pub mod store;
pub mod validate;
