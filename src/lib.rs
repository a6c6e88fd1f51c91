//! Bookstore application library
//!
//! The `books` module plus the bootstrap that wires settings, the record
//! store, the module registry, and the HTTP server together.

pub mod bootstrap;
pub mod modules;

pub use modules::*;
