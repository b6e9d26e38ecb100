//! Core domain types for Weft.

pub mod config;
pub mod stack;
pub mod store;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
