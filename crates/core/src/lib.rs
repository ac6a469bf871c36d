//! Core domain types, errors, and constants for `stashkv`.
//!
//! This crate establishes the foundational building blocks shared by the
//! rest of the workspace:
//!
//! - **`errors`**: the primary `Error` enum and `Result` type alias,
//!   centralizing all failure modes of the store and the persistence
//!   coordinator.
//! - **`constants`**: shared static constants such as the placeholder
//!   identity prefix and environment variable names.

pub mod constants;
pub mod errors;

pub use self::{
    constants::*,
    errors::{Error, Result},
};
