//! Shared utilities for stashkv
//!
//! This crate provides common utility functions used throughout the
//! stashkv workspace: atomic file writes, XDG base-directory resolution,
//! and tracing initialization.

pub mod atomic_file;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use xdg::*;
