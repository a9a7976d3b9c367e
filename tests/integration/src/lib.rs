//! Integration test utilities for the permission engine
//!
//! This crate provides a service context over the in-memory store and
//! seeding helpers for end-to-end scenarios.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
