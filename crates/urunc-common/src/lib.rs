//! # urunc-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the urunc network workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and holds the data that flows between the network
//! managers and the unikernel configuration builders.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
