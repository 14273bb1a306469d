//! Shared hit-counter domain primitives.
//!
//! This crate owns the HTTP event/response contract and runtime configuration
//! resolution. It intentionally excludes AWS SDK and Lambda runtime concerns;
//! those live in `crates/hits_lambda`.

pub mod config;
pub mod contract;
