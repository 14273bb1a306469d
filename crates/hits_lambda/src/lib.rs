//! AWS-oriented adapters and handlers for the hit-counter webservice.
//!
//! This crate owns runtime integration details: the hit-count Lambda handler
//! and the key-value store adapter seam. The DynamoDB-backed adapter lives in
//! the Lambda binary; the handler itself is a pure function over the seam.

pub mod adapters;
pub mod handlers;
