//! Declarative provisioning definition for the hit-counter webservice.
//!
//! The whole stack — site bucket, CDN distribution, hits table, counter
//! function, HTTP API, and optional DNS aliases — is assembled as one
//! CloudFormation template. There is no control flow here beyond the
//! presence check on the custom-domain inputs; everything else is data.

pub mod stack;
pub mod template;
