#![warn(clippy::pedantic)]

//! A resolve → diff → apply orchestrator for multi-stack, multi-context CloudFormation
//! deployments.
//!
//! This crate implements the core pipeline only: parameter resolution, dependency ordering,
//! template comparison, diffing, and the deploy/delete/describe/validate drivers. Configuration
//! loading, template fetching, and the AWS SDK binding itself are narrow interfaces in
//! [`ports`] that callers implement.

pub mod cancel;
pub mod delete;
pub mod dependency;
pub mod deploy;
pub mod describe;
pub mod diff;
mod error;
pub mod model;
mod operation;
pub mod parameter;
pub mod ports;
pub mod resolver;
pub mod status;
pub mod status_reason;
mod tag;
pub mod template_diff;
pub mod validate;

pub use error::{CloudError, Error, Result, ValidationIssue};
pub use operation::{OperationOutcome, OperationTracker, StackFailure, StackWarning};
pub use tag::Tag;
