//! Core domain types and traits for stackpipe.
//!
//! This crate contains:
//! - Deployment environment and resolved configuration types
//! - Pipeline, stage, action and artifact definitions
//! - Access roles and per-stage role plans
//! - The typed build plan executed by the build stage
//! - Tags, secret references and stack capabilities
//! - Lookup abstractions (caller identity, parameter store)

pub mod artifact;
pub mod build;
pub mod environment;
pub mod error;
pub mod identity;
pub mod parameter;
pub mod pipeline;
pub mod role;
pub mod secret;
pub mod stack;
pub mod tags;

pub use environment::{AccountId, DeploymentConfig, DeploymentEnvironment, ResourceName};
pub use error::{Error, Result};
