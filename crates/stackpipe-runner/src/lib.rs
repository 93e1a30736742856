//! Local execution of the stackpipe build plan.
//!
//! Runs the same typed steps the hosted build project runs, against a
//! checked-out source tree, so configuration substitution can be exercised
//! before anything is pushed.

pub mod error;
pub mod local;
pub mod store;

pub use error::{RunnerError, RunnerResult};
pub use local::LocalBuildRunner;
pub use store::{AwsCliParameterStore, StaticParameterStore};
