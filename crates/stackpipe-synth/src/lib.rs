//! Pipeline declaration and CloudFormation synthesis for stackpipe.
//!
//! Synthesis is a single linear pass: publish the parameters, define the
//! roles, declare the pipeline topology, render the template, then stamp
//! the tags (the only step that reaches outside the process).

pub mod assembly;
pub mod error;
pub mod identity;
pub mod publisher;
pub mod roles;
pub mod tagger;
pub mod template;
pub mod topology;

pub use assembly::{CloudAssembly, Declaration, declare, synthesize};
pub use error::{SynthError, SynthResult};
pub use identity::AwsCliIdentityProvider;
