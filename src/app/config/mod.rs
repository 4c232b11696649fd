//! Probe configuration.
//!
//! Two explicit values are built once and handed to whatever needs them:
//!
//! - [`ProbeSettings`] - region, tail size, wait/backoff tuning (TOML file)
//! - [`DeploymentOutputs`] - identifiers emitted by the provisioning step
//!   (CDK outputs JSON), looked up by output-name prefix because the
//!   provisioning tool appends a generated suffix to every key

#![warn(clippy::all, rust_2018_idioms)]

pub mod deployment_outputs;
pub mod settings;

pub use deployment_outputs::DeploymentOutputs;
pub use settings::{ProbeSettings, WaitSettings};
