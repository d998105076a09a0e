//! Gantry Deploy
//!
//! Deployment manifest generation and the cluster apply engine.
//!
//! The generator is pure: it maps a [`config::DeploymentConfig`] to a set of
//! named YAML manifests. The apply engine takes those manifests plus a
//! decrypted cluster credential, ensures the target namespace, applies each
//! resource (create-or-update), and waits for the workload to report ready.

pub mod apply;
pub mod config;
pub mod error;
pub mod generator;

pub use config::DeploymentConfig;
pub use error::{ApplyError, GenerateError};
