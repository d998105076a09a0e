//! Domain types
//!
//! Core business entities shared across the control plane.

pub mod app;
pub mod component;
pub mod job;
pub mod pipeline;
pub mod release;
