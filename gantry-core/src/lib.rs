//! Gantry Core
//!
//! Core types and abstractions for the Gantry control plane.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, Release, Pipeline, etc.)
//! - DTOs: Data transfer objects for enqueueing work
//!
//! Note: Persistence logic lives in gantry-store, execution logic in
//! gantry-worker, manifest generation in gantry-deploy.

pub mod domain;
pub mod dto;
