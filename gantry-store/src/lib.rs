//! Gantry Store
//!
//! Postgres persistence for the control plane: pool construction, idempotent
//! migrations, and one repository module per entity.
//!
//! The job repository carries the single concurrency-critical operation of
//! the whole system: the atomic claim (conditional pending -> processing
//! update) that guarantees at most one worker owns a job at a time.

pub mod db;
pub mod repository;
