//! Job scheduling
//!
//! Contains the poll loop that claims and executes pending jobs.

mod poller;

pub use poller::JobPoller;
