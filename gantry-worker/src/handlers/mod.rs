//! Job handlers
//!
//! One module per job family. Every handler transitions the owning business
//! record to its running sub-state on entry, before any remote work, and to
//! a terminal sub-state on exit, so the record is never left mid-flight
//! after a handled failure.

pub mod deployment;
pub mod git_server;
pub mod pipeline;
pub mod runner_agent;

/// Structured result of a best-effort teardown.
///
/// Uninstall failures during a stop job are reported here instead of failing
/// the job: the owning record is being stopped regardless, and the priority
/// is not leaving the job stuck.
#[derive(Debug, Clone, Default)]
pub struct Teardown {
    /// Set when the remote uninstall failed and cleanup may be incomplete
    pub uninstall_error: Option<String>,
}

impl Teardown {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn partial(error: impl Into<String>) -> Self {
        Self {
            uninstall_error: Some(error.into()),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.uninstall_error.is_none()
    }
}
