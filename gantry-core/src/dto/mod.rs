//! DTOs (Data Transfer Objects)
//!
//! Shapes used to hand work into the queue. The HTTP API layer constructs
//! these; the store persists them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobPayload;

/// Request to enqueue a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub org_id: Uuid,
    pub payload: JobPayload,
}
