//! Repository modules
//!
//! One module per entity; free functions over `&PgPool`.

pub mod application;
pub mod cluster;
pub mod git_server;
pub mod job;
pub mod pipeline;
pub mod release;
pub mod runner_agent;
pub mod source_repo;

pub use application as application_repository;
pub use cluster as cluster_repository;
pub use git_server as git_server_repository;
pub use job as job_repository;
pub use pipeline as pipeline_repository;
pub use release as release_repository;
pub use runner_agent as runner_agent_repository;
pub use source_repo as source_repo_repository;
