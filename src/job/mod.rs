//! Bulk ingest job lifecycle: configuration, wire types and the controller
//! state machine.

pub mod config;
pub mod controller;
pub mod response;

pub use config::{ColumnDelimiter, ContentType, JobConfig, Operation};
pub use controller::{Job, JobWatch, API_VERSION};
pub use response::{JobError, JobInfo, JobResponse, JobState};
