use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Server-side job state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    #[default]
    Open,
    UploadComplete,
    InProgress,
    JobComplete,
    Aborted,
    Failed,
}

impl JobState {
    /// Terminal states end polling; the server will not move past them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::JobComplete | JobState::Failed | JobState::Aborted
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Open => "Open",
            JobState::UploadComplete => "UploadComplete",
            JobState::InProgress => "InProgress",
            JobState::JobComplete => "JobComplete",
            JobState::Aborted => "Aborted",
            JobState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Server-owned job description, mirrored locally by the controller.
///
/// Every successful response replaces the local copy wholesale; fields are
/// never patched individually. `api_version` is float-typed, the canonical
/// schema for the v2 ingest API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobInfo {
    pub id: String,
    pub state: JobState,
    pub object: String,
    pub operation: String,
    pub content_type: String,
    pub content_url: String,
    pub column_delimiter: String,
    pub line_ending: String,
    pub concurrency_mode: String,
    pub created_by_id: String,
    pub created_date: String,
    pub external_id_field_name: String,
    pub job_type: String,
    pub api_version: f32,
    #[serde(rename = "numberRecordsProcessed")]
    pub records_processed: u64,
    #[serde(rename = "numberRecordsFailed")]
    pub records_failed: u64,
    pub retries: u64,
    pub apex_processing_time: u64,
    pub api_active_processing_time: u64,
    pub total_processing_time: u64,
    #[serde(rename = "SystemModstamp")]
    pub system_modstamp: String,
}

/// Structured error the server returns in place of [`JobInfo`] when it
/// rejects a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase", default)]
#[error("code: {error_code}, message: {message}")]
pub struct JobError {
    pub error_code: String,
    pub message: String,
    pub fields: Vec<String>,
}

/// The two envelopes the ingest endpoints answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResponse {
    Info(JobInfo),
    Errors(Vec<JobError>),
}

impl JobResponse {
    /// Decodes a buffered response body.
    ///
    /// The same endpoints return either a JobInfo object or an array of
    /// JobError, so the body is read once as a JSON value and re-decoded
    /// according to its top-level shape. Anything that is neither an object
    /// nor an array is a generic parse error, never a [`JobError`].
    pub fn decode(op: &'static str, body: &[u8]) -> Result<JobResponse> {
        let value: Value =
            serde_json::from_slice(body).map_err(|source| Error::Parse { op, source })?;

        match value {
            Value::Array(_) => {
                let errors: Vec<JobError> = serde_json::from_value(value)
                    .map_err(|source| Error::Parse { op, source })?;
                Ok(JobResponse::Errors(errors))
            }
            Value::Object(_) => {
                let info: JobInfo = serde_json::from_value(value)
                    .map_err(|source| Error::Parse { op, source })?;
                Ok(JobResponse::Info(info))
            }
            _ => Err(Error::Parse {
                op,
                source: serde_json::Error::custom("expected a JSON object or array"),
            }),
        }
    }

    /// Turns this response into the operative error for a rejected request.
    /// The first server error is surfaced; a success envelope on a non-2xx
    /// status has no structured detail to report.
    pub fn into_rejection(self, op: &'static str, status: u16) -> Error {
        match self {
            JobResponse::Errors(errors) => Error::Rejected {
                op,
                status,
                error: errors.into_iter().next().unwrap_or_default(),
            },
            JobResponse::Info(_) => Error::UnexpectedStatus { op, status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_job_info_object() {
        let body = serde_json::json!({
            "id": "750xx000000001ABC",
            "state": "Open",
            "object": "Contact",
            "operation": "insert",
            "apiVersion": 43.0,
            "contentUrl": "services/data/v43.0/jobs/ingest/750xx000000001ABC/batches",
            "numberRecordsProcessed": 10,
            "numberRecordsFailed": 2
        });

        let decoded = JobResponse::decode("create", body.to_string().as_bytes()).unwrap();

        let info = match decoded {
            JobResponse::Info(info) => info,
            other => panic!("expected info, got {:?}", other),
        };
        assert_eq!(info.id, "750xx000000001ABC");
        assert_eq!(info.state, JobState::Open);
        assert_eq!(info.api_version, 43.0);
        assert_eq!(info.records_processed, 10);
        assert_eq!(info.records_failed, 2);
    }

    #[test]
    fn decodes_error_array_and_surfaces_first_element() {
        let body = serde_json::json!([
            {"errorCode": "INVALIDJOB", "message": "InvalidJob : Invalid job id", "fields": []},
            {"errorCode": "SECOND", "message": "ignored"}
        ]);

        let decoded = JobResponse::decode("upload", body.to_string().as_bytes()).unwrap();
        let err = decoded.into_rejection("upload", 400);

        assert!(err.is_rejection());
        let job_error = err.job_error().unwrap();
        assert_eq!(job_error.error_code, "INVALIDJOB");
        assert_eq!(job_error.message, "InvalidJob : Invalid job id");
    }

    #[test]
    fn scalar_body_is_a_parse_error_not_a_rejection() {
        let err = JobResponse::decode("create", b"42").unwrap_err();

        assert!(!err.is_rejection());
        assert!(matches!(err, Error::Parse { op: "create", .. }));
    }

    #[test]
    fn non_json_body_is_a_parse_error() {
        let err = JobResponse::decode("status", b"<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, Error::Parse { op: "status", .. }));
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::JobComplete.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Aborted.is_terminal());
        assert!(!JobState::Open.is_terminal());
        assert!(!JobState::UploadComplete.is_terminal());
        assert!(!JobState::InProgress.is_terminal());
    }
}
