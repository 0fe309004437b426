use std::path::Path;
use std::time::Duration;

use reqwest::{Body, Client, StatusCode};
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::job::config::JobConfig;
use crate::job::response::{JobInfo, JobResponse};
use crate::job::JobState;

/// Pinned Bulk API version.
pub const API_VERSION: &str = "43.0";

/// Channels delivering watch output.
///
/// `status` carries each non-terminal [`JobInfo`] and closes once the job
/// reaches a terminal state; a polling failure arrives on `errors` instead.
/// Never both for the same polling iteration.
pub struct JobWatch {
    pub status: mpsc::Receiver<JobInfo>,
    pub errors: mpsc::Receiver<Error>,
}

/// Drives one bulk ingest job through the remote API.
///
/// The local `info` mirror is empty until [`create`](Job::create) succeeds
/// and is replaced wholesale on every successful server response.
pub struct Job {
    http: Client,
    session: Session,
    config: JobConfig,
    info: JobInfo,
}

impl Job {
    pub fn new(config: JobConfig, session: Session) -> Self {
        Self {
            http: Client::new(),
            session,
            config,
            info: JobInfo::default(),
        }
    }

    /// Last-known server-side state, as of the most recent mutating call.
    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    fn ingest_url(&self) -> String {
        format!(
            "{}/services/data/v{}/jobs/ingest",
            self.session.instance_url.trim_end_matches('/'),
            API_VERSION
        )
    }

    fn job_url(&self) -> String {
        format!("{}/{}", self.ingest_url(), self.info.id)
    }

    /// Content upload target, derived from the server-assigned content URL.
    fn batch_url(&self) -> String {
        format!(
            "{}/{}",
            self.session.instance_url.trim_end_matches('/'),
            self.info.content_url.trim_start_matches('/')
        )
    }

    fn ensure_created(&self) -> Result<()> {
        if self.info.id.is_empty() {
            Err(Error::MissingJobId)
        } else {
            Ok(())
        }
    }

    /// Creates the remote job from the configured object and operation.
    pub async fn create(&mut self) -> Result<()> {
        const OP: &str = "create";

        let response = self
            .http
            .post(self.ingest_url())
            .bearer_auth(&self.session.access_token)
            .json(&self.config)
            .send()
            .await
            .map_err(|source| Error::Http { op: OP, source })?;

        let new_info = read_job_info(OP, response).await?;
        info!(id = %new_info.id, object = %self.config.object, "job created");
        self.info = new_info;
        Ok(())
    }

    /// Uploads the batch content and signals the server that the upload is
    /// complete. The job must have been created first.
    pub async fn upload(&mut self, content: impl Into<Body>) -> Result<()> {
        self.ensure_created()?;
        self.put_batch(content.into()).await?;
        self.complete().await
    }

    /// Streams a file from disk as the batch content, then signals upload
    /// completion, without buffering the file in memory.
    pub async fn upload_file(&mut self, path: &Path) -> Result<()> {
        self.ensure_created()?;

        let file = tokio::fs::File::open(path).await?;
        let stream = FramedRead::new(file, BytesCodec::new());
        self.put_batch(Body::wrap_stream(stream)).await?;
        self.complete().await
    }

    async fn put_batch(&self, body: Body) -> Result<()> {
        const OP: &str = "upload";

        let response = self
            .http
            .put(self.batch_url())
            .bearer_auth(&self.session.access_token)
            .header("Content-Type", "text/csv")
            .body(body)
            .send()
            .await
            .map_err(|source| Error::Http { op: OP, source })?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "batch content accepted");
            return Ok(());
        }

        let body = response.bytes().await.map_err(|source| Error::Http { op: OP, source })?;
        Err(JobResponse::decode(OP, &body)?.into_rejection(OP, status.as_u16()))
    }

    /// Marks the upload complete so the server starts processing.
    pub async fn complete(&mut self) -> Result<()> {
        let new_info = self.patch_state("close", JobState::UploadComplete).await?;
        self.info = new_info;
        Ok(())
    }

    /// Aborts the job server-side.
    pub async fn abort(&mut self) -> Result<()> {
        let new_info = self.patch_state("abort", JobState::Aborted).await?;
        self.info = new_info;
        Ok(())
    }

    async fn patch_state(&self, op: &'static str, state: JobState) -> Result<JobInfo> {
        self.ensure_created()?;

        let response = self
            .http
            .patch(self.job_url())
            .bearer_auth(&self.session.access_token)
            .json(&serde_json::json!({ "state": state }))
            .send()
            .await
            .map_err(|source| Error::Http { op, source })?;

        read_job_info(op, response).await
    }

    /// Deletes the job. The server signals success with 204 and no body;
    /// any other status is a generic deletion failure.
    pub async fn delete(&mut self) -> Result<()> {
        self.ensure_created()?;

        let response = self
            .http
            .delete(self.job_url())
            .bearer_auth(&self.session.access_token)
            .send()
            .await
            .map_err(|source| Error::Http {
                op: "delete",
                source,
            })?;

        if response.status() == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(Error::DeleteFailed {
                status: response.status().as_u16(),
            })
        }
    }

    /// Fetches the current server-side job info.
    ///
    /// Unlike `create`, this does not update the cached `info`; callers that
    /// want the mirror refreshed must assign the result themselves.
    pub async fn get_info(&self) -> Result<JobInfo> {
        self.ensure_created()?;
        fetch_info(&self.http, &self.session.access_token, &self.job_url()).await
    }

    /// Polls the job on a fixed cadence from a dedicated task.
    ///
    /// Each non-terminal [`JobInfo`] is forwarded on the status channel in
    /// the order it was observed; reaching a terminal state closes the
    /// channel and stops polling. A polling error goes to the error channel
    /// instead and also stops polling. The caller-supplied token cancels the
    /// task without emitting anything further.
    pub fn watch(&self, interval: Duration, cancel: CancellationToken) -> Result<JobWatch> {
        self.ensure_created()?;

        let (status_tx, status_rx) = mpsc::channel(16);
        let (error_tx, error_rx) = mpsc::channel(1);

        let http = self.http.clone();
        let token = self.session.access_token.clone();
        let job_url = self.job_url();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("watch cancelled");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                match fetch_info(&http, &token, &job_url).await {
                    Ok(info) => {
                        if info.state.is_terminal() {
                            debug!(state = %info.state, "job reached terminal state");
                            return;
                        }
                        if status_tx.send(info).await.is_err() {
                            // caller stopped consuming
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = error_tx.send(err).await;
                        return;
                    }
                }
            }
        });

        Ok(JobWatch {
            status: status_rx,
            errors: error_rx,
        })
    }
}

async fn fetch_info(http: &Client, access_token: &str, job_url: &str) -> Result<JobInfo> {
    const OP: &str = "status";

    let response = http
        .get(job_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|source| Error::Http { op: OP, source })?;

    read_job_info(OP, response).await
}

/// Decodes a job endpoint response, disambiguating the success and
/// structured-error envelopes the API serves from the same URL.
async fn read_job_info(op: &'static str, response: reqwest::Response) -> Result<JobInfo> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| Error::Http { op, source })?;

    let decoded = JobResponse::decode(op, &body)?;

    if !status.is_success() {
        return Err(decoded.into_rejection(op, status.as_u16()));
    }

    match decoded {
        JobResponse::Info(info) => Ok(info),
        // an error array on a 2xx is still a rejection to the caller
        errors @ JobResponse::Errors(_) => Err(errors.into_rejection(op, status.as_u16())),
    }
}
