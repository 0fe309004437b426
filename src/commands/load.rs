use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::credentials;
use crate::job::{ColumnDelimiter, Job, JobConfig, Operation};

pub async fn run(
    path: Option<&Path>,
    object: &str,
    operation: Operation,
    delim: &str,
    session_path: Option<&Path>,
    watch_secs: Option<u64>,
) -> Result<()> {
    // configuration problems surface before any network call
    let delimiter = ColumnDelimiter::parse(delim)?;
    let session = credentials::load_session(session_path)?;

    let config = JobConfig::new(object, operation, delimiter);
    let mut job = Job::new(config, session);

    println!("Creating {} job for {}...", operation, object);
    job.create().await.context("Could not create job")?;
    println!("Job {} created.", job.info().id);

    println!("Uploading content...");
    match path {
        Some(path) => job
            .upload_file(path)
            .await
            .with_context(|| format!("Could not upload {}", path.display()))?,
        None => {
            let mut content = Vec::new();
            std::io::stdin()
                .read_to_end(&mut content)
                .context("Failed to read CSV content from stdin")?;
            job.upload(content)
                .await
                .context("Could not upload content to job")?;
        }
    }
    println!("Upload complete.");

    if let Some(secs) = watch_secs {
        watch_job(&job, Duration::from_secs(secs)).await?;
    }

    Ok(())
}

/// Prints progress on every status event until the job finishes, an error
/// arrives, or the user interrupts with ctrl-c.
async fn watch_job(job: &Job, interval: Duration) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut watch = job.watch(interval, cancel.clone())?;

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    loop {
        tokio::select! {
            status = watch.status.recv() => match status {
                Some(status) => println!(
                    "Records processed: {}\tRecords failed: {}",
                    status.records_processed, status.records_failed
                ),
                None => break,
            },
            Some(err) = watch.errors.recv() => {
                return Err(err).context("Watching job reported error");
            }
        }
    }

    println!("Job {} finished.", job.info().id);
    Ok(())
}
