use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{spawn, JoinHandle},
};

use anyhow::{bail, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, info};

use crate::{
    error::IngestError,
    geometry::FeatureCollection,
    input::{group_files, ingest_group, FileGroup, InputFile},
    registry::LayerRegistry,
    reproject::Reprojector,
    upload::UploadSummary,
};

/// A flag that asks the worker to skip the remaining groups of a job
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What happened to a single file group
#[derive(Debug)]
pub enum Outcome {
    Done(Result<FeatureCollection, IngestError>),

    /// The job was cancelled before the group was decoded
    Cancelled,
}

#[derive(Debug)]
pub struct GroupOutcome {
    pub base: String,
    pub outcome: Outcome,
}

struct Job {
    files: Vec<InputFile>,
    token: CancelToken,
    outcomes: Sender<GroupOutcome>,
}

/// Receives the outcomes of a submitted job in group order
pub struct IngestHandle {
    token: CancelToken,
    outcomes: Receiver<GroupOutcome>,
}

impl IngestHandle {
    /// Cancels the job. A group that is being decoded is completed, all
    /// following groups are reported as cancelled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Blocks until the next outcome is available. Returns `None` after the
    /// last group of the job.
    pub fn next_outcome(&self) -> Option<GroupOutcome> {
        self.outcomes.recv().ok()
    }

    /// Waits for the job to finish and adds all decoded layers to the
    /// registry
    pub fn wait(self, registry: &mut LayerRegistry) -> UploadSummary {
        let mut summary = UploadSummary::default();
        for o in self.outcomes {
            match o.outcome {
                Outcome::Done(result) => summary.record(&o.base, result, registry),
                Outcome::Cancelled => summary.cancelled.push(o.base),
            }
        }
        summary
    }
}

/// Decodes uploads on a background thread. Jobs are processed one after
/// the other in the order they were submitted.
pub struct IngestWorker {
    jobs: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl IngestWorker {
    pub fn spawn() -> Self {
        let (job_send, job_recv) = bounded::<Job>(16);
        let thread = spawn(move || {
            // transform objects cannot leave this thread
            let mut reprojector = Reprojector::default();
            for job in job_recv {
                run_job(job, &mut reprojector, ingest_group);
            }
        });

        Self {
            jobs: Some(job_send),
            thread: Some(thread),
        }
    }

    pub fn submit(&self, files: Vec<InputFile>) -> Result<IngestHandle> {
        self.submit_with_token(files, CancelToken::default())
    }

    /// Submits a job that can be cancelled through the given token
    pub fn submit_with_token(
        &self,
        files: Vec<InputFile>,
        token: CancelToken,
    ) -> Result<IngestHandle> {
        let Some(jobs) = &self.jobs else {
            bail!("Ingest worker has already been shut down");
        };

        let (outcome_send, outcome_recv) = unbounded();
        jobs.send(Job {
            files,
            token: token.clone(),
            outcomes: outcome_send,
        })?;

        Ok(IngestHandle {
            token,
            outcomes: outcome_recv,
        })
    }

    /// Waits for all submitted jobs to finish and stops the worker thread
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if let Err(err) = thread.join() {
                bail!("Ingest thread threw an error: {err:?}");
            }
        }
        Ok(())
    }
}

impl Drop for IngestWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            debug!("{e}");
        }
    }
}

fn run_job<F>(job: Job, reprojector: &mut Reprojector, mut ingest: F)
where
    F: FnMut(&FileGroup, &mut Reprojector) -> Result<FeatureCollection, IngestError>,
{
    let groups = group_files(job.files);
    info!("Ingesting {} file group(s)", groups.len());

    for group in groups {
        let outcome = if job.token.is_cancelled() {
            Outcome::Cancelled
        } else {
            Outcome::Done(ingest(&group, reprojector))
        };

        let o = GroupOutcome {
            base: group.base,
            outcome,
        };
        if job.outcomes.send(o).is_err() {
            debug!("Ingest handle dropped. Skipping remaining groups.");
            return;
        }
    }
}
