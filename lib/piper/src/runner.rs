//! Worker loops that pull jobs off the queue and run them

use chroma_jobqueue::{
	base::{client::JobQueueClient, errors::ClaimJobError},
	id::JobId,
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::{
	base::TransformDispatcher,
	job::{JobOutcome, PipelineJob, RunJobError},
};

/// `await` for this many ms between successive polls
/// of an empty job queue.
pub const ASYNC_POLL_AWAIT_MS: u64 = 1000;

/// Wait this long after a job store error before trying again
const ERROR_BACKOFF_MS: u64 = 5000;

/// Runner settings shared by every worker
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
	/// The longest one step may run before we fail its job
	pub step_timeout: Duration,

	/// How long to wait after finding the queue empty
	pub poll_interval: Duration,
}

/// A pool of workers sharing one queue and one transform table
pub struct PipelineRunner {
	dispatcher: Arc<TransformDispatcher>,
	client: Arc<dyn JobQueueClient>,
	config: RunnerConfig,
}

impl PipelineRunner {
	/// Initialize a new runner
	pub fn new(
		dispatcher: Arc<TransformDispatcher>,
		client: Arc<dyn JobQueueClient>,
		config: RunnerConfig,
	) -> Self {
		Self {
			dispatcher,
			client,
			config,
		}
	}

	/// Claim one job and run it.
	/// Returns `Ok(None)` if the queue had nothing for us.
	pub async fn run_next(&self) -> Result<Option<(JobId, JobOutcome)>, RunNextError> {
		let job = match self.client.claim_job().await? {
			Some(x) => x,
			None => return Ok(None),
		};

		let job_id = job.job_id.clone();
		if job.redelivered {
			info!(
				message = "Retrying redelivered job",
				job_id = job_id.as_str(),
				attempt = job.attempt
			);
		}

		let outcome = PipelineJob::new(&self.dispatcher, self.config.step_timeout, job)
			.run(&*self.client)
			.await?;

		return Ok(Some((job_id, outcome)));
	}

	/// Run jobs forever
	pub async fn run_worker(&self, worker: usize) {
		debug!(message = "Starting worker", worker);

		loop {
			match self.run_next().await {
				Ok(Some((job_id, outcome))) => {
					debug!(
						message = "Worker finished job",
						worker,
						job_id = job_id.as_str(),
						outcome = outcome_name(&outcome)
					);
				}

				Ok(None) => {
					// No job ready, wait a bit...
					tokio::time::sleep(self.config.poll_interval).await;
				}

				Err(RunNextError::Claim(error)) => {
					error!(message = "DB error while getting job", worker, ?error);
					tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
				}

				Err(RunNextError::Run(error)) => {
					error!(message = "DB error while running job", worker, ?error);
					tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
				}
			}
		}
	}

	/// Start `count` workers on the current runtime
	pub fn spawn_workers(self: &Arc<Self>, count: usize) -> JoinSet<()> {
		let mut set = JoinSet::new();
		for worker in 0..count {
			let runner = self.clone();
			set.spawn(async move { runner.run_worker(worker).await });
		}

		info!(message = "Started workers", count);
		return set;
	}
}

fn outcome_name(outcome: &JobOutcome) -> &'static str {
	match outcome {
		JobOutcome::Succeeded => "succeeded",
		JobOutcome::Failed(_) => "failed",
		JobOutcome::Abandoned(_) => "abandoned",
	}
}

/// An error we encounter while claiming and running a job
#[derive(Debug, thiserror::Error)]
pub enum RunNextError {
	#[error("could not claim job")]
	Claim(#[from] ClaimJobError),

	#[error("could not run job")]
	Run(#[from] RunJobError),
}
