//! Run one claimed job, step by step

use chroma_jobqueue::{
	base::{client::JobQueueClient, errors::UpdateJobError},
	id::JobId,
	info::{JobData, JobError, QueuedJob},
	operation::Operation,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
	base::{RunTransformError, TransformDispatcher},
	helpers::TransformParameters,
};

//
// MARK: Errors
//

/// An error we encounter when the job store itself fails.
/// The job is left as-is and will be redelivered once its lease expires.
#[derive(Debug, Error)]
pub enum RunJobError {
	#[error("job store error while updating job")]
	Store(#[source] UpdateJobError),
}

/// How a job run ended
#[derive(Debug)]
pub enum JobOutcome {
	/// Every step finished, the result was stored
	Succeeded,

	/// A step failed, the error was stored
	Failed(JobError),

	/// The job store refused one of our writes, so we stopped.
	/// This happens when another worker claimed this job.
	Abandoned(UpdateJobError),
}

/// Split store rejections (`Ok(Err(_))`) from store failures (`Err(_)`)
fn check_update(
	res: Result<(), UpdateJobError>,
) -> Result<Result<(), UpdateJobError>, RunJobError> {
	return match res {
		Ok(()) => Ok(Ok(())),
		Err(UpdateJobError::DbError(e)) => Err(RunJobError::Store(UpdateJobError::DbError(e))),
		Err(e) => Ok(Err(e)),
	};
}

//
// MARK: PipelineJob
//

/// One claimed job, ready to run
pub struct PipelineJob<'a> {
	dispatcher: &'a TransformDispatcher,

	/// The longest we'll wait for one step
	step_timeout: Duration,

	job_id: JobId,
	attempt: u32,
	input: JobData,
	operations: Vec<Operation>,
}

impl<'a> PipelineJob<'a> {
	pub fn new(dispatcher: &'a TransformDispatcher, step_timeout: Duration, job: QueuedJob) -> Self {
		return Self {
			dispatcher,
			step_timeout,
			job_id: job.job_id,
			attempt: job.attempt,
			input: job.input,
			operations: job.operations,
		};
	}

	/// Run every step of this job in order, recording progress in `client`.
	///
	/// Step failures are recorded in the job store and returned as [`JobOutcome::Failed`].
	/// This only returns an error if the job store fails.
	pub async fn run(self, client: &dyn JobQueueClient) -> Result<JobOutcome, RunJobError> {
		let total_steps = u32::try_from(self.operations.len()).unwrap_or(u32::MAX);

		debug!(
			message = "Starting job",
			job_id = self.job_id.as_str(),
			attempt = self.attempt,
			total_steps
		);

		if let Err(e) = check_update(
			client
				.start_job(&self.job_id, self.attempt, total_steps)
				.await,
		)? {
			return Ok(self.abandon(e));
		}

		let mut buffer = self.input.clone();
		for (i, op) in self.operations.iter().enumerate() {
			let step = u32::try_from(i + 1).unwrap_or(u32::MAX);

			// Progress must be visible before the step runs
			if let Err(e) = check_update(
				client
					.progress_job(&self.job_id, self.attempt, step, &op.operation_type)
					.await,
			)? {
				return Ok(self.abandon(e));
			}

			debug!(
				message = "Running step",
				job_id = self.job_id.as_str(),
				step,
				operation_type = op.operation_type.as_str()
			);

			buffer = match self.run_step(op, buffer).await {
				Ok(x) => x,
				Err(error) => {
					let error = JobError {
						message: error.to_string(),
						step,
						operation_type: op.operation_type.clone(),
					};

					info!(
						message = "Job failed",
						job_id = self.job_id.as_str(),
						step,
						operation_type = op.operation_type.as_str(),
						error = error.message
					);

					if let Err(e) =
						check_update(client.fail_job(&self.job_id, self.attempt, &error).await)?
					{
						return Ok(self.abandon(e));
					}

					return Ok(JobOutcome::Failed(error));
				}
			};
		}

		if let Err(e) = check_update(
			client
				.success_job(&self.job_id, self.attempt, &buffer)
				.await,
		)? {
			return Ok(self.abandon(e));
		}

		info!(
			message = "Job finished successfully",
			job_id = self.job_id.as_str(),
			mime = buffer.mime.to_string(),
			size = buffer.data.len()
		);

		return Ok(JobOutcome::Succeeded);
	}

	/// Run one step on its own task.
	/// Panics in the transform become errors, and we give up after `step_timeout`.
	async fn run_step(&self, op: &Operation, input: JobData) -> Result<JobData, RunTransformError> {
		let transform = self
			.dispatcher
			.get_transform(&op.operation_type)
			.ok_or_else(|| RunTransformError::UnknownOperation {
				operation_type: op.operation_type.clone(),
			})?;

		let params = TransformParameters::from(op.params.clone());
		let mut task = tokio::spawn(async move { transform.run(params, input).await });

		return match tokio::time::timeout(self.step_timeout, &mut task).await {
			Err(_) => {
				task.abort();
				Err(RunTransformError::Timeout {
					after: self.step_timeout,
				})
			}
			Ok(Err(join_error)) => Err(join_error.into()),
			Ok(Ok(res)) => res,
		};
	}

	fn abandon(&self, reason: UpdateJobError) -> JobOutcome {
		warn!(
			message = "Job store rejected update, abandoning job",
			job_id = self.job_id.as_str(),
			attempt = self.attempt,
			reason = reason.to_string()
		);

		return JobOutcome::Abandoned(reason);
	}
}
