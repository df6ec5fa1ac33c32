//! The job queue client api

use async_trait::async_trait;

use super::errors::{
	AddJobError, ClaimJobError, GetJobResultError, GetJobStatusError, UpdateJobError,
};
use crate::{
	id::JobId,
	info::{JobData, JobError, JobSnapshot, QueuedJob},
	operation::Operation,
};

/// A job store paired with a queue.
///
/// Queued jobs are the jobs in a claimable state. A claim hands a job
/// to exactly one worker for one lease. Once that lease expires without
/// the job reaching a terminal status, the job may be claimed again.
///
/// Every worker-side write carries the `attempt` of the claim it was made
/// under. Writes with a stale attempt are rejected with
/// [`UpdateJobError::NotOwner`], so only one worker ever mutates a job.
#[async_trait]
pub trait JobQueueClient
where
	Self: Send + Sync,
{
	/// Create a new job with status `PENDING` and queue it
	async fn add_job(
		&self,
		job_id: JobId,
		input: &JobData,
		operations: &[Operation],
	) -> Result<JobId, AddJobError>;

	/// Get a job's current state
	async fn get_job_status(&self, job_id: &JobId) -> Result<JobSnapshot, GetJobStatusError>;

	/// Get a job's output.
	/// Fails with [`GetJobResultError::NotReady`] unless this job's status is `SUCCESS`.
	async fn get_job_result(&self, job_id: &JobId) -> Result<JobData, GetJobResultError>;

	/// Claim the oldest claimable job.
	///
	/// A job is claimable if it is `PENDING` and was never claimed,
	/// or if it is not terminal and its lease has expired.
	/// Reclaimed jobs are moved to `RETRY`.
	///
	/// This action must be globally atomic. Only one process should
	/// ever get a given claim.
	async fn claim_job(&self) -> Result<Option<QueuedJob>, ClaimJobError>;

	/// Mark a claimed job as `STARTED`, record its step count and renew its lease.
	/// The job must be `PENDING` or `RETRY`. Clears any progress from an earlier attempt.
	async fn start_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		total_steps: u32,
	) -> Result<(), UpdateJobError>;

	/// Mark a job as `PROGRESS` on step `step` (starting at 1) and renew its lease.
	/// `step` must be greater than the job's current step.
	async fn progress_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		step: u32,
		operation_type: &str,
	) -> Result<(), UpdateJobError>;

	/// Mark a running job as `SUCCESS` and store its result
	async fn success_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		result: &JobData,
	) -> Result<(), UpdateJobError>;

	/// Mark a running job as `FAILURE`
	async fn fail_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		error: &JobError,
	) -> Result<(), UpdateJobError>;
}
