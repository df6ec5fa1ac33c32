//! An in-process job queue.
//! Jobs are lost when the process exits.

use async_trait::async_trait;
use bytes::Bytes;
use smartstring::{LazyCompact, SmartString};
use std::{
	collections::{HashMap, VecDeque},
	time::Duration,
};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
	base::{
		client::JobQueueClient,
		errors::{AddJobError, ClaimJobError, GetJobResultError, GetJobStatusError, UpdateJobError},
	},
	id::JobId,
	info::{JobData, JobError, JobResultInfo, JobSnapshot, JobStatus, QueuedJob},
	operation::Operation,
	DEFAULT_MAX_ATTEMPTS,
};

struct JobRecord {
	status: JobStatus,
	attempt: u32,
	operations: Vec<Operation>,
	input: JobData,

	current_step: Option<u32>,
	total_steps: Option<u32>,
	current_operation_type: Option<SmartString<LazyCompact>>,
	error: Option<JobError>,
	result: Option<JobData>,

	created_at: OffsetDateTime,
	started_at: Option<OffsetDateTime>,
	finished_at: Option<OffsetDateTime>,
	lease_expires_at: Option<OffsetDateTime>,
}

impl JobRecord {
	fn snapshot(&self, job_id: &JobId) -> JobSnapshot {
		JobSnapshot {
			job_id: job_id.clone(),
			status: self.status,
			attempt: self.attempt,
			current_step: self.current_step,
			total_steps: self.total_steps,
			current_operation_type: self.current_operation_type.clone(),
			error: self.error.clone(),
			result: self.result.as_ref().map(|r| JobResultInfo {
				mime: r.mime.clone(),
				size: r.data.len() as u64,
			}),
			created_at: self.created_at,
			started_at: self.started_at,
			finished_at: self.finished_at,
		}
	}

	/// Move this job into a terminal state.
	/// Nothing reads a finished job's input, so we drop it here.
	fn finish(&mut self, status: JobStatus) {
		self.status = status;
		self.input.data = Bytes::new();
		self.current_operation_type = None;
		self.finished_at = Some(OffsetDateTime::now_utc());
		self.lease_expires_at = None;
	}
}

#[derive(Default)]
struct MemoryState {
	jobs: HashMap<JobId, JobRecord>,

	/// Ids of all non-terminal jobs, oldest first
	queue: VecDeque<JobId>,
}

impl MemoryState {
	/// Get a job that the claim `attempt` still owns
	fn owned_job(&mut self, job_id: &JobId, attempt: u32) -> Result<&mut JobRecord, UpdateJobError> {
		let job = self.jobs.get_mut(job_id).ok_or(UpdateJobError::NotFound)?;
		if job.attempt != attempt {
			return Err(UpdateJobError::NotOwner);
		}
		return Ok(job);
	}

	fn dequeue(&mut self, job_id: &JobId) {
		self.queue.retain(|x| x != job_id);
	}
}

/// A job queue that lives in this process's memory
pub struct MemoryJobQueueClient {
	state: Mutex<MemoryState>,

	/// How long a claim is valid for
	lease: Duration,

	/// Fail jobs instead of handing them out again after this many claims
	max_attempts: u32,
}

impl MemoryJobQueueClient {
	/// Make a new, empty job queue
	pub fn new(lease: Duration) -> Self {
		info!(message = "Opening job queue", queue_type = "memory", ?lease);

		Self {
			state: Mutex::new(MemoryState::default()),
			lease,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}

	/// Set the number of times a job may be claimed before we give up on it.
	/// Zero is treated as one.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);
		return self;
	}
}

#[async_trait]
impl JobQueueClient for MemoryJobQueueClient {
	async fn add_job(
		&self,
		job_id: JobId,
		input: &JobData,
		operations: &[Operation],
	) -> Result<JobId, AddJobError> {
		let mut state = self.state.lock().await;
		if state.jobs.contains_key(&job_id) {
			return Err(AddJobError::AlreadyExists);
		}

		state.jobs.insert(
			job_id.clone(),
			JobRecord {
				status: JobStatus::Pending,
				attempt: 0,
				operations: operations.to_vec(),
				input: input.clone(),
				current_step: None,
				total_steps: None,
				current_operation_type: None,
				error: None,
				result: None,
				created_at: OffsetDateTime::now_utc(),
				started_at: None,
				finished_at: None,
				lease_expires_at: None,
			},
		);
		state.queue.push_back(job_id.clone());

		return Ok(job_id);
	}

	async fn get_job_status(&self, job_id: &JobId) -> Result<JobSnapshot, GetJobStatusError> {
		let state = self.state.lock().await;
		return match state.jobs.get(job_id) {
			None => Err(GetJobStatusError::NotFound),
			Some(job) => Ok(job.snapshot(job_id)),
		};
	}

	async fn get_job_result(&self, job_id: &JobId) -> Result<JobData, GetJobResultError> {
		let state = self.state.lock().await;
		let job = state.jobs.get(job_id).ok_or(GetJobResultError::NotFound)?;

		return match (&job.status, &job.result) {
			(JobStatus::Success, Some(result)) => Ok(result.clone()),
			(status, _) => Err(GetJobResultError::NotReady(*status)),
		};
	}

	async fn claim_job(&self) -> Result<Option<QueuedJob>, ClaimJobError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = self.state.lock().await;
		let state = &mut *guard;

		let mut given_up = Vec::new();
		let mut claimed = None;

		for job_id in &state.queue {
			let job = match state.jobs.get_mut(job_id) {
				Some(job) => job,
				None => continue,
			};

			let claimable = match job.lease_expires_at {
				None => job.status == JobStatus::Pending,
				Some(expires) => !job.status.is_terminal() && expires <= now,
			};

			if !claimable {
				continue;
			}

			// Every worker that took this job stopped responding
			if job.attempt >= self.max_attempts {
				info!(
					message = "Job was abandoned too many times, failing it",
					job_id = job_id.as_str(),
					attempt = job.attempt
				);

				job.error = Some(JobError {
					message: format!("job was abandoned by its worker {} times", job.attempt),
					step: job.current_step.unwrap_or(0),
					operation_type: job.current_operation_type.clone().unwrap_or_default(),
				});
				job.finish(JobStatus::Failure);
				given_up.push(job_id.clone());
				continue;
			}

			let redelivered = job.attempt > 0;
			job.attempt += 1;
			job.lease_expires_at = Some(now + self.lease);
			if redelivered {
				job.status = JobStatus::Retry;
				job.current_operation_type = None;
			}

			debug!(
				message = "Claimed job",
				job_id = job_id.as_str(),
				attempt = job.attempt,
				redelivered
			);

			claimed = Some(QueuedJob {
				job_id: job_id.clone(),
				attempt: job.attempt,
				input: job.input.clone(),
				operations: job.operations.clone(),
				redelivered,
			});
			break;
		}

		for job_id in &given_up {
			state.dequeue(job_id);
		}

		return Ok(claimed);
	}

	async fn start_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		total_steps: u32,
	) -> Result<(), UpdateJobError> {
		let now = OffsetDateTime::now_utc();
		let mut state = self.state.lock().await;
		let job = state.owned_job(job_id, attempt)?;

		if !matches!(job.status, JobStatus::Pending | JobStatus::Retry) {
			return Err(UpdateJobError::NotRunning(job.status));
		}

		job.status = JobStatus::Started;
		job.total_steps = Some(total_steps);
		job.current_step = None;
		job.current_operation_type = None;
		job.started_at = Some(job.started_at.unwrap_or(now));
		job.lease_expires_at = Some(now + self.lease);

		return Ok(());
	}

	async fn progress_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		step: u32,
		operation_type: &str,
	) -> Result<(), UpdateJobError> {
		let now = OffsetDateTime::now_utc();
		let mut state = self.state.lock().await;
		let job = state.owned_job(job_id, attempt)?;

		if !job.status.is_running() {
			return Err(UpdateJobError::NotRunning(job.status));
		}

		if step <= job.current_step.unwrap_or(0) || step > job.total_steps.unwrap_or(0) {
			return Err(UpdateJobError::StaleProgress);
		}

		job.status = JobStatus::Progress;
		job.current_step = Some(step);
		job.current_operation_type = Some(operation_type.into());
		job.lease_expires_at = Some(now + self.lease);

		return Ok(());
	}

	async fn success_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		result: &JobData,
	) -> Result<(), UpdateJobError> {
		let mut state = self.state.lock().await;
		let job = state.owned_job(job_id, attempt)?;

		if !job.status.is_running() {
			return Err(UpdateJobError::NotRunning(job.status));
		}

		job.result = Some(result.clone());
		job.finish(JobStatus::Success);

		state.dequeue(job_id);
		return Ok(());
	}

	async fn fail_job(
		&self,
		job_id: &JobId,
		attempt: u32,
		error: &JobError,
	) -> Result<(), UpdateJobError> {
		let mut state = self.state.lock().await;
		let job = state.owned_job(job_id, attempt)?;

		if !job.status.is_running() {
			return Err(UpdateJobError::NotRunning(job.status));
		}

		job.error = Some(error.clone());
		job.finish(JobStatus::Failure);

		state.dequeue(job_id);
		return Ok(());
	}
}
