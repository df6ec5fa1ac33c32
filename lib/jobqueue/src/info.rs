//! Helper structs that describe jobs and their state

use bytes::Bytes;
use chroma_util::MimeType;
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::{fmt::Display, str::FromStr};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{id::JobId, operation::Operation};

/// A job's status, as stored in the job store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
	/// This job is waiting for a worker
	Pending,

	/// A worker has started this job
	Started,

	/// A worker is running one of this job's steps
	Progress,

	/// This job finished, its result is available
	Success,

	/// This job failed, its error is available
	Failure,

	/// This job was redelivered after its worker stopped responding
	Retry,
}

impl JobStatus {
	/// The string we store this status as.
	/// Matches this type's serde representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Started => "STARTED",
			Self::Progress => "PROGRESS",
			Self::Success => "SUCCESS",
			Self::Failure => "FAILURE",
			Self::Retry => "RETRY",
		}
	}

	/// Is this a final status?
	/// Jobs never leave a terminal status.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Success | Self::Failure)
	}

	/// Is a worker allowed to run steps of a job with this status?
	pub fn is_running(&self) -> bool {
		matches!(self, Self::Started | Self::Progress)
	}
}

impl Display for JobStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"PENDING" => Self::Pending,
			"STARTED" => Self::Started,
			"PROGRESS" => Self::Progress,
			"SUCCESS" => Self::Success,
			"FAILURE" => Self::Failure,
			"RETRY" => Self::Retry,
			_ => return Err(format!("unknown job status `{s}`")),
		})
	}
}

/// A blob of bytes with a media type.
/// This is both the input and the output of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobData {
	pub data: Bytes,
	pub mime: MimeType,
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobError {
	/// A human-readable description of this error
	pub message: String,

	/// The step that failed, starting at 1.
	/// Zero if the job was given up on before any step ran.
	pub step: u32,

	/// The type of the operation that failed
	#[schema(value_type = String)]
	pub operation_type: SmartString<LazyCompact>,
}

/// A summary of a job's result.
/// This does not include the result's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobResultInfo {
	/// The media type of this job's output
	#[schema(value_type = String)]
	pub mime: MimeType,

	/// The length of this job's output, in bytes
	pub size: u64,
}

/// A point-in-time view of a job.
/// Fields are `None` whenever they don't apply to this job's status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
	#[schema(value_type = String)]
	pub job_id: JobId,

	pub status: JobStatus,

	/// How many times this job has been handed to a worker
	pub attempt: u32,

	/// The step that is running, starting at 1
	pub current_step: Option<u32>,

	/// The total number of steps in this job.
	/// Available once this job has started.
	pub total_steps: Option<u32>,

	/// The type of the operation that is running
	#[schema(value_type = Option<String>)]
	pub current_operation_type: Option<SmartString<LazyCompact>>,

	/// Present only if `status` is `FAILURE`
	pub error: Option<JobError>,

	/// Present only if `status` is `SUCCESS`
	pub result: Option<JobResultInfo>,

	#[schema(value_type = String)]
	pub created_at: OffsetDateTime,

	#[schema(value_type = Option<String>)]
	pub started_at: Option<OffsetDateTime>,

	#[schema(value_type = Option<String>)]
	pub finished_at: Option<OffsetDateTime>,
}

/// A job that a worker has claimed.
///
/// This is everything a worker needs to run a job.
/// Every write the worker makes must carry `attempt`.
#[derive(Debug, Clone)]
pub struct QueuedJob {
	pub job_id: JobId,

	/// The delivery this claim belongs to, starting at 1
	pub attempt: u32,

	/// The bytes to process
	pub input: JobData,

	/// The steps to run, in order
	pub operations: Vec<Operation>,

	/// If true, this job was claimed before and its worker stopped
	/// responding. The job is now in the `RETRY` state.
	pub redelivered: bool,
}
