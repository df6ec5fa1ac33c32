//! Job submission: validate a request, then create and queue its job

use bytes::Bytes;
use chroma_util::MimeType;
use thiserror::Error;
use tracing::info;

use crate::{
	base::{client::JobQueueClient, errors::AddJobError},
	id::JobId,
	info::JobData,
	operation::{check_operations, Operation, ValidationError},
};

/// An error we can encounter when submitting a job
#[derive(Debug, Error)]
pub enum SubmitJobError {
	/// This request is malformed. No job was created.
	#[error("invalid submission")]
	Validation(#[from] ValidationError),

	/// We could not store this job
	#[error("could not queue job")]
	AddJob(#[from] AddJobError),
}

/// Create a job that runs `operations` on `input`, and queue it.
///
/// This returns as soon as the job is queued.
/// If `mime` is `None` or [`MimeType::Blob`], the input's type is guessed from its content.
pub async fn submit_job(
	client: &dyn JobQueueClient,
	input: Bytes,
	mime: Option<MimeType>,
	operations: &[Operation],
) -> Result<JobId, SubmitJobError> {
	if input.is_empty() {
		return Err(ValidationError::EmptyInput.into());
	}

	check_operations(operations)?;

	let mime = match mime {
		None | Some(MimeType::Blob) => MimeType::sniff(&input),
		Some(x) => x,
	};

	let job_id = client
		.add_job(JobId::new(), &JobData { data: input, mime }, operations)
		.await?;

	info!(
		message = "Queued job",
		job_id = job_id.as_str(),
		steps = operations.len()
	);

	return Ok(job_id);
}
