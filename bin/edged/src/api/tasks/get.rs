use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use chroma_jobqueue::{
	base::errors::GetJobStatusError,
	id::JobId,
	info::{JobSnapshot, JobStatus},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::RouterState;

/// A job's state, with a human-readable summary
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(super) struct TaskStatusResponse {
	#[serde(flatten)]
	pub snapshot: JobSnapshot,

	/// A short description of `status`
	pub message: String,
}

fn status_message(snapshot: &JobSnapshot) -> String {
	match snapshot.status {
		JobStatus::Pending => "Job is waiting for a worker".into(),
		JobStatus::Started => "Job has started".into(),
		JobStatus::Retry => format!("Job is being retried (attempt {})", snapshot.attempt),

		JobStatus::Progress => match (
			snapshot.current_step,
			snapshot.total_steps,
			&snapshot.current_operation_type,
		) {
			(Some(step), Some(total), Some(op)) => {
				format!("Running step {step} of {total} (`{op}`)")
			}
			_ => "Job is running".into(),
		},

		JobStatus::Success => "Processing successful, use the download endpoint".into(),

		JobStatus::Failure => match &snapshot.error {
			Some(e) => format!(
				"Job failed on step {} (`{}`): {}",
				e.step, e.operation_type, e.message
			),
			None => "Job failed".into(),
		},
	}
}

/// Get a job's status
#[utoipa::path(
	get,
	path = "/{job_id}",
	params(
		("job_id", description = "Job id"),
	),
	responses(
		(status = 200, description = "Job status", body = TaskStatusResponse),
		(status = 404, description = "Job not found"),
		(status = 500, description = "Internal server error"),
	)
)]
pub(super) async fn get_task_status(
	State(state): State<RouterState>,
	Path(job_id): Path<JobId>,
) -> Response {
	return match state.client.get_job_status(&job_id).await {
		Ok(snapshot) => {
			let message = status_message(&snapshot);
			(StatusCode::OK, Json(TaskStatusResponse { snapshot, message })).into_response()
		}

		Err(GetJobStatusError::NotFound) => {
			(StatusCode::NOT_FOUND, Json(format!("Job `{job_id}` not found"))).into_response()
		}

		Err(GetJobStatusError::DbError(error)) => {
			error!(
				message = "DB error while getting job status",
				job_id = job_id.as_str(),
				?error
			);
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	};
}
