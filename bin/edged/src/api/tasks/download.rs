use axum::{
	extract::{Path, State},
	http::{header, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use chroma_jobqueue::{base::errors::GetJobResultError, id::JobId};
use tracing::error;

use crate::RouterState;

/// Download a finished job's output.
///
/// The response's content type is the media type the last step produced.
#[utoipa::path(
	get,
	path = "/{job_id}/download",
	params(
		("job_id", description = "Job id"),
	),
	responses(
		(status = 200, description = "The processed image"),
		(status = 404, description = "Job not found or not finished", body = String),
		(status = 500, description = "Internal server error"),
	)
)]
pub(super) async fn download_task_result(
	State(state): State<RouterState>,
	Path(job_id): Path<JobId>,
) -> Response {
	return match state.client.get_job_result(&job_id).await {
		Ok(result) => (
			StatusCode::OK,
			[(header::CONTENT_TYPE, result.mime.to_string())],
			result.data,
		)
			.into_response(),

		Err(GetJobResultError::NotFound) => {
			(StatusCode::NOT_FOUND, Json(format!("Job `{job_id}` not found"))).into_response()
		}

		Err(GetJobResultError::NotReady(status)) => (
			StatusCode::NOT_FOUND,
			Json(format!("Job `{job_id}` has no result, its status is {status}")),
		)
			.into_response(),

		Err(GetJobResultError::DbError(error)) => {
			error!(
				message = "DB error while getting job result",
				job_id = job_id.as_str(),
				?error
			);
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	};
}
