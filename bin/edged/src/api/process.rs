use axum::{
	body::Bytes,
	extract::{Multipart, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use chroma_jobqueue::{
	base::errors::AddJobError,
	id::JobId,
	info::JobStatus,
	operation::{parse_operations, Operation, ValidationError},
	submit::{submit_job, SubmitJobError},
};
use chroma_util::MimeType;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::api::RouterState;

/// The response to a new job
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(super) struct ProcessResponse {
	/// Use this to check on this job
	#[schema(value_type = String)]
	pub job_id: JobId,

	/// Always `PENDING`
	pub status: JobStatus,

	pub message: String,
}

fn bad_request(message: String) -> Response {
	return (StatusCode::BAD_REQUEST, Json(message)).into_response();
}

fn describe_validation_error(error: &ValidationError) -> String {
	match error {
		ValidationError::MalformedJson(source) => format!("Invalid operations: {error}: {source}"),
		ValidationError::EmptyInput => "Image data is empty".into(),
		_ => format!("Invalid operations: {error}"),
	}
}

/// Start processing an image.
///
/// Takes a multipart form with an `image` file and an `operations_json` field,
/// a json array of `{"type": ..., "params": {...}}` objects that are applied in order.
/// Send `operations_json` first to have bad operations rejected before the image is uploaded.
/// Returns as soon as the job is queued.
#[utoipa::path(
	post,
	path = "/api/v1/process",
	responses(
		(status = 202, description = "Job queued", body = ProcessResponse),
		(status = 400, description = "Invalid request", body = String),
		(status = 413, description = "Image is too large", body = String),
		(status = 500, description = "Internal server error"),
	)
)]
pub(super) async fn process_image(
	State(state): State<RouterState>,
	mut multipart: Multipart,
) -> Response {
	// Parse multipart data
	let mut image: Option<(Option<String>, Bytes)> = None;
	let mut operations: Option<Vec<Operation>> = None;

	loop {
		let field = match multipart.next_field().await {
			Ok(Some(x)) => x,
			Ok(None) => break,
			Err(error) => {
				warn!(message = "Bad multipart request", ?error);
				return (error.status(), Json(error.body_text())).into_response();
			}
		};

		let name = field.name().unwrap_or("").to_owned();
		match &name[..] {
			"image" => {
				if image.is_some() {
					return bad_request("Multiple `image` fields in request".into());
				}

				let content_type = field.content_type().map(|x| x.to_owned());
				let data = match field.bytes().await {
					Ok(x) => x,
					Err(error) => {
						warn!(
							message = "Failed reading image, client probably disconnected",
							?error
						);
						return (error.status(), Json(error.body_text())).into_response();
					}
				};

				image = Some((content_type, data));
			}

			"operations_json" => {
				if operations.is_some() {
					return bad_request("Multiple `operations_json` fields in request".into());
				}

				let text = match field.text().await {
					Ok(x) => x,
					Err(error) => {
						warn!(message = "Failed reading operations", ?error);
						return (error.status(), Json(error.body_text())).into_response();
					}
				};

				// Don't read the rest of the request if this is invalid
				operations = match parse_operations(&text) {
					Ok(x) => Some(x),
					Err(error) => return bad_request(describe_validation_error(&error)),
				};
			}

			_ => {
				warn!(message = "Bad field name in process request", field = name);
				return bad_request(format!("unexpected field `{name}`"));
			}
		}
	}

	let (content_type, data) = match image {
		Some(x) => x,
		None => return bad_request("Missing `image` field".into()),
	};

	let mime = match content_type.map(MimeType::from) {
		Some(x) if x.is_image() => x,
		_ => return bad_request("Uploaded file is not an image".into()),
	};

	let operations = match operations {
		Some(x) => x,
		None => return bad_request("Missing `operations_json` field".into()),
	};

	return match submit_job(&*state.client, data, Some(mime), &operations).await {
		Ok(job_id) => (
			StatusCode::ACCEPTED,
			Json(ProcessResponse {
				job_id,
				status: JobStatus::Pending,
				message: "Image processing job submitted".into(),
			}),
		)
			.into_response(),

		Err(SubmitJobError::Validation(error)) => bad_request(describe_validation_error(&error)),

		Err(SubmitJobError::AddJob(AddJobError::DbError(error))) => {
			error!(message = "DB error while queueing job", ?error);
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}

		// Ids are fresh uuids, this should never happen
		Err(SubmitJobError::AddJob(AddJobError::AlreadyExists)) => {
			error!(message = "Generated a job id that already exists");
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	};
}
