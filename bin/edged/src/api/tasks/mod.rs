use crate::RouterState;
use axum::{routing::get, Router};
use utoipa::OpenApi;

mod download;
mod get;

use download::*;
use get::*;

#[derive(OpenApi)]
#[openapi(
	tags(),
	paths(get_task_status, download_task_result),
	components(schemas(TaskStatusResponse))
)]
pub(super) struct TasksApi;

pub(super) fn router() -> Router<RouterState> {
	Router::new()
		.route("/:job_id", get(get_task_status))
		.route("/:job_id/download", get(download_task_result))
}
