use axum::{extract::DefaultBodyLimit, routing::post, Router};
use chroma_jobqueue::{
	base::client::JobQueueClient,
	info::{JobError, JobResultInfo, JobSnapshot, JobStatus},
};
use chroma_piper::base::TransformDispatcher;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::EdgedConfig;

mod process;
mod status;
mod tasks;

use process::*;

#[derive(Clone)]
pub struct RouterState {
	pub config: Arc<EdgedConfig>,
	pub client: Arc<dyn JobQueueClient>,

	/// The transforms our workers know.
	/// Only used to report what we support, submissions aren't checked against it.
	pub dispatcher: Arc<TransformDispatcher>,
}

#[derive(OpenApi)]
#[openapi(
	nest(
		(path = "/status", api = status::StatusApi),
		(path = "/api/v1/tasks", api = tasks::TasksApi),
	),
	tags(
		(name = "Chroma", description = "Image pipeline api")
	),
	paths(process_image),
	// All schema structs defined outside `crate::api` go here
	components(schemas(JobStatus, JobError, JobResultInfo, JobSnapshot, ProcessResponse))
)]
struct ApiDoc;

pub(super) fn router(state: RouterState) -> Router {
	Router::new()
		.merge(SwaggerUi::new("/docs").url("/docs/openapi.json", ApiDoc::openapi()))
		//
		.nest("/status", status::router())
		.route("/api/v1/process", post(process_image))
		.nest("/api/v1/tasks", tasks::router())
		//
		.layer(TraceLayer::new_for_http())
		.layer(DefaultBodyLimit::max(state.config.edged_request_body_limit))
		.with_state(state)
}
