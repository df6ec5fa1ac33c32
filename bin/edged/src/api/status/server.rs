use axum::{
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use utoipa::ToSchema;

use crate::RouterState;

/// The server's status
#[derive(Deserialize, Serialize, ToSchema, Debug)]
pub(super) struct ServerStatus {
	/// This server's version
	#[schema(
		example = json!(env!("CARGO_PKG_VERSION")),
		value_type = String,
	)]
	pub version: SmartString<LazyCompact>,

	/// The maximum request size this server supports, in bytes
	#[schema(example = 10_000_000)]
	pub request_body_limit: usize,

	/// The operation types our workers can run
	#[schema(
		example = json!(["convert", "remove_background", "resize"]),
		value_type = Vec<String>,
	)]
	pub operation_types: Vec<SmartString<LazyCompact>>,
}

/// Get server status
#[utoipa::path(
	get,
	path = "",
	responses(
		(status = 200, description = "Server status", body = ServerStatus),
	)
)]
pub(super) async fn get_server_status(State(state): State<RouterState>) -> Response {
	return (
		StatusCode::OK,
		Json(ServerStatus {
			version: env!("CARGO_PKG_VERSION").into(),
			request_body_limit: state.config.edged_request_body_limit,
			operation_types: state.dispatcher.transform_types().map(|x| x.into()).collect(),
		}),
	)
		.into_response();
}
