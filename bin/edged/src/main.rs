use api::RouterState;
use axum::Router;
use chroma_jobqueue::{open_jobqueue, postgres::PgJobQueueOpenError};
use chroma_piper::{base::TransformDispatcher, runner::PipelineRunner};
use chroma_util::{load_env, LoadedEnv};
use config::EdgedConfig;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

mod api;
mod config;

fn make_dispatcher() -> TransformDispatcher {
	let mut dispatcher = TransformDispatcher::new();

	{
		// Image transforms
		use nodes_image::register;
		match register(&mut dispatcher) {
			Ok(()) => {}
			Err(error) => {
				error!(
					message = "Could not register transforms",
					module = "image",
					?error
				);
				std::process::exit(1);
			}
		};
	}

	return dispatcher;
}

/// Build our router, and start embedded workers if we have any.
/// Workers stop when the returned [`JoinSet`] is dropped.
async fn make_app(config: Arc<EdgedConfig>) -> (Router, JoinSet<()>) {
	// Connect to database
	let client = match open_jobqueue(
		&config.edged_jobqueue_addr,
		config.lease(),
		config.edged_max_attempts,
		true,
	)
	.await
	{
		Ok(x) => x,
		Err(PgJobQueueOpenError::Database(e)) => {
			error!(message = "SQL error while opening job queue database", err = ?e);
			std::process::exit(1);
		}
		Err(PgJobQueueOpenError::Migrate(e)) => {
			error!(message = "Migration error while opening job queue database", err = ?e);
			std::process::exit(1);
		}
		Err(PgJobQueueOpenError::NotMigrated) => {
			// We always migrate, this never happens
			error!(message = "Job queue database is not migrated");
			std::process::exit(1);
		}
	};

	let dispatcher = Arc::new(make_dispatcher());

	let workers = match config.embedded_workers() {
		0 => JoinSet::new(),
		n => Arc::new(PipelineRunner::new(
			dispatcher.clone(),
			client.clone(),
			config.runner_config(),
		))
		.spawn_workers(n),
	};

	// Create app
	let router = api::router(RouterState {
		config,
		client,
		dispatcher,
	});

	return (router, workers);
}

#[tokio::main]
async fn main() {
	let config_res = match load_env::<EdgedConfig>() {
		Ok(x) => x,

		#[expect(clippy::print_stdout)]
		Err(err) => {
			println!("Error while loading .env: {err}");
			std::process::exit(1);
		}
	};

	let config: Arc<EdgedConfig> = Arc::new(config_res.get_config().clone());

	tracing_subscriber::fmt()
		.with_env_filter(config.edged_loglevel.get_config())
		.without_time()
		.with_ansi(true)
		.init();

	// Do this now, logging wasn't available earlier
	match config_res {
		LoadedEnv::FoundFile { config, path } => {
			info!(message = "Loaded config from .env", ?path, ?config);
		}
		LoadedEnv::OnlyVars(config) => {
			info!(
				message = "No `.env` found, loaded config from environment",
				?config
			);
		}
	};

	if let Err(reason) = config.validate() {
		error!(message = "Invalid configuration", reason);
		std::process::exit(1);
	}

	let listener = match tokio::net::TcpListener::bind(config.edged_server_addr.as_str()).await {
		Ok(x) => x,
		Err(e) => {
			match e.kind() {
				std::io::ErrorKind::AddrInUse => {
					error!(
						message = "Cannot bind to address, already in use",
						server_addr = config.edged_server_addr.as_str()
					);
				}
				_ => {
					error!(message = "Error while binding to address", err = ?e);
				}
			}

			std::process::exit(1);
		}
	};

	match listener.local_addr() {
		Ok(addr) => info!("listening on http://{addr}"),
		Err(e) => error!(message = "Could not get local address", err = ?e),
	}

	let (app, _workers) = make_app(config.clone()).await;

	match axum::serve(listener, app).await {
		Ok(_) => {}
		Err(e) => {
			error!(message = "Main loop exited with error", error = ?e)
		}
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		body::Body,
		http::{header, Method, Request, Response, StatusCode},
	};
	use chroma_jobqueue::JobQueueAddr;
	use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
	use serde_json::{json, Value};
	use std::{io::Cursor, time::Duration};
	use tower::Service;

	//
	// MARK: Helpers
	//

	const BOUNDARY: &str = "chroma-test-boundary";

	fn test_config(workers: usize) -> Arc<EdgedConfig> {
		Arc::new(EdgedConfig {
			edged_loglevel: Default::default(),
			edged_request_body_limit: EdgedConfig::default_request_body_limit(),
			edged_server_addr: "".into(),
			edged_jobqueue_addr: JobQueueAddr::Memory,
			edged_embedded_workers: Some(workers),
			edged_step_timeout_ms: 5_000,
			edged_lease_ms: 60_000,
			edged_max_attempts: EdgedConfig::default_max_attempts(),
		})
	}

	fn png(width: u32, height: u32) -> Vec<u8> {
		let img = RgbaImage::from_pixel(width, height, Rgba([20, 140, 220, 255]));
		let mut out = Cursor::new(Vec::new());
		DynamicImage::ImageRgba8(img)
			.write_to(&mut out, ImageFormat::Png)
			.unwrap();
		out.into_inner()
	}

	/// Build a multipart body.
	/// `image` is `(content type, bytes)`.
	fn multipart_body(image: Option<(&str, &[u8])>, operations: Option<&str>) -> Vec<u8> {
		let mut body = Vec::new();

		if let Some((content_type, data)) = image {
			body.extend_from_slice(
				format!(
					"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"input\"\r\nContent-Type: {content_type}\r\n\r\n"
				)
				.as_bytes(),
			);
			body.extend_from_slice(data);
			body.extend_from_slice(b"\r\n");
		}

		if let Some(operations) = operations {
			body.extend_from_slice(
				format!(
					"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"operations_json\"\r\n\r\n{operations}\r\n"
				)
				.as_bytes(),
			);
		}

		body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
		body
	}

	async fn process(app: &mut Router, body: Vec<u8>) -> Response<Body> {
		app.call(
			Request::builder()
				.method(Method::POST)
				.header(
					header::CONTENT_TYPE,
					format!("multipart/form-data; boundary={BOUNDARY}"),
				)
				.uri("/api/v1/process")
				.body(Body::from(body))
				.unwrap(),
		)
		.await
		.unwrap()
	}

	async fn get(app: &mut Router, url: &str) -> Response<Body> {
		app.call(
			Request::builder()
				.method(Method::GET)
				.uri(url)
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap()
	}

	async fn response_bytes(resp: Response<Body>) -> Vec<u8> {
		axum::body::to_bytes(resp.into_body(), usize::MAX)
			.await
			.unwrap()
			.to_vec()
	}

	async fn response_json(resp: Response<Body>) -> Value {
		serde_json::from_slice(&response_bytes(resp).await).unwrap()
	}

	/// Submit a job and return its id
	async fn submit(app: &mut Router, image: &[u8], operations: Value) -> String {
		let resp = process(
			app,
			multipart_body(Some(("image/png", image)), Some(&operations.to_string())),
		)
		.await;
		assert_eq!(resp.status(), StatusCode::ACCEPTED);

		let body = response_json(resp).await;
		assert_eq!(body["status"], "PENDING");
		body["job_id"].as_str().unwrap().to_owned()
	}

	/// Poll a job until it is done, returning its last status
	async fn wait_for(app: &mut Router, job_id: &str) -> Value {
		let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
		loop {
			let resp = get(app, &format!("/api/v1/tasks/{job_id}")).await;
			assert_eq!(resp.status(), StatusCode::OK);
			let status = response_json(resp).await;

			if status["status"] == "SUCCESS" || status["status"] == "FAILURE" {
				return status;
			}

			assert!(
				tokio::time::Instant::now() < deadline,
				"job did not finish: {status}"
			);
			tokio::time::sleep(Duration::from_millis(50)).await;
		}
	}

	//
	// MARK: Tests
	//

	#[tokio::test]
	async fn process_and_download() {
		let (mut app, _workers) = make_app(test_config(2)).await;

		let job_id = submit(
			&mut app,
			&png(20, 10),
			json!([
				{"type": "resize", "params": {"width": 10}},
				{"type": "convert", "params": {"format": "jpeg"}}
			]),
		)
		.await;

		let status = wait_for(&mut app, &job_id).await;
		assert_eq!(status["status"], "SUCCESS");
		assert_eq!(status["job_id"], job_id.as_str());
		assert_eq!(status["total_steps"], 2);
		assert_eq!(status["current_step"], 2);
		assert_eq!(status["result"]["mime"], "image/jpeg");
		assert!(status["message"].is_string());

		let resp = get(&mut app, &format!("/api/v1/tasks/{job_id}/download")).await;
		assert_eq!(resp.status(), StatusCode::OK);
		assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");

		let data = response_bytes(resp).await;
		let img = image::load_from_memory_with_format(&data, ImageFormat::Jpeg).unwrap();
		assert_eq!((img.width(), img.height()), (10, 5));

		// Downloads are repeatable
		let again = get(&mut app, &format!("/api/v1/tasks/{job_id}/download")).await;
		assert_eq!(response_bytes(again).await, data);
	}

	#[tokio::test]
	async fn empty_pipeline_returns_input() {
		let (mut app, _workers) = make_app(test_config(1)).await;
		let input = png(4, 4);

		let job_id = submit(&mut app, &input, json!([])).await;
		let status = wait_for(&mut app, &job_id).await;
		assert_eq!(status["status"], "SUCCESS");
		assert_eq!(status["total_steps"], 0);

		let resp = get(&mut app, &format!("/api/v1/tasks/{job_id}/download")).await;
		assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
		assert_eq!(response_bytes(resp).await, input);
	}

	#[tokio::test]
	async fn unknown_operation_fails_job() {
		let (mut app, _workers) = make_app(test_config(1)).await;

		let job_id = submit(
			&mut app,
			&png(8, 8),
			json!([
				{"type": "resize", "params": {"width": 4}},
				{"type": "sharpen"}
			]),
		)
		.await;

		let status = wait_for(&mut app, &job_id).await;
		assert_eq!(status["status"], "FAILURE");
		assert_eq!(status["error"]["step"], 2);
		assert_eq!(status["error"]["operation_type"], "sharpen");
		assert!(status["result"].is_null());

		let resp = get(&mut app, &format!("/api/v1/tasks/{job_id}/download")).await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn unfinished_jobs_have_no_result() {
		// No workers, so this job is never run
		let (mut app, _workers) = make_app(test_config(0)).await;

		let job_id = submit(
			&mut app,
			&png(8, 8),
			json!([{"type": "remove_background"}]),
		)
		.await;

		let resp = get(&mut app, &format!("/api/v1/tasks/{job_id}")).await;
		assert_eq!(resp.status(), StatusCode::OK);
		let status = response_json(resp).await;
		assert_eq!(status["status"], "PENDING");
		assert!(status["current_step"].is_null());

		let resp = get(&mut app, &format!("/api/v1/tasks/{job_id}/download")).await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn unknown_jobs_are_not_found() {
		let (mut app, _workers) = make_app(test_config(0)).await;

		let resp = get(&mut app, "/api/v1/tasks/not-a-job").await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);

		let resp = get(&mut app, "/api/v1/tasks/not-a-job/download").await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn bad_submissions_are_rejected() {
		let (mut app, _workers) = make_app(test_config(0)).await;
		let image = png(4, 4);
		let ops = r#"[{"type": "resize", "params": {"width": 2}}]"#;

		let bad = [
			// Not an image
			multipart_body(Some(("text/plain", image.as_slice())), Some(ops)),
			// Empty image
			multipart_body(Some(("image/png", &[][..])), Some(ops)),
			// Missing fields
			multipart_body(None, Some(ops)),
			multipart_body(Some(("image/png", image.as_slice())), None),
			// Malformed operations
			multipart_body(Some(("image/png", image.as_slice())), Some("[{")),
			multipart_body(Some(("image/png", image.as_slice())), Some(r#"{"type": "resize"}"#)),
			multipart_body(Some(("image/png", image.as_slice())), Some(r#"[{"params": {}}]"#)),
			multipart_body(Some(("image/png", image.as_slice())), Some(r#"[{"type": ""}]"#)),
		];

		for body in bad {
			let resp = process(&mut app, body).await;
			assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
			assert!(response_json(resp).await.is_string());
		}
	}

	#[tokio::test]
	async fn bad_operations_are_rejected_before_the_image() {
		let (mut app, _workers) = make_app(test_config(0)).await;

		// The image part never ends, we must answer without reading it
		let mut body = format!(
			"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"operations_json\"\r\n\r\n[{{\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"input\"\r\nContent-Type: image/png\r\n\r\n"
		)
		.into_bytes();
		body.extend_from_slice(&png(4, 4));

		let resp = process(&mut app, body).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

		let message = response_json(resp).await;
		assert!(message.as_str().unwrap().starts_with("Invalid operations"));
	}

	#[tokio::test]
	async fn server_status() {
		let (mut app, _workers) = make_app(test_config(0)).await;

		let resp = get(&mut app, "/status").await;
		assert_eq!(resp.status(), StatusCode::OK);

		let status = response_json(resp).await;
		assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
		assert_eq!(
			status["request_body_limit"],
			EdgedConfig::default_request_body_limit()
		);
		assert_eq!(
			status["operation_types"],
			json!(["convert", "remove_background", "resize"])
		);
	}
}
