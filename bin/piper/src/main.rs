use chroma_jobqueue::{open_jobqueue, postgres::PgJobQueueOpenError};
use chroma_piper::{base::TransformDispatcher, runner::PipelineRunner};
use chroma_util::{load_env, LoadedEnv};
use config::PiperConfig;
use std::sync::Arc;
use tracing::{error, info, trace, warn};

mod config;

#[tokio::main]
async fn main() {
	let config_res = match load_env::<PiperConfig>() {
		Ok(x) => x,

		#[expect(clippy::print_stdout)]
		Err(err) => {
			println!("Error while loading .env: {err}");
			std::process::exit(1);
		}
	};

	let config: Arc<PiperConfig> = Arc::new(config_res.get_config().clone());

	tracing_subscriber::fmt()
		.with_env_filter(config.piper_loglevel.get_config())
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

	if !config.piper_jobqueue_addr.is_shared() {
		warn!(
			message = "This runner's job queue is private to this process, it will never receive jobs",
			addr = %config.piper_jobqueue_addr
		);
	}

	trace!(message = "Initializing job queue client");
	let jobqueue_client = loop {
		match open_jobqueue(
			&config.piper_jobqueue_addr,
			config.lease(),
			config.piper_max_attempts,
			false,
		)
		.await {
			Ok(db) => break db,
			Err(PgJobQueueOpenError::Database(e)) => {
				error!(message = "SQL error while opening job queue database", err = ?e);
				std::process::exit(1);
			}
			Err(PgJobQueueOpenError::Migrate(e)) => {
				error!(message = "Migration error while opening job queue database", err = ?e);
				std::process::exit(1);
			}
			Err(PgJobQueueOpenError::NotMigrated) => {
				error!(message = "Database not migrated, waiting");
				tokio::time::sleep(std::time::Duration::from_secs(5)).await;
			}
		};
	};
	trace!(message = "Successfully initialized job queue client");

	//
	// MARK: Prep runner
	//
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

	info!(
		message = "Registered transforms",
		types = ?dispatcher.transform_types().collect::<Vec<_>>()
	);

	let runner = Arc::new(PipelineRunner::new(
		Arc::new(dispatcher),
		jobqueue_client,
		config.runner_config(),
	));

	let mut workers = runner.spawn_workers(config.piper_parallel_jobs);

	// Workers run forever, so this only returns if one of them dies.
	while let Some(res) = workers.join_next().await {
		if let Err(error) = res {
			error!(message = "Worker exited unexpectedly", ?error);
		}
	}

	error!(message = "All workers exited");
	std::process::exit(1);
}
