use serde::Deserialize;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
	Trace,
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl Display for LogLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Trace => write!(f, "trace"),
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warn => write!(f, "warn"),
			Self::Error => write!(f, "error"),
		}
	}
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub enum LoggingPreset {
	#[default]
	Default,
	Verbose,
	Develop,
	Trace,
}

impl LoggingPreset {
	pub fn get_config(&self) -> LoggingConfig {
		match self {
			Self::Default => LoggingConfig {
				other: LogLevel::Warn,
				http: LogLevel::Warn,

				edged: LogLevel::Info,
				piper: LogLevel::Info,
				runner: LogLevel::Info,
				job: LogLevel::Info,
				jobqueue: LogLevel::Warn,
				nodes: LogLevel::Warn,
			},

			Self::Verbose => LoggingConfig {
				other: LogLevel::Warn,
				http: LogLevel::Info,

				edged: LogLevel::Debug,
				piper: LogLevel::Debug,
				runner: LogLevel::Debug,
				job: LogLevel::Debug,
				jobqueue: LogLevel::Info,
				nodes: LogLevel::Warn,
			},

			Self::Develop => LoggingConfig {
				other: LogLevel::Debug,
				http: LogLevel::Info,

				edged: LogLevel::Trace,
				piper: LogLevel::Trace,
				runner: LogLevel::Trace,
				job: LogLevel::Debug,
				jobqueue: LogLevel::Debug,
				nodes: LogLevel::Debug,
			},

			Self::Trace => LoggingConfig {
				other: LogLevel::Trace,
				http: LogLevel::Trace,

				edged: LogLevel::Trace,
				piper: LogLevel::Trace,
				runner: LogLevel::Trace,
				job: LogLevel::Trace,
				jobqueue: LogLevel::Trace,
				nodes: LogLevel::Trace,
			},
		}
	}
}

pub struct LoggingConfig {
	other: LogLevel,
	http: LogLevel,

	edged: LogLevel,
	piper: LogLevel,
	runner: LogLevel,
	job: LogLevel,
	jobqueue: LogLevel,
	nodes: LogLevel,
}

impl LoggingConfig {
	/// The directive string we hand to [`EnvFilter`]
	pub fn directives(&self) -> String {
		[
			//
			// Non-configurable sources
			//
			format!("sqlx={}", LogLevel::Warn),
			format!("hyper={}", LogLevel::Warn),
			//
			// Configurable sources
			//
			format!("tower_http={}", self.http),
			format!("edged={}", self.edged),
			format!("piper={}", self.piper),
			format!("chroma_piper::runner={}", self.runner),
			format!("chroma_piper::job={}", self.job),
			format!("chroma_jobqueue={}", self.jobqueue),
			// Transform implementations
			format!("nodes_image={}", self.nodes),
			self.other.to_string(),
		]
		.join(",")
	}
}

impl From<LoggingConfig> for EnvFilter {
	fn from(value: LoggingConfig) -> Self {
		// Every directive above is well-formed, so lossy parsing never drops anything.
		EnvFilter::builder().parse_lossy(value.directives())
	}
}
