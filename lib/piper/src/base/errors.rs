use smartstring::{LazyCompact, SmartString};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinError;

/// An error we encounter while running one pipeline step.
/// Any of these fails the job.
#[derive(Debug, Clone, Error)]
pub enum RunTransformError {
	//
	// MARK: Errors in the job's definition
	//
	/// No transform is registered for this operation type
	#[error("unknown operation type `{operation_type}`")]
	UnknownOperation {
		operation_type: SmartString<LazyCompact>,
	},

	/// We got a parameter we don't recognize
	#[error("unexpected parameter `{parameter}`")]
	UnexpectedParameter { parameter: SmartString<LazyCompact> },

	/// A parameter had an unexpected type
	#[error("bad type for parameter `{parameter}`")]
	BadParameterType { parameter: SmartString<LazyCompact> },

	/// We expected a parameter, but it wasn't there
	#[error("missing parameter `{parameter}`")]
	MissingParameter { parameter: SmartString<LazyCompact> },

	/// Generic parameter error
	#[error("bad parameter `{parameter}`: {message}")]
	BadParameterOther {
		parameter: SmartString<LazyCompact>,
		message: String,
	},

	//
	// MARK: Runtime errors
	//
	/// We could not read the input of this step
	#[error("could not decode input: {message}")]
	DecodeError { message: String },

	/// We could not produce the output of this step
	#[error("could not encode output: {message}")]
	EncodeError { message: String },

	/// This step took too long
	#[error("step did not finish within {}ms", .after.as_millis())]
	Timeout { after: Duration },

	/// A transform task panicked or was cancelled
	#[error("transform task failed: {0}")]
	TaskJoinError(#[from] Arc<JoinError>),
}

impl From<JoinError> for RunTransformError {
	fn from(value: JoinError) -> Self {
		Self::TaskJoinError(Arc::new(value))
	}
}

/// An error we encounter when trying to register a transform
#[derive(Debug, Error)]
pub enum RegisterTransformError {
	/// We tried to register a transform with a type string that is already used
	#[error("a transform named `{type_name}` already exists")]
	AlreadyExists { type_name: SmartString<LazyCompact> },
}
