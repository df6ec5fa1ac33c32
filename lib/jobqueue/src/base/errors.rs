//! Errors we can encounter when operating on a job queue

use std::{error::Error, fmt::Display};

use crate::info::JobStatus;

/// An error we can encounter when creating a job
#[derive(Debug)]
pub enum AddJobError {
	/// Database error
	DbError(sqlx::Error),

	/// A job with this id already exists
	AlreadyExists,
}

impl Display for AddJobError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DbError(_) => write!(f, "database backend error"),
			Self::AlreadyExists => write!(f, "a job with this id already exists"),
		}
	}
}

impl Error for AddJobError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DbError(x) => Some(x),
			_ => None,
		}
	}
}

impl From<sqlx::Error> for AddJobError {
	fn from(value: sqlx::Error) -> Self {
		Self::DbError(value)
	}
}

/// An error we can encounter when getting a job's status
#[derive(Debug)]
pub enum GetJobStatusError {
	/// Database error
	DbError(sqlx::Error),

	/// A job with this id doesn't exist
	NotFound,
}

impl Display for GetJobStatusError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DbError(_) => write!(f, "database backend error"),
			Self::NotFound => write!(f, "a job with this id doesn't exist"),
		}
	}
}

impl Error for GetJobStatusError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DbError(x) => Some(x),
			_ => None,
		}
	}
}

impl From<sqlx::Error> for GetJobStatusError {
	fn from(value: sqlx::Error) -> Self {
		Self::DbError(value)
	}
}

/// An error we can encounter when getting a job's result
#[derive(Debug)]
pub enum GetJobResultError {
	/// Database error
	DbError(sqlx::Error),

	/// A job with this id doesn't exist
	NotFound,

	/// This job has not succeeded (yet).
	/// Contains the job's current status.
	NotReady(JobStatus),
}

impl Display for GetJobResultError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DbError(_) => write!(f, "database backend error"),
			Self::NotFound => write!(f, "a job with this id doesn't exist"),
			Self::NotReady(status) => write!(f, "job has no result, its status is {status}"),
		}
	}
}

impl Error for GetJobResultError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DbError(x) => Some(x),
			_ => None,
		}
	}
}

impl From<sqlx::Error> for GetJobResultError {
	fn from(value: sqlx::Error) -> Self {
		Self::DbError(value)
	}
}

/// An error we can encounter when claiming a queued job
#[derive(Debug)]
pub enum ClaimJobError {
	/// Database error
	DbError(sqlx::Error),
}

impl Display for ClaimJobError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DbError(_) => write!(f, "database backend error"),
		}
	}
}

impl Error for ClaimJobError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DbError(x) => Some(x),
		}
	}
}

impl From<sqlx::Error> for ClaimJobError {
	fn from(value: sqlx::Error) -> Self {
		Self::DbError(value)
	}
}

/// An error we can encounter when a worker updates a job
/// (`start_job`, `progress_job`, `success_job`, `fail_job`)
#[derive(Debug)]
pub enum UpdateJobError {
	/// Database error
	DbError(sqlx::Error),

	/// A job with this id doesn't exist
	NotFound,

	/// This job was claimed again by another worker.
	/// The caller must stop working on it.
	NotOwner,

	/// This job is not in a state that allows this update.
	/// Contains the job's current status.
	NotRunning(JobStatus),

	/// A progress update did not advance this job
	StaleProgress,
}

impl Display for UpdateJobError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DbError(_) => write!(f, "database backend error"),
			Self::NotFound => write!(f, "a job with this id doesn't exist"),
			Self::NotOwner => write!(f, "job was claimed by another worker"),
			Self::NotRunning(status) => write!(f, "job is not running, its status is {status}"),
			Self::StaleProgress => write!(f, "progress update does not advance job"),
		}
	}
}

impl Error for UpdateJobError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DbError(x) => Some(x),
			_ => None,
		}
	}
}

impl From<sqlx::Error> for UpdateJobError {
	fn from(value: sqlx::Error) -> Self {
		Self::DbError(value)
	}
}
