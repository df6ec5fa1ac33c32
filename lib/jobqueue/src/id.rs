
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::fmt::Display;

// We don't derive ToSchema here, since utoipa doesn't
// take serde(transparent) into account.

/// A job's globally unique id.
/// New ids are random v4 uuids and are never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId {
	id: SmartString<LazyCompact>,
}

impl JobId {
	/// Generate a fresh id
	pub fn new() -> Self {
		Self {
			id: uuid::Uuid::new_v4().hyphenated().to_string().into(),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.id
	}
}

impl Display for JobId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.id)
	}
}

impl From<&str> for JobId {
	fn from(value: &str) -> Self {
		Self { id: value.into() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique_uuids() {
		let a = JobId::new();
		let b = JobId::new();
		assert_ne!(a, b);
		assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
		assert_eq!(JobId::from(a.as_str()), a);
	}
}
