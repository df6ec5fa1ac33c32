//! Pipeline operations and their structural validation

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use smartstring::{LazyCompact, SmartString};
use std::collections::BTreeMap;
use thiserror::Error;

/// One step of a pipeline.
///
/// `params` are opaque here. They are only interpreted
/// by the transform that handles `operation_type`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
	#[serde(rename = "type")]
	pub operation_type: SmartString<LazyCompact>,

	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub params: BTreeMap<SmartString<LazyCompact>, serde_json::Value>,
}

impl Operation {
	/// Make a new operation with no parameters
	pub fn new(operation_type: &str) -> Self {
		Self {
			operation_type: operation_type.into(),
			params: BTreeMap::new(),
		}
	}

	/// Add a parameter to this operation
	pub fn with_param(mut self, name: &str, value: serde_json::Value) -> Self {
		self.params.insert(name.into(), value);
		self
	}
}

/// An error we encounter when a submission is malformed.
/// Steps are counted from 1.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("input is empty")]
	EmptyInput,

	#[error("operations are not valid json")]
	MalformedJson(#[source] serde_json::Error),

	#[error("operations must be a json array")]
	NotAnArray,

	#[error("operation {step} is not an object")]
	NotAnObject { step: usize },

	#[error("operation {step} has no `type`")]
	MissingType { step: usize },

	#[error("operation {step} has a `type` that is not a string")]
	BadType { step: usize },

	#[error("operation {step} has an empty `type`")]
	EmptyType { step: usize },

	#[error("operation {step} has `params` that are not an object")]
	BadParams { step: usize },
}

/// Parse a json array of operations.
///
/// This only checks structure. It does not check whether
/// each `type` exists, nor whether its `params` make sense.
pub fn parse_operations(json: &str) -> Result<Vec<Operation>, ValidationError> {
	let value: serde_json::Value =
		serde_json::from_str(json).map_err(ValidationError::MalformedJson)?;

	let items = match value {
		serde_json::Value::Array(items) => items,
		_ => return Err(ValidationError::NotAnArray),
	};

	let mut out = Vec::with_capacity(items.len());
	for (i, item) in items.into_iter().enumerate() {
		let step = i + 1;

		let mut obj = match item {
			serde_json::Value::Object(obj) => obj,
			_ => return Err(ValidationError::NotAnObject { step }),
		};

		let operation_type = match obj.remove("type") {
			Some(serde_json::Value::String(s)) => s,
			Some(_) => return Err(ValidationError::BadType { step }),
			None => return Err(ValidationError::MissingType { step }),
		};

		let params = match obj.remove("params") {
			None | Some(serde_json::Value::Null) => BTreeMap::new(),
			Some(serde_json::Value::Object(params)) => {
				params.into_iter().map(|(k, v)| (k.into(), v)).collect()
			}
			Some(_) => return Err(ValidationError::BadParams { step }),
		};

		out.push(Operation {
			operation_type: operation_type.into(),
			params,
		});
	}

	check_operations(&out)?;
	return Ok(out);
}

/// Check operations that were built without [`parse_operations`]
pub fn check_operations(operations: &[Operation]) -> Result<(), ValidationError> {
	for (i, op) in operations.iter().enumerate() {
		if op.operation_type.trim().is_empty() {
			return Err(ValidationError::EmptyType { step: i + 1 });
		}
	}

	return Ok(());
}
