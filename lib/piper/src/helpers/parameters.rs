use smartstring::{LazyCompact, SmartString};
use std::collections::BTreeMap;

use crate::base::RunTransformError;

/// The parameters of one pipeline step.
///
/// Transforms `pop_*` every parameter they understand,
/// then call [`TransformParameters::err_if_not_empty`].
/// `null` is treated the same as a missing parameter.
pub struct TransformParameters {
	params: BTreeMap<SmartString<LazyCompact>, serde_json::Value>,
}

impl From<BTreeMap<SmartString<LazyCompact>, serde_json::Value>> for TransformParameters {
	fn from(value: BTreeMap<SmartString<LazyCompact>, serde_json::Value>) -> Self {
		Self::new(value)
	}
}

impl TransformParameters {
	pub fn new(params: BTreeMap<SmartString<LazyCompact>, serde_json::Value>) -> Self {
		Self { params }
	}

	/// Return `Err(RunTransformError::UnexpectedParameter)` if we still have unhandled parameters.
	/// Otherwise, return `Ok(())`.
	pub fn err_if_not_empty(self) -> Result<(), RunTransformError> {
		if let Some((param, _)) = self.params.first_key_value() {
			return Err(RunTransformError::UnexpectedParameter {
				parameter: param.clone(),
			});
		}

		return Ok(());
	}
}

impl TransformParameters {
	/// Remove a parameter, returning `None` if it is missing or `null`
	fn pop_val_opt(&mut self, parameter: &str) -> Option<serde_json::Value> {
		match self.params.remove(parameter) {
			None | Some(serde_json::Value::Null) => return None,
			Some(x) => return Some(x),
		}
	}

	pub fn pop_int_opt(&mut self, parameter: &str) -> Result<Option<i64>, RunTransformError> {
		match self.pop_val_opt(parameter) {
			None => return Ok(None),

			Some(serde_json::Value::Number(x)) => match x.as_i64() {
				Some(x) => return Ok(Some(x)),
				None => {
					return Err(RunTransformError::BadParameterType {
						parameter: parameter.into(),
					})
				}
			},

			Some(_) => {
				return Err(RunTransformError::BadParameterType {
					parameter: parameter.into(),
				})
			}
		}
	}

	pub fn pop_int(&mut self, parameter: &str) -> Result<i64, RunTransformError> {
		match self.pop_int_opt(parameter)? {
			None => {
				return Err(RunTransformError::MissingParameter {
					parameter: parameter.into(),
				});
			}

			Some(x) => return Ok(x),
		}
	}

	pub fn pop_bool_opt(&mut self, parameter: &str) -> Result<Option<bool>, RunTransformError> {
		match self.pop_val_opt(parameter) {
			None => return Ok(None),
			Some(serde_json::Value::Bool(x)) => return Ok(Some(x)),
			Some(_) => {
				return Err(RunTransformError::BadParameterType {
					parameter: parameter.into(),
				})
			}
		}
	}

	pub fn pop_str_opt(
		&mut self,
		parameter: &str,
	) -> Result<Option<SmartString<LazyCompact>>, RunTransformError> {
		match self.pop_val_opt(parameter) {
			None => return Ok(None),
			Some(serde_json::Value::String(x)) => return Ok(Some(x.into())),
			Some(_) => {
				return Err(RunTransformError::BadParameterType {
					parameter: parameter.into(),
				})
			}
		}
	}

	pub fn pop_str(&mut self, parameter: &str) -> Result<SmartString<LazyCompact>, RunTransformError> {
		match self.pop_str_opt(parameter)? {
			None => {
				return Err(RunTransformError::MissingParameter {
					parameter: parameter.into(),
				});
			}

			Some(x) => return Ok(x),
		}
	}
}
