use smartstring::{LazyCompact, SmartString};
use std::{collections::BTreeMap, sync::Arc};

use super::{RegisterTransformError, Transform};

/// A table of transforms, keyed by operation type.
///
/// This is built once at startup and shared by every worker.
pub struct TransformDispatcher {
	transforms: BTreeMap<SmartString<LazyCompact>, Arc<dyn Transform>>,
}

impl TransformDispatcher {
	/// Create a new, empty [`TransformDispatcher`]
	pub fn new() -> Self {
		return Self {
			transforms: BTreeMap::new(),
		};
	}

	/// Register a new transform.
	/// `type_name` must be new, we'll return an error if it already exists.
	pub fn register_transform(
		&mut self,
		type_name: &str,
		transform: Arc<dyn Transform>,
	) -> Result<(), RegisterTransformError> {
		if self.transforms.contains_key(type_name) {
			return Err(RegisterTransformError::AlreadyExists {
				type_name: type_name.into(),
			});
		}

		self.transforms.insert(type_name.into(), transform);
		return Ok(());
	}

	/// Get the transform that handles `type_name`
	pub fn get_transform(&self, type_name: &str) -> Option<Arc<dyn Transform>> {
		return self.transforms.get(type_name).cloned();
	}

	/// All registered operation types, sorted
	pub fn transform_types(&self) -> impl Iterator<Item = &str> {
		return self.transforms.keys().map(|x| x.as_str());
	}
}
