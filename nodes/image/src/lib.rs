//! Image transforms

use chroma_piper::base::{RegisterTransformError, TransformDispatcher};
use std::sync::Arc;

mod common;
mod convert;
mod remove_background;
mod resize;

pub use convert::Convert;
pub use remove_background::RemoveBackground;
pub use resize::Resize;

/// Register every transform in this crate
pub fn register(dispatcher: &mut TransformDispatcher) -> Result<(), RegisterTransformError> {
	dispatcher.register_transform("remove_background", Arc::new(RemoveBackground {}))?;
	dispatcher.register_transform("resize", Arc::new(Resize {}))?;
	dispatcher.register_transform("convert", Arc::new(Convert {}))?;
	return Ok(());
}
