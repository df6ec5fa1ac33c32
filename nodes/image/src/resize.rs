use async_trait::async_trait;
use chroma_jobqueue::info::JobData;
use chroma_piper::{
	base::{RunTransformError, Transform},
	helpers::TransformParameters,
};
use image::{imageops::FilterType, GenericImageView};

use crate::common::{decode, encode, run_blocking, MAX_DIMENSION};

/// Scales an image.
///
/// Takes `width` and `height`, at least one of which is required.
/// With `keep_aspect_ratio` (the default), a missing dimension is computed from
/// the other, and if both are given the image is scaled to fit inside them.
/// Without it, a missing dimension is left unchanged.
///
/// The output has the same format as the input.
pub struct Resize {}

/// Read an optional, positive dimension
fn pop_dimension(
	params: &mut TransformParameters,
	parameter: &str,
) -> Result<Option<u32>, RunTransformError> {
	let value = match params.pop_int_opt(parameter)? {
		None => return Ok(None),
		Some(x) => x,
	};

	return match u32::try_from(value) {
		Ok(x) if x > 0 && x <= MAX_DIMENSION => Ok(Some(x)),
		_ => Err(RunTransformError::BadParameterOther {
			parameter: parameter.into(),
			message: format!("must be between 1 and {MAX_DIMENSION}"),
		}),
	};
}

/// Scale `length` by `to / from`, never returning zero
fn scale(length: u32, to: u32, from: u32) -> u32 {
	let x = (f64::from(length) * f64::from(to) / f64::from(from)).round();
	return (x as u32).clamp(1, MAX_DIMENSION);
}

/// The output size for an image of size `(w, h)`
fn target_size(
	(w, h): (u32, u32),
	width: Option<u32>,
	height: Option<u32>,
	keep_aspect_ratio: bool,
) -> (u32, u32) {
	if !keep_aspect_ratio {
		return (width.unwrap_or(w), height.unwrap_or(h));
	}

	return match (width, height) {
		(None, None) => (w, h),
		(Some(tw), None) => (tw, scale(h, tw, w)),
		(None, Some(th)) => (scale(w, th, h), th),

		// Fit inside the box
		(Some(tw), Some(th)) => {
			if u64::from(tw) * u64::from(h) <= u64::from(th) * u64::from(w) {
				(tw, scale(h, tw, w))
			} else {
				(scale(w, th, h), th)
			}
		}
	};
}

#[async_trait]
impl Transform for Resize {
	async fn run(
		&self,
		mut params: TransformParameters,
		input: JobData,
	) -> Result<JobData, RunTransformError> {
		let width = pop_dimension(&mut params, "width")?;
		let height = pop_dimension(&mut params, "height")?;
		let keep_aspect_ratio = params.pop_bool_opt("keep_aspect_ratio")?.unwrap_or(true);
		params.err_if_not_empty()?;

		if width.is_none() && height.is_none() {
			return Err(RunTransformError::MissingParameter {
				parameter: "width".into(),
			});
		}

		return run_blocking(move || {
			let (img, format) = decode(&input)?;
			let (w, h) = target_size(img.dimensions(), width, height, keep_aspect_ratio);

			let img = if (w, h) == (img.width(), img.height()) {
				img
			} else {
				img.resize_exact(w, h, FilterType::Lanczos3)
			};

			encode(img, format)
		})
		.await;
	}
}
