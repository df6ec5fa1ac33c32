use bytes::Bytes;
use chroma_jobqueue::info::JobData;
use chroma_piper::base::RunTransformError;
use chroma_util::MimeType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::trace;

/// Images larger than this (in either dimension) are rejected
pub const MAX_DIMENSION: u32 = 16_384;

/// The media type of an image format we can write
pub fn mime_for(format: ImageFormat) -> MimeType {
	match format {
		ImageFormat::Png => MimeType::Png,
		ImageFormat::Jpeg => MimeType::Jpg,
		ImageFormat::WebP => MimeType::Webp,
		ImageFormat::Gif => MimeType::Gif,
		ImageFormat::Avif => MimeType::Avif,
		_ => MimeType::Blob,
	}
}

/// Decode `input`, detecting its format from its content
pub fn decode(input: &JobData) -> Result<(DynamicImage, ImageFormat), RunTransformError> {
	let format =
		image::guess_format(&input.data).map_err(|e| RunTransformError::DecodeError {
			message: e.to_string(),
		})?;

	let img = image::load_from_memory_with_format(&input.data, format).map_err(|e| {
		RunTransformError::DecodeError {
			message: e.to_string(),
		}
	})?;

	trace!(
		message = "Decoded image",
		width = img.width(),
		height = img.height(),
		format = format.extensions_str().first().copied().unwrap_or("?")
	);

	return Ok((img, format));
}

/// Encode `img` as `format`.
/// Pixel layouts the encoder can't take are converted first.
pub fn encode(img: DynamicImage, format: ImageFormat) -> Result<JobData, RunTransformError> {
	let img = match format {
		// No alpha channel in jpeg
		ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
		ImageFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8()),
		_ => img,
	};

	let mut out = Cursor::new(Vec::new());
	img.write_to(&mut out, format)
		.map_err(|e| RunTransformError::EncodeError {
			message: e.to_string(),
		})?;

	return Ok(JobData {
		data: Bytes::from(out.into_inner()),
		mime: mime_for(format),
	});
}

/// Run image work on the blocking thread pool
pub async fn run_blocking<F>(f: F) -> Result<JobData, RunTransformError>
where
	F: FnOnce() -> Result<JobData, RunTransformError> + Send + 'static,
{
	return tokio::task::spawn_blocking(f).await?;
}

#[cfg(test)]
pub(crate) mod testutil {
	use super::*;
	use chroma_piper::helpers::TransformParameters;
	use image::{Rgba, RgbaImage};

	/// A `width` by `height` white image with a red box
	/// that leaves a two-pixel white border
	pub fn test_image(width: u32, height: u32) -> DynamicImage {
		let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
		for y in 2..height.saturating_sub(2) {
			for x in 2..width.saturating_sub(2) {
				img.put_pixel(x, y, Rgba([200, 0, 0, 255]));
			}
		}
		DynamicImage::ImageRgba8(img)
	}

	pub fn test_input(width: u32, height: u32, format: ImageFormat) -> JobData {
		encode(test_image(width, height), format).unwrap()
	}

	pub fn params(value: serde_json::Value) -> TransformParameters {
		let map: std::collections::BTreeMap<smartstring::SmartString<smartstring::LazyCompact>, _> =
			serde_json::from_value(value).unwrap();
		TransformParameters::from(map)
	}
}
