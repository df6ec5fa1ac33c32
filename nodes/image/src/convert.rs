use async_trait::async_trait;
use chroma_jobqueue::info::JobData;
use chroma_piper::{
	base::{RunTransformError, Transform},
	helpers::TransformParameters,
};
use image::ImageFormat;

use crate::common::{decode, encode, run_blocking};

/// Re-encodes an image as `format`, one of `png`, `jpeg`, or `webp`.
pub struct Convert {}

fn parse_format(format: &str) -> Option<ImageFormat> {
	return match format.to_ascii_lowercase().as_str() {
		"png" => Some(ImageFormat::Png),
		"jpeg" | "jpg" => Some(ImageFormat::Jpeg),
		"webp" => Some(ImageFormat::WebP),
		_ => None,
	};
}

#[async_trait]
impl Transform for Convert {
	async fn run(
		&self,
		mut params: TransformParameters,
		input: JobData,
	) -> Result<JobData, RunTransformError> {
		let format = params.pop_str("format")?;
		params.err_if_not_empty()?;

		let format = parse_format(&format).ok_or_else(|| RunTransformError::BadParameterOther {
			parameter: "format".into(),
			message: format!("unsupported format `{format}`, expected png, jpeg, or webp"),
		})?;

		return run_blocking(move || {
			let (img, _) = decode(&input)?;
			encode(img, format)
		})
		.await;
	}
}
