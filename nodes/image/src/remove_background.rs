use async_trait::async_trait;
use chroma_jobqueue::info::JobData;
use chroma_piper::{
	base::{RunTransformError, Transform},
	helpers::TransformParameters,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::VecDeque;

use crate::common::{decode, encode, run_blocking};

const DEFAULT_TOLERANCE: u8 = 32;

/// Makes the background of an image transparent.
///
/// The background is every pixel connected to the image's border
/// whose color is within `tolerance` of the border's color.
/// Always outputs a png.
pub struct RemoveBackground {}

#[async_trait]
impl Transform for RemoveBackground {
	async fn run(
		&self,
		mut params: TransformParameters,
		input: JobData,
	) -> Result<JobData, RunTransformError> {
		let tolerance = match params.pop_int_opt("tolerance")? {
			None => DEFAULT_TOLERANCE,
			Some(x) => u8::try_from(x).map_err(|e| RunTransformError::BadParameterOther {
				parameter: "tolerance".into(),
				message: format!("must be between 0 and 255 ({e})"),
			})?,
		};
		params.err_if_not_empty()?;

		return run_blocking(move || {
			let (img, _) = decode(&input)?;
			let mut img = img.to_rgba8();
			clear_background(&mut img, tolerance);
			encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
		})
		.await;
	}
}

/// The largest difference between two colors' channels, ignoring alpha
fn distance(a: &Rgba<u8>, b: &Rgba<u8>) -> u8 {
	return (0..3).map(|i| a.0[i].abs_diff(b.0[i])).max().unwrap_or(0);
}

/// The average of the four corners of `img`
fn border_color(img: &RgbaImage) -> Rgba<u8> {
	let (w, h) = img.dimensions();
	let corners = [
		img.get_pixel(0, 0),
		img.get_pixel(w - 1, 0),
		img.get_pixel(0, h - 1),
		img.get_pixel(w - 1, h - 1),
	];

	let mut sum = [0u32; 3];
	for c in corners {
		for (i, s) in sum.iter_mut().enumerate() {
			*s += u32::from(c.0[i]);
		}
	}

	// Rounding average of four values
	let avg = |s: u32| u8::try_from((s + 2) >> 2).unwrap_or(u8::MAX);
	return Rgba([avg(sum[0]), avg(sum[1]), avg(sum[2]), 255]);
}

/// Flood-fill the background from the border, clearing the alpha of every pixel we reach
fn clear_background(img: &mut RgbaImage, tolerance: u8) {
	let (w, h) = img.dimensions();
	if w == 0 || h == 0 {
		return;
	}

	let background = border_color(img);
	let is_background = |p: &Rgba<u8>| p.0[3] == 0 || distance(p, &background) <= tolerance;

	let mut visited = vec![false; (w as usize) * (h as usize)];
	let index = |x: u32, y: u32| (y as usize) * (w as usize) + (x as usize);
	let mut queue = VecDeque::new();

	for x in 0..w {
		queue.push_back((x, 0));
		queue.push_back((x, h - 1));
	}
	for y in 0..h {
		queue.push_back((0, y));
		queue.push_back((w - 1, y));
	}

	while let Some((x, y)) = queue.pop_front() {
		let i = index(x, y);
		if visited[i] {
			continue;
		}
		visited[i] = true;

		if !is_background(img.get_pixel(x, y)) {
			continue;
		}

		img.get_pixel_mut(x, y).0[3] = 0;

		if x > 0 {
			queue.push_back((x - 1, y));
		}
		if x + 1 < w {
			queue.push_back((x + 1, y));
		}
		if y > 0 {
			queue.push_back((x, y - 1));
		}
		if y + 1 < h {
			queue.push_back((x, y + 1));
		}
	}
}
