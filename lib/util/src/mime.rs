use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt::Display, str::FromStr};
use tracing::warn;

/// A media type, conveniently parsed
#[derive(Debug, PartialEq, Eq, Clone, SerializeDisplay, DeserializeFromStr)]
pub enum MimeType {
	// We INTENTIONALLY do not implement `ToSchema` on MimeType.
	// Use #[schema(value_type = String)] on any mimetype fields.
	/// A mimetype we didn't recognize
	Other(String),

	/// An unstructured binary blob
	/// Use this whenever a mime type is unknown
	Blob,

	Png,
	Jpg,
	Gif,
	Webp,
	Avif,
}

impl FromStr for MimeType {
	// Must match `display` below, but may provide other alternatives.

	type Err = std::convert::Infallible;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"application/octet-stream" => Self::Blob,
			"image/png" => Self::Png,
			"image/jpg" => Self::Jpg,
			"image/jpeg" => Self::Jpg,
			"image/gif" => Self::Gif,
			"image/webp" => Self::Webp,
			"image/avif" => Self::Avif,
			_ => {
				warn!(message = "Encountered unknown mimetype", mime_string = s);
				Self::Other(s.into())
			}
		})
	}
}

impl Display for MimeType {
	/// Get a string representation of this mimetype.
	///
	/// The following always holds
	/// ```notrust
	/// // x: MimeType
	/// MimeType::from(x.to_string()) == x
	/// ```
	///
	/// The following might not hold:
	/// ```notrust
	/// // y: &str
	/// MimeType::from(y).to_string() == y
	/// ```
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Blob => write!(f, "application/octet-stream"),

			Self::Png => write!(f, "image/png"),
			Self::Jpg => write!(f, "image/jpeg"),
			Self::Gif => write!(f, "image/gif"),
			Self::Webp => write!(f, "image/webp"),
			Self::Avif => write!(f, "image/avif"),

			Self::Other(x) => write!(f, "{}", x),
		}
	}
}

impl From<String> for MimeType {
	fn from(value: String) -> Self {
		match Self::from_str(&value) {
			Ok(x) => x,
			Err(never) => match never {},
		}
	}
}

impl From<&str> for MimeType {
	fn from(value: &str) -> Self {
		match Self::from_str(value) {
			Ok(x) => x,
			Err(never) => match never {},
		}
	}
}

impl MimeType {
	/// Guess a media type from the first bytes of a file.
	/// Returns [`MimeType::Blob`] if we don't recognize the signature.
	pub fn sniff(data: &[u8]) -> Self {
		if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
			return Self::Png;
		}

		if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
			return Self::Jpg;
		}

		if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
			return Self::Gif;
		}

		if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
			return Self::Webp;
		}

		// ISO-BMFF: a 4-byte box size, then `ftyp` and the major brand
		if data.len() >= 12 && &data[4..8] == b"ftyp" && &data[8..12] == b"avif" {
			return Self::Avif;
		}

		return Self::Blob;
	}

	/// Is this an image type?
	pub fn is_image(&self) -> bool {
		match self {
			Self::Png | Self::Jpg | Self::Gif | Self::Webp | Self::Avif => true,
			Self::Other(x) => x.starts_with("image/"),
			Self::Blob => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_roundtrips() {
		for m in [
			MimeType::Blob,
			MimeType::Png,
			MimeType::Jpg,
			MimeType::Gif,
			MimeType::Webp,
			MimeType::Avif,
			MimeType::Other("image/x-test".into()),
		] {
			assert_eq!(MimeType::from(m.to_string()), m);
		}

		assert_eq!(MimeType::from("image/jpg"), MimeType::Jpg);
	}

	#[test]
	fn sniff_signatures() {
		assert_eq!(
			MimeType::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]),
			MimeType::Png
		);
		assert_eq!(MimeType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), MimeType::Jpg);
		assert_eq!(MimeType::sniff(b"GIF89a...."), MimeType::Gif);
		assert_eq!(MimeType::sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), MimeType::Webp);
		assert_eq!(MimeType::sniff(b"\x00\x00\x00\x1cftypavif"), MimeType::Avif);
		assert_eq!(MimeType::sniff(b"hello"), MimeType::Blob);
		assert_eq!(MimeType::sniff(&[]), MimeType::Blob);
	}

	#[test]
	fn image_types() {
		assert!(MimeType::Png.is_image());
		assert!(MimeType::Other("image/tiff".into()).is_image());
		assert!(!MimeType::Blob.is_image());
		assert!(!MimeType::Other("text/plain".into()).is_image());
	}
}
