use serde::de::DeserializeOwned;
use smartstring::{LazyCompact, SmartString};
use std::{env::VarError, error::Error, fmt::Display, io::ErrorKind, path::PathBuf};

#[derive(Debug)]
pub enum EnvLoadError {
	IOError(std::io::Error),
	VarError(VarError),
	LineParse { on_line: String, at_char: usize },
	Other(dotenvy::Error),
	MissingValue(SmartString<LazyCompact>),
	OtherParseError(String),
}

impl Display for EnvLoadError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::IOError(_) => write!(f, "i/o error while reading `.env`"),
			Self::VarError(_) => write!(f, "invalid environment variable"),
			Self::LineParse { on_line, at_char } => {
				write!(f, "line parse error: `{on_line}` at char {at_char}")
			}
			Self::Other(_) => write!(f, "other dotenvy error"),
			Self::MissingValue(v) => write!(f, "missing value {v}"),
			Self::OtherParseError(msg) => write!(f, "parse error: {msg}"),
		}
	}
}

impl Error for EnvLoadError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::IOError(e) => Some(e),
			Self::VarError(e) => Some(e),
			Self::Other(e) => Some(e),
			_ => None,
		}
	}
}

impl From<envy::Error> for EnvLoadError {
	fn from(value: envy::Error) -> Self {
		match value {
			envy::Error::MissingValue(value) => Self::MissingValue(value.into()),
			envy::Error::Custom(message) => Self::OtherParseError(message),
		}
	}
}

#[derive(Debug)]
pub enum LoadedEnv<T> {
	/// We loaded config from `.env` and env vars
	FoundFile { config: T, path: PathBuf },

	/// We could not find `.env` and only loaded env vars
	OnlyVars(T),
}

impl<T> LoadedEnv<T> {
	pub fn get_config(&self) -> &T {
		match self {
			Self::FoundFile { config, .. } => config,
			Self::OnlyVars(config) => config,
		}
	}
}

/// Load the configuration type `T` from the current environment,
/// including the `.env` if it exists.
pub fn load_env<T: DeserializeOwned>() -> Result<LoadedEnv<T>, EnvLoadError> {
	let env_path = match dotenvy::dotenv() {
		Ok(path) => Some(path),

		Err(dotenvy::Error::Io(err)) => match err.kind() {
			ErrorKind::NotFound => None,
			_ => return Err(EnvLoadError::IOError(err)),
		},

		Err(dotenvy::Error::EnvVar(err)) => {
			return Err(EnvLoadError::VarError(err));
		}

		Err(dotenvy::Error::LineParse(on_line, at_char)) => {
			return Err(EnvLoadError::LineParse { on_line, at_char });
		}

		Err(err) => {
			return Err(EnvLoadError::Other(err));
		}
	};

	let config = envy::from_env::<T>()?;
	return Ok(match env_path {
		Some(path) => LoadedEnv::FoundFile { path, config },
		None => LoadedEnv::OnlyVars(config),
	});
}

/// Load the configuration type `T` from the given key-value pairs.
/// Keys are matched the same way [`load_env`] matches environment variables.
pub fn load_env_from_iter<T, I>(vars: I) -> Result<T, EnvLoadError>
where
	T: DeserializeOwned,
	I: IntoIterator<Item = (String, String)>,
{
	return Ok(envy::from_iter::<_, T>(vars)?);
}
