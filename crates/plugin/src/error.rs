//! Error types for configuration and command parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or saving the plugin configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading or writing the configuration file.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// Path of the file that failed.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid JSON, or a field has the wrong type.
	#[error("invalid configuration JSON: {0}")]
	Json(#[from] serde_json::Error),

	/// The top-level JSON value is not an object.
	#[error("configuration must be a JSON object")]
	NotAnObject,
}

/// A `!!plb` command line that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("missing argument <{0}>")]
	MissingArgument(&'static str),

	#[error("<{name}> must be an integer, got {value:?}")]
	InvalidInteger { name: &'static str, value: String },

	#[error("<{name}> must be a number, got {value:?}")]
	InvalidNumber { name: &'static str, value: String },

	#[error("unterminated quote")]
	UnterminatedQuote,

	#[error("unexpected argument {0:?}")]
	UnexpectedArgument(String),

	#[error("empty follow-up action after `&&`")]
	EmptyFollowUp,
}
