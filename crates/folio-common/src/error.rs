//! Error types shared across the folio crates.

use std::path::PathBuf;

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Top-level error type for folio operations
#[derive(Debug, Error, Diagnostic)]
pub enum FolioError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Slug(#[from] SlugError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Serde(#[from] SerDeError),
}

/// Post storage errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(store::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    #[diagnostic(code(store::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("post `{id}` could not be decoded")]
    #[diagnostic(
        code(store::corrupt),
        help("the file is not a valid post record; fix or remove it")
    )]
    Corrupt {
        id: SmolStr,
        #[source]
        source: RecordError,
    },

    #[error("post `{id}` does not exist")]
    #[diagnostic(code(store::missing))]
    Missing { id: SmolStr },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rejected(#[from] ValidationError),
}

/// A post that fails validation is rejected before any write happens.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("post document does not start with a level-1 heading")]
    #[diagnostic(
        code(validation::title),
        help("every post must begin with its title as a level-1 heading")
    )]
    MissingTitle,

    #[error("post id must not be empty")]
    #[diagnostic(code(validation::id))]
    EmptyId,

    #[error("post id `{id}` contains characters that are not allowed in a file name")]
    #[diagnostic(code(validation::id))]
    InvalidId { id: SmolStr },

    #[error("post slug must not be empty")]
    #[diagnostic(code(validation::slug))]
    EmptySlug,

    #[error("unsupported post record version {version}")]
    #[diagnostic(code(validation::version))]
    UnsupportedVersion { version: u32 },

    #[error("invalid timestamp `{value}` in legacy post record")]
    #[diagnostic(code(validation::timestamp))]
    InvalidTimestamp { value: String },
}

/// Why a persisted post record could not be read
#[derive(Debug, Error, Diagnostic)]
pub enum RecordError {
    #[error(transparent)]
    #[diagnostic(code(record::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] ValidationError),
}

/// Slug change failures reported back to the author
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug `{slug}` may only contain letters, digits, `-` and `_`")]
    #[diagnostic(code(slug::format))]
    InvalidFormat { slug: SmolStr },

    #[error("slug `{slug}` is already used by post `{owner}`")]
    #[diagnostic(code(slug::taken))]
    Taken { slug: SmolStr, owner: SmolStr },
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("missing required environment variable: {var}")]
    #[diagnostic(code(config::missing_env))]
    MissingEnv { var: &'static str },

    #[error("invalid URL {url}: {message}")]
    #[diagnostic(code(config::url_parse))]
    UrlParse { url: String, message: String },

    #[error("invalid value `{value}` for {var}: {message}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue {
        var: &'static str,
        value: String,
        message: String,
    },
}

/// Serialization/deserialization errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum SerDeError {
    #[error(transparent)]
    #[diagnostic(code(serde::json))]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = FolioError> = std::result::Result<T, E>;
