use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SeqvaultError {
    #[error("invalid accession number: {0:?}")]
    InvalidAccession(String),

    #[error("no accession numbers provided")]
    #[diagnostic(help("pass accessions as arguments or with --input <FILE>"))]
    EmptyRequest,

    #[error("failed to read accession list at {0}")]
    InputRead(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unsupported config schema_version {0}")]
    #[diagnostic(help("this build reads schema_version 1"))]
    UnsupportedConfigVersion(u32),

    #[error("NCBI contact email is not configured")]
    #[diagnostic(help("set NCBI_EMAIL or ncbi.email in seqvault.json"))]
    MissingContactEmail,

    #[error("unable to resolve default store location")]
    StoreLocation,

    #[error("NCBI client setup failed: {0}")]
    NcbiClient(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("export failed: {0}")]
    Export(String),
}

/// A raw record that could not be turned into a [`crate::domain::SequenceRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty record")]
    Empty,

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("record {0} has no sequence lines")]
    MissingSequence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    NotFound,
    Transient,
    AuthFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("authentication failure: {0}")]
    AuthFailure(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::NotFound(_) => FetchErrorKind::NotFound,
            FetchError::Transient(_) => FetchErrorKind::Transient,
            FetchError::AuthFailure(_) => FetchErrorKind::AuthFailure,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("store table at {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error("{0}")]
    Backend(String),
}
