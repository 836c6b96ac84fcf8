use std::path::PathBuf;

use crate::shape::ShapeError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema document that does not deserialize, with the JSON path of the fault.
    #[error("invalid schema {origin}: at JSON path {path} → {message}")]
    Schema {
        origin: String,
        path: String,
        message: String,
    },

    #[error("{owner}: {source}")]
    Shape {
        owner: String,
        #[source]
        source: ShapeError,
    },

    #[error("{owner}: `{name}` is not a usable identifier")]
    InvalidIdentifier { owner: String, name: String },

    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),

    #[error("root `{0}` is not a declared struct")]
    UnknownRoot(String),

    #[error("bad input pattern `{pattern}`: {message}")]
    Glob { pattern: String, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
