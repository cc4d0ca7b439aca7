use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating a mutant.
///
/// Soft rejections from the semantic filter and early stops of the chain
/// walk are not errors and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    /// The grammar could not be loaded or the source could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// The file extension does not name a supported dialect
    #[error("unsupported file type: {0}")]
    UnsupportedFile(Utf8PathBuf),

    /// Matching was scoped to a function the file does not define
    #[error("function '{name}' not found. Available: {}", available.join(", "))]
    UnknownFunction {
        name: String,
        available: Vec<String>,
    },

    /// A sub-node the matcher must bind is absent from the tree
    #[error("missing {binding} binding for expression at line {line}")]
    MissingBinding {
        binding: &'static str,
        line: usize,
    },

    /// An applicator was handed an operator it has no rewrite for
    #[error("operator '{operator}' at line {line} cannot be mutated")]
    UnsupportedOperator { operator: &'static str, line: usize },

    /// Writing the mutation report failed
    #[error("failed to write report {path}: {source}")]
    Report {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or state serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
