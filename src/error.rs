use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the failures that abort a reconciliation run or a
/// workbook operation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a pipeline needs an object-class table the input lacks.
    #[error("required table '{0}' is missing")]
    MissingTable(String),

    /// Raised when a projection names a column the table does not carry.
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    /// Raised when a rewrite pattern fails to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when an input file name does not carry an environment token.
    #[error("invalid input file name '{0}'")]
    InvalidFileName(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Per-record failure raised while expanding range notation. These never
/// abort a run; the offending record is skipped and reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// A ranged field is absent from the record.
    #[error("field '{field}' has no value to expand")]
    MissingValue { field: String },

    /// The value does not follow the declared shape of the field.
    #[error("field '{field}' value '{value}' is not a valid range token")]
    Malformed { field: String, value: String },

    /// Range bounds are reversed.
    #[error("field '{field}' range '{value}' has start greater than end")]
    Reversed { field: String, value: String },

    /// Range covers more units than its field shape allows.
    #[error("field '{field}' range '{value}' exceeds {limit} units")]
    TooLarge {
        field: String,
        value: String,
        limit: u64,
    },

        /// Prefixed range whose two bounds use different prefixes.
    #[error("field '{field}' range '{value}' mixes prefixes")]
    PrefixMismatch { field: String, value: String },

    /// Zipped fields expanded to sequences of different length.
    #[error("zipped fields {fields:?} expand to different lengths {lengths:?}")]
    LengthMismatch {
        fields: Vec<String>,
        lengths: Vec<usize>,
    },
}
