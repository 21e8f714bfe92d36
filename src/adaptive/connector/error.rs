use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Error type covering the failure cases of an export, transform, or load.
///
/// Conditions the pipeline tolerates (a value cell that is not numeric, a
/// personnel level without data) never surface here; they only reduce row
/// counts.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Wrapper for IO failures such as reading or writing warehouse files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a run report fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with anything other than HTTP 200.
    #[error("{method} request not successful (status {status})")]
    Transport { method: String, status: u16 },

    /// Errors bubbled up from the HTTP client before a status was available.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed XML in a response, or a failure while writing a request.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed delimited payload.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The response parsed but did not have the expected structure.
    #[error("parse error: {0}")]
    Parse(String),

    /// An accounts export came back without an `output` node.
    #[error("{method} response did not contain an output node")]
    MissingOutput { method: String },

    /// The API reported a failure inside a well-formed response.
    #[error("{method} reported failure: {}", messages.join("; "))]
    Api {
        method: String,
        messages: Vec<String>,
    },

    /// A configured identity or year column is absent from the export.
    #[error("expected column '{column}' not found in export")]
    SchemaMismatch { column: String },

    /// A required setting is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The warehouse rejected a query or a load.
    #[error("warehouse error: {0}")]
    Warehouse(String),

    /// A warehouse query could not be parsed.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlparser::parser::ParserError),

    /// The notification could not be delivered.
    #[error("notification error: {0}")]
    Notification(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
