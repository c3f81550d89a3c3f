use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum SourceError {
    #[display("request to {source_name} failed")]
    Request { source_name: String },
    #[display("failed to parse response from {source_name}")]
    ResponseParse { source_name: String },
    #[display("no price history returned for {symbol}")]
    NoData { symbol: String },
    #[display("failed to read price history file")]
    Io,
}

#[derive(Debug, Display, Error)]
pub enum TableError {
    #[display("bars out of order at row {index}")]
    Unordered { index: usize },
    #[display("duplicate timestamp at row {index}")]
    DuplicateTimestamp { index: usize },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
    #[display("missing input column: {name}")]
    MissingColumn { name: String },
    #[display("column {name} is a bar column and cannot be replaced")]
    ProtectedColumn { name: String },
    #[display("column {column} has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Display, Error)]
pub enum ExportError {
    #[display("failed to write feature table")]
    Write,
}
