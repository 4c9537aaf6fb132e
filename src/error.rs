use thiserror::Error;

#[derive(Error, Debug)]
pub enum PennyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not a number: {0:?}")]
    NotANumber(String),

    #[error("Unrecognized date format: {0:?}")]
    UnrecognizedDate(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("No statement files provided")]
    NoFiles,

    #[error("Invalid override: {0}")]
    InvalidOverride(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, PennyError>;
