use thiserror::Error;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Measurement table: {what}")]
    Measurement { what: String },
}
