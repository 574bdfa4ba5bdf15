use thiserror::Error;

/// Everything that can go wrong between a raw request body and a prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// A required field was absent (or null) in the request.
    #[error("Missing required field: '{0}'")]
    MissingField(&'static str),

    /// A field was present but unusable: wrong type, non-finite, out of range,
    /// or a zero divisor for a derived ratio.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Scaler or model artifacts could not be read or do not fit the contract.
    #[error("model load failure: {0}")]
    ModelLoad(String),

    /// The forward pass or output mapping produced something unusable.
    #[error("inference failure: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, PredictError>;
