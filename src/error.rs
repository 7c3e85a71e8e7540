use thiserror::Error;

/// Failure taxonomy for the extraction pipelines.
///
/// The first four variants are client errors: the payload itself is the
/// problem and retrying without changing it cannot succeed. `Unexpected`
/// covers internal faults (OCR engine errors, storage failures); its cause
/// is logged but only a summary is returned to the caller.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("no filament items found in document")]
    NoItemsFound,

    #[error("internal error: {0}")]
    Unexpected(String),
}

impl ExtractionError {
    /// Whether this is a client-side (400-class) error.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExtractionError::Unexpected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_classification() {
        assert!(ExtractionError::InvalidInput("empty".into()).is_client_error());
        assert!(ExtractionError::InvalidImage("bad".into()).is_client_error());
        assert!(ExtractionError::InvalidDocument("bad".into()).is_client_error());
        assert!(ExtractionError::NoItemsFound.is_client_error());
        assert!(!ExtractionError::Unexpected("boom".into()).is_client_error());
    }
}
