//! Errors raised while handling values, paths and timeouts

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("List index {0} out of bounds")]
    IndexOutOfBounds(usize),

    /// A path step that does not fit the value it is applied to, such as an
    /// index into an object
    #[error("Path step {step} does not apply to a {found} value")]
    InvalidPathStep { step: String, found: &'static str },

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, TfplugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        assert_eq!(
            TfplugError::InvalidDuration("10x".into()).to_string(),
            "Invalid duration: 10x"
        );
        assert_eq!(
            TfplugError::InvalidPathStep {
                step: "[0]".into(),
                found: "string",
            }
            .to_string(),
            "Path step [0] does not apply to a string value"
        );
    }
}
