use thiserror::Error;

/// Error reported by the layer decoder for a frame
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The frame structure could not be decoded (truncated headers, lengths
    /// inconsistent with the data)
    #[error("decode failure: {0}")]
    Failure(String),
    /// A layer was decoded but its content is not what the enclosing layer announced
    #[error("layer error: {0}")]
    Layer(String),
}

/// Error returned when building a packet record from a decoded frame
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("decoding error: {0}")]
    Decode(String),
}

impl From<&DecodeError> for ParseError {
    fn from(e: &DecodeError) -> Self {
        match e {
            DecodeError::Failure(details) => ParseError::Malformed(details.clone()),
            DecodeError::Layer(details) => ParseError::Decode(details.clone()),
        }
    }
}
