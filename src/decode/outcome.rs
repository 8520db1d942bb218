use bytes::Bytes;

use crate::error::{DecodeFailure, Result};

/// A decoded picture as handed back by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Raw pixel data, layout defined by the engine
    pub data: Bytes,
    /// Picture width in pixels
    pub width: u32,
    /// Picture height in pixels
    pub height: u32,
}

impl DecodedFrame {
    /// Wraps engine output with its dimensions
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }
}

/// Result of exactly one engine submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The engine produced a displayable picture
    Frame(DecodedFrame),
    /// The engine failed to decode the task
    Error(DecodeFailure),
    /// Input was consumed without a picture coming out (parameter sets,
    /// buffered non-IDR slices, ...)
    NoFrame,
}

impl DecodeOutcome {
    /// Shorthand for an error outcome with the given message
    pub fn error(message: impl Into<String>) -> Self {
        DecodeOutcome::Error(DecodeFailure::new(message))
    }

    /// Converts into the `Result<Option<_>>` shape used by pull-style callers
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Decode`](crate::DecoderError::Decode) for an
    /// error outcome.
    pub fn into_result(self) -> Result<Option<DecodedFrame>> {
        match self {
            DecodeOutcome::Frame(frame) => Ok(Some(frame)),
            DecodeOutcome::Error(failure) => Err(failure.into()),
            DecodeOutcome::NoFrame => Ok(None),
        }
    }
}

/// Owned event for consumers that read outcomes through a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A decoded picture
    Frame(DecodedFrame),
    /// A failed decode
    Error(DecodeFailure),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecoderError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_into_result() {
        let frame = DecodedFrame::new(vec![1u8, 2, 3], 4, 2);
        assert_eq!(
            DecodeOutcome::Frame(frame.clone()).into_result().unwrap(),
            Some(frame)
        );
        assert_eq!(DecodeOutcome::NoFrame.into_result().unwrap(), None);

        match DecodeOutcome::error("bad slice").into_result() {
            Err(DecoderError::Decode(failure)) => assert_eq!(failure.message, "bad slice"),
            other => panic!("expected a decode error, got {:?}", other),
        }
    }
}
