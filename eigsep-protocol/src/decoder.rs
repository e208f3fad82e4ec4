//! Encoding-independent decoder

use core::fmt;
use core::str::FromStr;

use eigsep_core::sensor::RawPair;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::binary::FrameDecoder;
use crate::text::LineDecoder;

/// Errors while decoding the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Line exceeded the buffer before a newline arrived
    LineTooLong,
    /// Line is not valid UTF-8
    InvalidUtf8,
    /// Field is not a decimal integer
    InvalidNumber,
    /// Line did not contain exactly two fields
    WrongFieldCount,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::LineTooLong => f.write_str("sample line too long"),
            ProtocolError::InvalidUtf8 => f.write_str("sample line is not utf-8"),
            ProtocolError::InvalidNumber => f.write_str("sample field is not an integer"),
            ProtocolError::WrongFieldCount => f.write_str("expected two sample fields"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

/// Wire encoding of the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WireFormat {
    #[default]
    Text,
    Binary,
}

impl FromStr for WireFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(WireFormat::Text),
            "binary" => Ok(WireFormat::Binary),
            _ => Err(()),
        }
    }
}

/// Byte-fed decoder for either encoding
#[derive(Debug, Clone)]
pub enum SampleDecoder {
    Text(LineDecoder),
    Binary(FrameDecoder),
}

impl SampleDecoder {
    pub fn new(format: WireFormat) -> Self {
        match format {
            WireFormat::Text => SampleDecoder::Text(LineDecoder::new()),
            WireFormat::Binary => SampleDecoder::Binary(FrameDecoder::new()),
        }
    }

    /// Feed one byte; returns a result once a complete sample was seen
    pub fn feed(&mut self, byte: u8) -> Option<Result<RawPair, ProtocolError>> {
        match self {
            SampleDecoder::Text(decoder) => decoder.feed(byte),
            SampleDecoder::Binary(decoder) => decoder.feed(byte).map(Ok),
        }
    }

    /// Drop any partial sample (after a transport error or timeout)
    pub fn reset(&mut self) {
        match self {
            SampleDecoder::Text(decoder) => decoder.reset(),
            SampleDecoder::Binary(decoder) => decoder.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!("text".parse::<WireFormat>(), Ok(WireFormat::Text));
        assert_eq!("binary".parse::<WireFormat>(), Ok(WireFormat::Binary));
        assert_eq!("hex".parse::<WireFormat>(), Err(()));
    }

    #[test]
    fn test_same_sample_both_encodings() {
        let expected = RawPair::new(123_456, 7_890);

        let mut text = SampleDecoder::new(WireFormat::Text);
        let got: heapless::Vec<_, 2> = b"123456 7890\n".iter().filter_map(|&b| text.feed(b)).collect();
        assert_eq!(got.as_slice(), &[Ok(expected)]);

        let mut binary = SampleDecoder::new(WireFormat::Binary);
        let frame = crate::encode_pair(123_456, 7_890);
        let got: heapless::Vec<_, 2> = frame.iter().filter_map(|&b| binary.feed(b)).collect();
        assert_eq!(got.as_slice(), &[Ok(expected)]);
    }
}
