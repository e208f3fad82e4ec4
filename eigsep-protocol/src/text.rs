//! Whitespace-delimited decimal lines

use heapless::Vec;

use eigsep_core::sensor::RawPair;

use crate::decoder::ProtocolError;

/// Longest accepted line, excluding the newline
pub const MAX_LINE_LEN: usize = 64;

/// Parse one line (without the newline) into a raw pair
pub fn parse_line(line: &[u8]) -> Result<RawPair, ProtocolError> {
    let line = core::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
    let mut fields = line.split_ascii_whitespace();

    let mut next = || -> Result<i64, ProtocolError> {
        fields
            .next()
            .ok_or(ProtocolError::WrongFieldCount)?
            .parse()
            .map_err(|_| ProtocolError::InvalidNumber)
    };
    let az = next()?;
    let alt = next()?;

    if fields.next().is_some() {
        return Err(ProtocolError::WrongFieldCount);
    }
    Ok(RawPair::new(az, alt))
}

/// Line-buffering decoder
#[derive(Debug, Clone, Default)]
pub struct LineDecoder {
    buffer: Vec<u8, MAX_LINE_LEN>,
    /// Dropping bytes until the next newline after an overflow
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Feed one byte
    ///
    /// Blank lines (including the `\r` of CRLF endings) are skipped.
    pub fn feed(&mut self, byte: u8) -> Option<Result<RawPair, ProtocolError>> {
        match byte {
            b'\n' => {
                if self.discarding {
                    self.reset();
                    return None;
                }
                let result = if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    None
                } else {
                    Some(parse_line(&self.buffer))
                };
                self.buffer.clear();
                result
            }
            _ if self.discarding => None,
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.discarding = true;
                    return Some(Err(ProtocolError::LineTooLong));
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_all(decoder: &mut LineDecoder, bytes: &[u8]) -> std::vec::Vec<Result<RawPair, ProtocolError>> {
        bytes.iter().filter_map(|&b| decoder.feed(b)).collect()
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(b"100 200"), Ok(RawPair::new(100, 200)));
        assert_eq!(parse_line(b"  -5\t7 "), Ok(RawPair::new(-5, 7)));
        assert_eq!(parse_line(b"100"), Err(ProtocolError::WrongFieldCount));
        assert_eq!(parse_line(b"1 2 3"), Err(ProtocolError::WrongFieldCount));
        assert_eq!(parse_line(b"1 x"), Err(ProtocolError::InvalidNumber));
        assert_eq!(parse_line(&[0xff, b' ', b'1']), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn test_stream_with_crlf_and_blank_lines() {
        let mut decoder = LineDecoder::new();
        let got = decode_all(&mut decoder, b"1 2\r\n\n3 4\n");
        assert_eq!(got, [Ok(RawPair::new(1, 2)), Ok(RawPair::new(3, 4))]);
    }

    #[test]
    fn test_partial_line_waits() {
        let mut decoder = LineDecoder::new();
        assert!(decode_all(&mut decoder, b"12 3").is_empty());
        assert_eq!(decode_all(&mut decoder, b"4\n"), [Ok(RawPair::new(12, 34))]);
    }

    #[test]
    fn test_overflow_resyncs_on_newline() {
        let mut decoder = LineDecoder::new();
        let mut bytes = std::vec![b'9'; MAX_LINE_LEN + 10];
        bytes.extend_from_slice(b"\n5 6\n");

        let got = decode_all(&mut decoder, &bytes);
        assert_eq!(got, [Err(ProtocolError::LineTooLong), Ok(RawPair::new(5, 6))]);
    }

    #[test]
    fn test_malformed_line_does_not_poison_stream() {
        let mut decoder = LineDecoder::new();
        let got = decode_all(&mut decoder, b"garbage\n7 8\n");
        assert_eq!(got, [Err(ProtocolError::InvalidNumber), Ok(RawPair::new(7, 8))]);
    }

    proptest! {
        #[test]
        fn prop_decodes_any_pair(az in 0i64..(10 * 65_535), alt in 0i64..(10 * 65_535)) {
            let mut decoder = LineDecoder::new();
            let line = std::format!("{} {}\n", az, alt);
            let got = decode_all(&mut decoder, line.as_bytes());
            prop_assert_eq!(got, std::vec![Ok(RawPair::new(az, alt))]);
        }
    }
}
