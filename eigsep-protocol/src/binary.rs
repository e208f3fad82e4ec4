//! Fixed-width little-endian pairs

use eigsep_core::sensor::RawPair;

/// Bytes per sample pair
pub const FRAME_LEN: usize = 8;

/// Encode a pair as two little-endian `i32`
pub fn encode_pair(az: i32, alt: i32) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&az.to_le_bytes());
    frame[4..].copy_from_slice(&alt.to_le_bytes());
    frame
}

/// Decode a complete frame
pub fn decode_pair(frame: &[u8; FRAME_LEN]) -> RawPair {
    let az = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let alt = i32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
    RawPair::new(az as i64, alt as i64)
}

/// Frame-collecting decoder
///
/// The stream has no sync marker; alignment is re-established by
/// [`reset`](Self::reset) after a read timeout, when the sender is known
/// to be between frames.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    frame: [u8; FRAME_LEN],
    filled: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.filled = 0;
    }

    /// Bytes of the current partial frame
    pub fn pending(&self) -> usize {
        self.filled
    }

    /// Feed one byte; returns the pair once eight bytes were collected
    pub fn feed(&mut self, byte: u8) -> Option<RawPair> {
        self.frame[self.filled] = byte;
        self.filled += 1;
        if self.filled < FRAME_LEN {
            return None;
        }
        self.filled = 0;
        Some(decode_pair(&self.frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_bytes() {
        let frame = [0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(decode_pair(&frame), RawPair::new(1, -1));
    }

    #[test]
    fn test_consecutive_frames() {
        let mut decoder = FrameDecoder::new();
        let mut got = std::vec::Vec::new();
        for frame in [encode_pair(10, 20), encode_pair(30, 40)] {
            for byte in frame {
                if let Some(pair) = decoder.feed(byte) {
                    got.push(pair);
                }
            }
        }
        assert_eq!(got, [RawPair::new(10, 20), RawPair::new(30, 40)]);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut decoder = FrameDecoder::new();
        for byte in [1, 2, 3] {
            assert!(decoder.feed(byte).is_none());
        }
        assert_eq!(decoder.pending(), 3);

        decoder.reset();
        let pair = encode_pair(655_350, 1).into_iter().filter_map(|b| decoder.feed(b)).next();
        assert_eq!(pair, Some(RawPair::new(655_350, 1)));
    }
}
