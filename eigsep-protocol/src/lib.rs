//! Potentiometer sample stream protocol
//!
//! The remote ADC (a microcontroller next to the pots) samples both pots,
//! sums a fixed number of readings per axis and sends the pair in axis
//! order (az, alt). Two encodings exist:
//!
//! ```text
//! text:    "<az> <alt>\n"            whitespace-delimited decimal
//! binary:  ┌──────────┬──────────┐
//!          │ az i32LE │ alt i32LE│   8 bytes, no framing
//!          └──────────┴──────────┘
//! ```
//!
//! Decoders are byte-fed state machines so they work on any transport.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

#[cfg(all(test, not(feature = "std")))]
extern crate std;

pub mod binary;
pub mod decoder;
pub mod text;

pub use binary::{encode_pair, FrameDecoder, FRAME_LEN};
pub use decoder::{ProtocolError, SampleDecoder, WireFormat};
pub use text::{parse_line, LineDecoder, MAX_LINE_LEN};
