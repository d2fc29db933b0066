//! lcwdelta: LCW ("format80") compression and XOR frame deltas ("format40").
//!
//! The crate provides:
//! - The LCW dictionary/run-length codec (`lcw`)
//! - XOR-delta generation and application, including viewport regions (`xor`)
//! - A block-framed container for streaming LCW data (`frame`)
//! - An optional CLI (`cli` feature)
//!
//! Codecs never fail: encoders always produce a stream, and decoders stop
//! early on malformed input, reporting how far they got.
//!
//! # Quick Start
//!
//! ```
//! use lcwdelta::{lcw, xor};
//!
//! let frame = b"hello hello hello world".to_vec();
//! let packed = lcw::compress(&frame);
//! assert_eq!(lcw::decompress(&packed, frame.len()), frame);
//!
//! let next = b"hello jello hello world".to_vec();
//! let delta = xor::generate_delta(&next, &frame);
//! let mut shown = frame.clone();
//! xor::apply_delta(&mut shown, &delta);
//! assert_eq!(shown, next);
//! ```

pub mod frame;
pub mod lcw;
pub mod xor;

#[cfg(feature = "cli")]
pub mod cli;
