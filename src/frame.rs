// Block framing for LCW streams.
//
// Input is cut into blocks of `block_size` bytes (the last one may be
// shorter). Each block is compressed on its own and written as
//
//   comp_len: u16 LE | uncomp_len: u16 LE | LCW payload (comp_len bytes)
//
// Blocks are independent, so they can be compressed in parallel and a
// decoder needs only one block in memory at a time.

use std::io::{self, Read, Write};

use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::lcw::{self, CompressOptions, DecodeStatus, config};

/// Bytes in a block header.
pub const HEADER_LEN: usize = 4;

pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Largest block whose worst-case compressed size still fits `comp_len`.
pub const MAX_BLOCK_SIZE: usize = 64_510;

// ---------------------------------------------------------------------------
// Options and errors
// ---------------------------------------------------------------------------

/// Configuration for [`BlockEncoder`].
#[derive(Debug, Clone)]
pub struct FrameOptions {
    /// Uncompressed bytes per block (1..=[`MAX_BLOCK_SIZE`]).
    pub block_size: usize,
    /// LCW compression level (0-9).
    pub level: u32,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            level: config::DEFAULT_LEVEL,
        }
    }
}

impl FrameOptions {
    fn validate(&self) -> Result<(), FrameError> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(FrameError::BlockSize(self.block_size));
        }
        Ok(())
    }

    fn lcw_options(&self) -> CompressOptions {
        CompressOptions { level: self.level }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("block size {0} outside 1..={max}", max = MAX_BLOCK_SIZE)]
    BlockSize(usize),
    #[error("stream ends inside the header of block {block}")]
    TruncatedHeader { block: u64 },
    #[error("stream ends inside block {block}: expected {expected} payload bytes, got {actual}")]
    TruncatedPayload {
        block: u64,
        expected: usize,
        actual: usize,
    },
    #[error("block {block} is corrupt: {reason}")]
    CorruptBlock { block: u64, reason: String },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Streaming block encoder.
///
/// # Example
/// ```
/// use lcwdelta::frame::{BlockEncoder, FrameOptions};
/// let mut enc = BlockEncoder::new(Vec::new(), FrameOptions::default()).unwrap();
/// enc.write(b"some data some data").unwrap();
/// let (framed, blocks) = enc.finish().unwrap();
/// assert_eq!(blocks, 1);
/// assert_eq!(lcwdelta::frame::decompress_all(&framed).unwrap(), b"some data some data");
/// ```
pub struct BlockEncoder<W: Write> {
    writer: W,
    opts: FrameOptions,
    buffer: Vec<u8>,
    bytes_in: u64,
    blocks_written: u64,
}

impl<W: Write> BlockEncoder<W> {
    pub fn new(writer: W, opts: FrameOptions) -> Result<Self, FrameError> {
        opts.validate()?;
        Ok(Self {
            writer,
            buffer: Vec::with_capacity(opts.block_size),
            opts,
            bytes_in: 0,
            blocks_written: 0,
        })
    }

    /// Feed input. Every completed block is compressed and written.
    pub fn write(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.bytes_in += data.len() as u64;
        let block_size = self.opts.block_size;
        let mut offset = 0usize;

        if !self.buffer.is_empty() {
            let take = (block_size - self.buffer.len()).min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            offset += take;

            if self.buffer.len() == block_size {
                let block = std::mem::take(&mut self.buffer);
                self.write_block(&block)?;
                self.buffer = block;
                self.buffer.clear();
            }
        }

        while offset + block_size <= data.len() {
            self.write_block(&data[offset..offset + block_size])?;
            offset += block_size;
        }

        if offset < data.len() {
            self.buffer.extend_from_slice(&data[offset..]);
        }
        Ok(())
    }

    /// Write the final partial block and return the writer and block count.
    pub fn finish(mut self) -> Result<(W, u64), FrameError> {
        if !self.buffer.is_empty() {
            let block = std::mem::take(&mut self.buffer);
            self.write_block(&block)?;
        }
        self.writer.flush()?;
        Ok((self.writer, self.blocks_written))
    }

    /// Input bytes received so far.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    fn write_block(&mut self, block: &[u8]) -> Result<(), FrameError> {
        let payload = lcw::compress_with(block, &self.opts.lcw_options());
        self.writer.write_all(&block_header(payload.len(), block.len()))?;
        self.writer.write_all(&payload)?;
        log::trace!(
            "frame: block {} {} -> {} bytes",
            self.blocks_written,
            block.len(),
            payload.len()
        );
        self.blocks_written += 1;
        Ok(())
    }
}

fn block_header(comp_len: usize, uncomp_len: usize) -> [u8; HEADER_LEN] {
    debug_assert!(comp_len <= 0xFFFF && uncomp_len <= 0xFFFF);
    let mut header = [0u8; HEADER_LEN];
    header[..2].copy_from_slice(&(comp_len as u16).to_le_bytes());
    header[2..].copy_from_slice(&(uncomp_len as u16).to_le_bytes());
    header
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Streaming block decoder. Holds one block in memory at a time.
pub struct BlockDecoder<R: Read> {
    reader: R,
    payload: Vec<u8>,
    block: Vec<u8>,
    bytes_decoded: u64,
    blocks_decoded: u64,
}

impl<R: Read> BlockDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            payload: Vec::new(),
            block: Vec::new(),
            bytes_decoded: 0,
            blocks_decoded: 0,
        }
    }

    /// Decode every remaining block into `writer`.
    ///
    /// Returns the total number of bytes decoded.
    pub fn decode_to<W: Write>(&mut self, writer: &mut W) -> Result<u64, FrameError> {
        while self.decode_block_to(writer)?.is_some() {}
        Ok(self.bytes_decoded)
    }

    /// Decode the next block into `writer`.
    ///
    /// Returns `Some(block_len)`, or `None` at a clean end of stream.
    pub fn decode_block_to<W: Write>(&mut self, writer: &mut W) -> Result<Option<usize>, FrameError> {
        let block = self.blocks_decoded;
        let mut header = [0u8; HEADER_LEN];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            HEADER_LEN => {}
            _ => return Err(FrameError::TruncatedHeader { block }),
        }
        let comp_len = usize::from(u16::from_le_bytes([header[0], header[1]]));
        let uncomp_len = usize::from(u16::from_le_bytes([header[2], header[3]]));

        self.payload.resize(comp_len, 0);
        let actual = read_full(&mut self.reader, &mut self.payload)?;
        if actual < comp_len {
            return Err(FrameError::TruncatedPayload {
                block,
                expected: comp_len,
                actual,
            });
        }

        self.block.resize(uncomp_len, 0);
        check_block(block, &self.payload, &mut self.block)?;
        writer.write_all(&self.block)?;

        log::trace!("frame: block {block} {comp_len} -> {uncomp_len} bytes");
        self.bytes_decoded += uncomp_len as u64;
        self.blocks_decoded += 1;
        Ok(Some(uncomp_len))
    }

    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    pub fn blocks_decoded(&self) -> u64 {
        self.blocks_decoded
    }
}

/// Decode one payload into `out`, which is sized to the header's length.
fn check_block(block: u64, payload: &[u8], out: &mut [u8]) -> Result<(), FrameError> {
    let corrupt = |reason: String| FrameError::CorruptBlock { block, reason };

    if out.is_empty() {
        return if payload.is_empty() {
            Ok(())
        } else {
            Err(corrupt(format!("{} payload bytes for an empty block", payload.len())))
        };
    }

    let decoded = lcw::decompress_into(payload, out);
    if decoded.status != DecodeStatus::EndMarker {
        return Err(corrupt(format!(
            "decoding stopped ({:?}) after {} of {} bytes",
            decoded.status,
            decoded.written,
            out.len()
        )));
    }
    if decoded.written != out.len() {
        return Err(corrupt(format!(
            "decoded {} bytes, header says {}",
            decoded.written,
            out.len()
        )));
    }
    if decoded.consumed != payload.len() {
        return Err(corrupt(format!(
            "{} trailing payload bytes",
            payload.len() - decoded.consumed
        )));
    }
    Ok(())
}

/// Fill `buf` as far as the reader allows; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Frame and compress `data` in one call.
pub fn compress_all(data: &[u8], opts: &FrameOptions) -> Result<Vec<u8>, FrameError> {
    let mut enc = BlockEncoder::new(Vec::new(), opts.clone())?;
    enc.write(data)?;
    let (framed, blocks) = enc.finish()?;
    log::debug!(
        "frame: {} bytes -> {} bytes in {blocks} blocks",
        data.len(),
        framed.len()
    );
    Ok(framed)
}

/// Compress blocks on the rayon pool.
///
/// Blocks are independent, so the output is identical to [`compress_all`].
#[cfg(feature = "parallel")]
pub fn compress_all_parallel(data: &[u8], opts: &FrameOptions) -> Result<Vec<u8>, FrameError> {
    opts.validate()?;
    let lcw_opts = opts.lcw_options();
    let blocks: Vec<(usize, Vec<u8>)> = data
        .par_chunks(opts.block_size)
        .map(|block| (block.len(), lcw::compress_with(block, &lcw_opts)))
        .collect();

    let total: usize = blocks.iter().map(|(_, p)| HEADER_LEN + p.len()).sum();
    let mut framed = Vec::with_capacity(total);
    for (uncomp_len, payload) in &blocks {
        framed.extend_from_slice(&block_header(payload.len(), *uncomp_len));
        framed.extend_from_slice(payload);
    }
    log::debug!(
        "frame: {} bytes -> {} bytes in {} blocks (parallel)",
        data.len(),
        framed.len(),
        blocks.len()
    );
    Ok(framed)
}

/// Decode a whole framed stream from memory.
pub fn decompress_all(framed: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut out = Vec::new();
    BlockDecoder::new(framed).decode_to(&mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i / 7) % 31) as u8).collect()
    }

    #[test]
    fn max_block_size_fits_header() {
        assert!(lcw::worst_case_len(MAX_BLOCK_SIZE) <= 0xFFFF);
        assert!(lcw::worst_case_len(MAX_BLOCK_SIZE + 1) > 0xFFFF);
    }

    #[test]
    fn rejects_bad_block_sizes() {
        for block_size in [0, MAX_BLOCK_SIZE + 1] {
            let opts = FrameOptions {
                block_size,
                ..Default::default()
            };
            assert!(matches!(
                BlockEncoder::new(Vec::new(), opts),
                Err(FrameError::BlockSize(n)) if n == block_size
            ));
        }
    }

    #[test]
    fn roundtrip_across_block_boundaries() {
        let data = sample(20_000);
        let opts = FrameOptions {
            block_size: 4096,
            level: 6,
        };
        let framed = compress_all(&data, &opts).unwrap();
        assert_eq!(decompress_all(&framed).unwrap(), data);
    }

    #[test]
    fn streaming_writes_match_one_shot() {
        let data = sample(10_000);
        let opts = FrameOptions {
            block_size: 1000,
            level: 3,
        };
        let mut enc = BlockEncoder::new(Vec::new(), opts.clone()).unwrap();
        for chunk in data.chunks(333) {
            enc.write(chunk).unwrap();
        }
        assert_eq!(enc.bytes_in(), 10_000);
        let (framed, blocks) = enc.finish().unwrap();
        assert_eq!(blocks, 10);
        assert_eq!(framed, compress_all(&data, &opts).unwrap());
    }

    #[test]
    fn header_layout() {
        let framed = compress_all(&[9u8; 100], &FrameOptions::default()).unwrap();
        let comp_len = u16::from_le_bytes([framed[0], framed[1]]) as usize;
        let uncomp_len = u16::from_le_bytes([framed[2], framed[3]]) as usize;
        assert_eq!(uncomp_len, 100);
        assert_eq!(framed.len(), HEADER_LEN + comp_len);
        assert_eq!(&framed[HEADER_LEN..], lcw::compress(&[9u8; 100]).as_slice());
    }

    #[test]
    fn empty_input_has_no_blocks() {
        let framed = compress_all(&[], &FrameOptions::default()).unwrap();
        assert!(framed.is_empty());
        assert!(decompress_all(&framed).unwrap().is_empty());
    }

    #[test]
    fn block_by_block_progress() {
        let data = sample(2500);
        let framed = compress_all(
            &data,
            &FrameOptions {
                block_size: 1000,
                level: 6,
            },
        )
        .unwrap();
        let mut dec = BlockDecoder::new(framed.as_slice());
        let mut out = Vec::new();
        assert_eq!(dec.decode_block_to(&mut out).unwrap(), Some(1000));
        assert_eq!(dec.decode_block_to(&mut out).unwrap(), Some(1000));
        assert_eq!(dec.decode_block_to(&mut out).unwrap(), Some(500));
        assert_eq!(dec.decode_block_to(&mut out).unwrap(), None);
        assert_eq!(dec.bytes_decoded(), 2500);
        assert_eq!(dec.blocks_decoded(), 3);
        assert_eq!(out, data);
    }

    #[test]
    fn truncation_is_reported() {
        let framed = compress_all(&sample(3000), &FrameOptions::default()).unwrap();
        assert!(matches!(
            decompress_all(&framed[..2]),
            Err(FrameError::TruncatedHeader { block: 0 })
        ));
        assert!(matches!(
            decompress_all(&framed[..framed.len() - 1]),
            Err(FrameError::TruncatedPayload { block: 0, .. })
        ));
    }

    #[test]
    fn length_mismatch_is_corrupt() {
        let mut framed = compress_all(b"hello hello hello", &FrameOptions::default()).unwrap();
        framed[2] = 20;
        assert!(matches!(
            decompress_all(&framed),
            Err(FrameError::CorruptBlock { block: 0, .. })
        ));

        // payload that stops short of the header's length
        let framed = [3, 0, 5, 0, 0x82, b'h', b'i'];
        assert!(matches!(
            decompress_all(&framed),
            Err(FrameError::CorruptBlock { block: 0, .. })
        ));

        // empty block with a payload
        let framed = [1, 0, 0, 0, 0x80];
        assert!(matches!(
            decompress_all(&framed),
            Err(FrameError::CorruptBlock { block: 0, .. })
        ));
    }

    #[test]
    fn empty_block_is_accepted() {
        assert!(decompress_all(&[0, 0, 0, 0]).unwrap().is_empty());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_output_is_identical() {
        let data = sample(50_000);
        let opts = FrameOptions {
            block_size: 4096,
            level: 6,
        };
        assert_eq!(
            compress_all_parallel(&data, &opts).unwrap(),
            compress_all(&data, &opts).unwrap()
        );
    }
}
