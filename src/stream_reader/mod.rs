//! Incremental reader for the block stream, for callers that only have a
//! non-seekable `Read` (a pipe, a socket) rather than a whole buffer or a
//! mappable file.
//!
//! Follows the exact block-order state machine the whole-buffer
//! [`crate::container::parse`] enforces, but never buffers `DATA` block
//! payloads: each one is handed to a caller-supplied callback as a bounded
//! sub-reader, and any bytes the callback doesn't consume are drained so the
//! stream stays aligned for the next block.

mod error;

pub use error::StreamError;

use std::io::{Read, Take};

use crate::container::{BlockHeader, BlockType, FileHeader, HEADER_SIZE};
use crate::signing::{SignatureBlock, Trust};

/// Anything a block stream can be read from. Blanket-implemented for every
/// `std::io::Read`; `segment` hands a caller a sub-reader bounded to exactly
/// one block's payload so it can't accidentally read past it.
pub trait InputStream: Read {
    fn segment(&mut self, n: u64) -> Take<&mut Self>
    where
        Self: Sized,
    {
        self.take(n)
    }
}

impl<R: Read + ?Sized> InputStream for R {}

/// Internal progress through the block-order state machine (ADB, then any
/// number of SIG, then any number of DATA).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum StreamState {
    Start,
    HaveAdb,
    InData,
}

/// The outcome of a fully-drained stream: the content slab and the schema
/// id from the file header.
#[derive(Debug)]
pub struct Streamed {
    pub content: Vec<u8>,
    pub schema_id: u32,
}

/// Read a whole block stream from `input`, calling `on_data(reader, length)`
/// once per `DATA` block. Trust, if given, is checked as soon as the first
/// `DATA` block is seen (or at end of stream if there are none) against
/// every `SIG` block read so far; a file with no `DATA` blocks and a
/// configured `trust` is still verified before this returns.
pub fn read_streamed<R: Read>(
    mut input: R,
    trust: Option<&Trust>,
    mut on_data: impl FnMut(&mut dyn Read, u32) -> Result<(), StreamError>,
) -> Result<Streamed, StreamError> {
    let mut header_buf = [0u8; FileHeader::SIZE];
    input.read_exact(&mut header_buf)?;
    let header = FileHeader::decode(&header_buf)?;

    let mut content: Option<Vec<u8>> = None;
    let mut signatures: Vec<SignatureBlock> = Vec::new();
    let mut verified = trust.is_none();
    let mut state = StreamState::Start;

    loop {
        let mut word_buf = [0u8; HEADER_SIZE as usize];
        if !read_or_eof(&mut input, &mut word_buf)? {
            break;
        }
        let word = u32::from_le_bytes(word_buf);
        let block = BlockHeader::decode(word)?;
        let padding = block.padding() as u64;

        match (state, block.block_type) {
            (StreamState::Start, BlockType::Adb) => {
                let mut buf = vec![0u8; block.length as usize];
                input.read_exact(&mut buf)?;
                content = Some(buf);
                state = StreamState::HaveAdb;
            }
            (StreamState::Start, _) => return Err(StreamError::bad_message("first block must be ADB")),
            (StreamState::HaveAdb, BlockType::Sig) => {
                let mut buf = vec![0u8; block.length as usize];
                input.read_exact(&mut buf)?;
                signatures.push(SignatureBlock::decode(&buf)?);
            }
            (StreamState::HaveAdb, BlockType::Adb) => return Err(StreamError::bad_message("duplicate ADB block")),
            (StreamState::HaveAdb, BlockType::Data) => {
                maybe_verify(&mut verified, trust, header, content.as_deref(), &signatures)?;
                tracing::debug!(length = block.length, "streaming first DATA block");
                drain_data_block(&mut input, block.length, &mut on_data)?;
                state = StreamState::InData;
            }
            (StreamState::InData, BlockType::Data) => {
                drain_data_block(&mut input, block.length, &mut on_data)?;
            }
            (StreamState::InData, _) => {
                tracing::warn!("rejected SIG or ADB block after DATA blocks");
                return Err(StreamError::bad_message("SIG or ADB block after DATA blocks"));
            }
        }

        skip_exact(&mut input, padding)?;
    }

    let content = content.ok_or_else(|| StreamError::bad_message("missing ADB block"))?;
    maybe_verify(&mut verified, trust, header, Some(&content), &signatures)?;

    Ok(Streamed { content, schema_id: header.schema_id })
}

fn maybe_verify(
    verified: &mut bool,
    trust: Option<&Trust>,
    header: FileHeader,
    content: Option<&[u8]>,
    signatures: &[SignatureBlock],
) -> Result<(), StreamError> {
    if *verified {
        return Ok(());
    }
    if let Some(trust) = trust {
        let content = content.ok_or_else(|| StreamError::bad_message("missing ADB block"))?;
        trust.verify(header, content, signatures)?;
    }
    *verified = true;
    Ok(())
}

fn drain_data_block(input: &mut impl Read, length: u32, on_data: &mut impl FnMut(&mut dyn Read, u32) -> Result<(), StreamError>) -> Result<(), StreamError> {
    let mut segment = input.segment(length as u64);
    on_data(&mut segment, length)?;
    let mut sink = [0u8; 4096];
    loop {
        let n = segment.read(&mut sink)?;
        if n == 0 {
            break;
        }
    }
    Ok(())
}

fn skip_exact(input: &mut impl Read, mut n: u64) -> Result<(), std::io::Error> {
    let mut sink = [0u8; 8];
    while n > 0 {
        let chunk = n.min(sink.len() as u64) as usize;
        input.read_exact(&mut sink[..chunk])?;
        n -= chunk as u64;
    }
    Ok(())
}

/// Reads exactly `buf.len()` bytes, returning `Ok(false)` on a clean EOF at
/// the very first byte (end of stream) and `Ok(true)` otherwise. A partial
/// read (EOF mid-block-header) is malformed, not a clean end.
fn read_or_eof(input: &mut impl Read, buf: &mut [u8]) -> Result<bool, std::io::Error> {
    let mut read = 0;
    while read < buf.len() {
        match input.read(&mut buf[read..]) {
            Ok(0) if read == 0 => return Ok(false),
            Ok(0) => return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated block header")),
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::container::{write_block, BlockType};
    use crate::value::{Tag, Val};

    fn build(content: &[u8], data_blocks: &[&[u8]]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&FileHeader::new(3).encode());
        write_block(&mut buf, BlockType::Adb, content).unwrap();
        for d in data_blocks {
            write_block(&mut buf, BlockType::Data, d).unwrap();
        }
        buf
    }

    #[test]
    fn reads_content_and_invokes_callback_per_data_block() {
        let mut slab = Vec::new();
        slab.extend_from_slice(&Val::new(Tag::Int, 5).to_wire().to_le_bytes());
        let file = build(&slab, &[b"chunk-one", b"chunk-two"]);

        let mut seen = Vec::new();
        let result = read_streamed(file.as_slice(), None, |r, len| {
            let mut buf = vec![0u8; len as usize];
            r.read_exact(&mut buf)?;
            seen.push(buf);
            Ok(())
        })
        .unwrap();

        assert_eq!(result.schema_id, 3);
        assert_eq!(result.content, slab);
        assert_eq!(seen, vec![b"chunk-one".to_vec(), b"chunk-two".to_vec()]);
    }

    #[test]
    fn partially_read_callback_chunk_still_advances_the_stream() {
        let mut slab = Vec::new();
        slab.extend_from_slice(&Val::new(Tag::Int, 1).to_wire().to_le_bytes());
        let file = build(&slab, &[b"0123456789", b"next-block"]);

        let mut first_seen = Vec::new();
        let result = read_streamed(file.as_slice(), None, |r, _len| {
            let mut buf = [0u8; 3];
            r.read_exact(&mut buf)?;
            first_seen.push(buf.to_vec());
            Ok(())
        })
        .unwrap();

        assert_eq!(first_seen, vec![b"012".to_vec(), b"nex".to_vec()]);
        assert_eq!(result.content, slab);
    }

    #[test]
    fn empty_database_with_no_data_blocks_still_verifies_trust() {
        let mut slab = Vec::new();
        slab.extend_from_slice(&Val::new(Tag::Int, 1).to_wire().to_le_bytes());
        let file = build(&slab, &[]);
        let trust = Trust::new();
        let err = read_streamed(file.as_slice(), Some(&trust), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, StreamError::Trust(_)));
    }
}
