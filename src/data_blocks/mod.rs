//! Bulk data blocks: the trailing `DATA` blocks that carry payload outside
//! the interned value tree, referenced from inside it by convention (e.g. a
//! schema blob field holding an encoded [`DataBlockRef`]).
//!
//! The core only plumbs the reference through; it does not know or care
//! what a data block's bytes mean. Addressing them by content, archive
//! extraction, and the volume-manager pipeline that actually consumes them
//! are all out of scope.

use crate::container::{write_block, BlockType, ContainerError, HEADER_SIZE};

/// A reference to one `DATA` block: its byte offset from the start of the
/// file and its payload length. `offset` points past that block's 4-byte
/// header, directly at its payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DataBlockRef {
    pub offset: u64,
    pub length: u32,
}

impl DataBlockRef {
    pub fn encode(self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < 12 {
            return None;
        }
        let offset = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let length = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        Some(DataBlockRef { offset, length })
    }
}

/// Append `payload` as a `DATA` block to `out`, returning a reference to it.
/// `out` is assumed to already hold a complete file header plus the `ADB`
/// and `SIG` blocks that precede any `DATA` block.
pub fn append_data_block(out: &mut Vec<u8>, payload: &[u8]) -> Result<DataBlockRef, ContainerError> {
    let offset = out.len() as u64 + HEADER_SIZE as u64;
    write_block(out, BlockType::Data, payload)?;
    tracing::debug!(offset, length = payload.len(), "appended data block");
    Ok(DataBlockRef { offset, length: payload.len() as u32 })
}
