use super::error::ContainerError;

/// Size in bytes of a block's fixed header.
pub const HEADER_SIZE: u32 = 4;

/// The block stream's alignment unit: every block is padded with zeros so
/// the next block starts on an 8-byte boundary.
pub const BLOCK_ALIGNMENT: u32 = 8;

/// The 2-bit block type packed into the top of a block header.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockType {
    /// The sole content block: the interned value tree's payload slab.
    Adb,
    /// A detached signature over the `Adb` block's payload.
    Sig,
    /// A bulk data block, delivered via streaming callback once trusted.
    Data,
}

impl BlockType {
    fn from_bits(bits: u32) -> Result<Self, ContainerError> {
        match bits {
            0 => Ok(BlockType::Adb),
            1 => Ok(BlockType::Sig),
            2 => Ok(BlockType::Data),
            _ => Err(ContainerError::bad_message("reserved block type")),
        }
    }

    fn to_bits(self) -> u32 {
        match self {
            BlockType::Adb => 0,
            BlockType::Sig => 1,
            BlockType::Data => 2,
        }
    }
}

/// A decoded block header: its type and the length of its payload in bytes
/// (not counting the zero-padding to the next 8-byte boundary).
#[derive(Clone, Copy, Debug)]
pub struct BlockHeader {
    pub block_type: BlockType,
    pub length: u32,
}

impl BlockHeader {
    pub fn encode(self) -> [u8; 4] {
        let word = (self.block_type.to_bits() << 30) | (self.length & 0x3FFF_FFFF);
        word.to_le_bytes()
    }

    pub fn decode(word: u32) -> Result<Self, ContainerError> {
        let block_type = BlockType::from_bits(word >> 30)?;
        let length = word & 0x3FFF_FFFF;
        Ok(BlockHeader { block_type, length })
    }

    /// Total on-wire size of this block: header, payload, and padding,
    /// rounded up to the next 8-byte boundary.
    pub fn stride(self) -> u32 {
        round_up(HEADER_SIZE + self.length, BLOCK_ALIGNMENT)
    }

    pub fn padding(self) -> u32 {
        self.stride() - HEADER_SIZE - self.length
    }
}

pub(crate) fn round_up(n: u32, align: u32) -> u32 {
    (n + align - 1) / align * align
}

/// A reference to one block inside a parsed payload slab: its header and the
/// byte range of its payload (padding excluded).
#[derive(Clone, Copy, Debug)]
pub struct BlockRef {
    pub header: BlockHeader,
    pub payload_start: usize,
}

/// Walk a byte slice as a sequence of 8-byte-aligned blocks, stopping
/// exactly at the end of the buffer. Any structural problem short-circuits
/// the iterator with `BAD_MESSAGE`; a well-formed buffer yields every block
/// exactly once and then ends.
pub fn iter_blocks(buf: &[u8]) -> BlockIter<'_> {
    BlockIter { buf, pos: 0, done: false }
}

pub struct BlockIter<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = Result<BlockRef, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.pos == self.buf.len() {
            self.done = true;
            return None;
        }
        let remaining = self.buf.len() - self.pos;
        if remaining < HEADER_SIZE as usize {
            self.done = true;
            return Some(Err(ContainerError::bad_message("truncated block header")));
        }
        let word = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        let header = match BlockHeader::decode(word) {
            Ok(h) => h,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        let stride = header.stride();
        if stride < HEADER_SIZE || stride as usize > remaining {
            self.done = true;
            return Some(Err(ContainerError::bad_message("block exceeds buffer")));
        }
        let payload_start = self.pos + HEADER_SIZE as usize;
        self.pos += stride as usize;
        Some(Ok(BlockRef { header, payload_start }))
    }
}

/// Append `payload` as a framed block: header, payload, zero-padding to the
/// next 8-byte boundary.
pub fn write_block(
    out: &mut Vec<u8>,
    block_type: BlockType,
    payload: &[u8],
) -> Result<(), ContainerError> {
    let header = BlockHeader { block_type, length: payload.len() as u32 };
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    out.resize(out.len() + header.padding() as usize, 0);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let h = BlockHeader { block_type: BlockType::Sig, length: 37 };
        let word = u32::from_le_bytes(h.encode());
        let h2 = BlockHeader::decode(word).unwrap();
        assert_eq!(h2.block_type, BlockType::Sig);
        assert_eq!(h2.length, 37);
    }

    #[test]
    fn reserved_type_is_bad_message() {
        let word = (3u32 << 30) | 10;
        assert!(matches!(
            BlockHeader::decode(word),
            Err(ContainerError::BadMessage(_))
        ));
    }

    #[test]
    fn stride_rounds_up_to_eight() {
        let h = BlockHeader { block_type: BlockType::Data, length: 1 };
        assert_eq!(h.stride(), 8); // 4-byte header + 1 byte payload -> pad to 8
        let h2 = BlockHeader { block_type: BlockType::Data, length: 4 };
        assert_eq!(h2.stride(), 8);
        let h3 = BlockHeader { block_type: BlockType::Data, length: 5 };
        assert_eq!(h3.stride(), 16);
    }

    #[test]
    fn walk_terminates_exactly_at_end() {
        let mut buf = Vec::new();
        write_block(&mut buf, BlockType::Adb, b"hello").unwrap();
        write_block(&mut buf, BlockType::Sig, b"xy").unwrap();
        let blocks: Vec<_> = iter_blocks(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].header.block_type, BlockType::Adb);
        assert_eq!(blocks[1].header.block_type, BlockType::Sig);
    }

    #[test]
    fn walk_rejects_truncated_buffer() {
        let mut buf = Vec::new();
        write_block(&mut buf, BlockType::Adb, b"hello world").unwrap();
        buf.truncate(buf.len() - 1);
        let err = iter_blocks(&buf).collect::<Result<Vec<_>, _>>().unwrap_err();
        assert!(matches!(err, ContainerError::BadMessage(_)));
    }

    #[test]
    fn walk_bounds_every_malformed_input_in_len_steps() {
        // Fuzz-lite: every truncation prefix of a well-formed stream either
        // parses fully or terminates with BAD_MESSAGE - it never loops.
        let mut buf = Vec::new();
        write_block(&mut buf, BlockType::Adb, b"0123456789").unwrap();
        write_block(&mut buf, BlockType::Sig, b"abcdef").unwrap();
        for cut in 0..=buf.len() {
            let prefix = &buf[..cut];
            let mut steps = 0;
            for item in iter_blocks(prefix) {
                steps += 1;
                assert!(steps <= prefix.len().max(1));
                if item.is_err() {
                    break;
                }
            }
        }
    }
}
