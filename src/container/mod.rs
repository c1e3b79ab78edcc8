//! Framed, 8-byte-aligned block stream: file header, one content (`ADB`)
//! block, zero or more signature (`SIG`) blocks, then zero or more bulk
//! data (`DATA`) blocks.

mod block;
mod error;
mod header;

pub use block::{iter_blocks, write_block, BlockHeader, BlockRef, BlockType, HEADER_SIZE};
pub use error::ContainerError;
pub use header::FileHeader;

use crate::signing::SignatureBlock;

/// A fully parsed in-memory (or mapped) container: the content slab plus
/// the raw payload of every signature and data block, in on-wire order.
#[derive(Debug)]
pub struct Parsed<'a> {
    pub header: FileHeader,
    pub content: &'a [u8],
    pub signatures: Vec<&'a [u8]>,
    pub data_blocks: Vec<&'a [u8]>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    InSignatures,
    InData,
}

/// Parse a whole buffer (mmap'd or owned) into its constituent blocks,
/// enforcing the on-wire ordering: exactly one leading `ADB` block, then any
/// number of `SIG` blocks, then any number of `DATA` blocks.
pub fn parse(buf: &[u8]) -> Result<Parsed<'_>, ContainerError> {
    let header = FileHeader::decode(buf)?;
    let body = &buf[FileHeader::SIZE..];

    let mut content: Option<&[u8]> = None;
    let mut signatures = Vec::new();
    let mut data_blocks = Vec::new();
    let mut state = ParseState::Start;

    for block in iter_blocks(body) {
        let block = block?;
        let payload = &body[block.payload_start..block.payload_start + block.header.length as usize];
        match (state, block.header.block_type) {
            (ParseState::Start, BlockType::Adb) => {
                content = Some(payload);
                state = ParseState::InSignatures;
            }
            (ParseState::Start, _) => {
                return Err(ContainerError::bad_message("first block must be ADB"));
            }
            (ParseState::InSignatures, BlockType::Sig) => signatures.push(payload),
            (ParseState::InSignatures, BlockType::Data) => {
                data_blocks.push(payload);
                state = ParseState::InData;
            }
            (ParseState::InSignatures, BlockType::Adb) => {
                return Err(ContainerError::bad_message("duplicate ADB block"));
            }
            (ParseState::InData, BlockType::Data) => data_blocks.push(payload),
            (ParseState::InData, _) => {
                return Err(ContainerError::bad_message(
                    "SIG or ADB block after DATA blocks",
                ));
            }
        }
    }

    let content = content.ok_or_else(|| ContainerError::bad_message("missing ADB block"))?;
    Ok(Parsed { header, content, signatures, data_blocks })
}

/// Serialize a file header, one `ADB` block carrying `slab`, then one `SIG`
/// block per signature. The caller is responsible for producing `slab`
/// (dedup store + schema builder) and `signatures` (the signing module).
pub fn serialize(
    out: &mut Vec<u8>,
    schema_id: u32,
    slab: &[u8],
    signatures: &[SignatureBlock],
) -> Result<(), ContainerError> {
    out.extend_from_slice(&FileHeader::new(schema_id).encode());
    write_block(out, BlockType::Adb, slab)?;
    for sig in signatures {
        write_block(out, BlockType::Sig, &sig.encode())?;
    }
    tracing::debug!(schema_id, slab_len = slab.len(), signatures = signatures.len(), "serialized container");
    Ok(())
}

/// Stream a file block-by-block, letting `cb` replace or drop individual
/// blocks. If `cb` returns `None` the block is copied verbatim; if it
/// returns `Some(bytes)` those bytes become that block's new payload
/// (re-framed with the original block type). Used to re-sign or re-wrap a
/// file without re-parsing the value tree.
pub fn transform<F>(input: &[u8], out: &mut Vec<u8>, mut cb: F) -> Result<(), ContainerError>
where
    F: FnMut(BlockType, &[u8]) -> Option<Vec<u8>>,
{
    let header = FileHeader::decode(input)?;
    out.extend_from_slice(&header.encode());
    let body = &input[FileHeader::SIZE..];
    for block in iter_blocks(body) {
        let block = block?;
        let payload = &body[block.payload_start..block.payload_start + block.header.length as usize];
        match cb(block.header.block_type, payload) {
            Some(replacement) => write_block(out, block.header.block_type, &replacement)?,
            None => write_block(out, block.header.block_type, payload)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_rejects_data_before_sig_is_fine_but_sig_after_data_fails() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&FileHeader::new(1).encode());
        write_block(&mut buf, BlockType::Adb, b"slab").unwrap();
        write_block(&mut buf, BlockType::Data, b"bulk").unwrap();
        write_block(&mut buf, BlockType::Sig, b"late-sig").unwrap();
        assert!(parse(&buf).is_err());
    }

    #[test]
    fn parse_accepts_adb_then_sigs_then_data() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&FileHeader::new(1).encode());
        write_block(&mut buf, BlockType::Adb, b"slab").unwrap();
        write_block(&mut buf, BlockType::Sig, b"sig-a").unwrap();
        write_block(&mut buf, BlockType::Sig, b"sig-b").unwrap();
        write_block(&mut buf, BlockType::Data, b"bulk-1").unwrap();
        write_block(&mut buf, BlockType::Data, b"bulk-2").unwrap();
        let parsed = parse(&buf).unwrap();
        assert_eq!(parsed.content, b"slab");
        assert_eq!(parsed.signatures, vec![&b"sig-a"[..], &b"sig-b"[..]]);
        assert_eq!(parsed.data_blocks, vec![&b"bulk-1"[..], &b"bulk-2"[..]]);
    }

    #[test]
    fn transform_copies_unreplaced_blocks_verbatim() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&FileHeader::new(1).encode());
        write_block(&mut buf, BlockType::Adb, b"slab").unwrap();
        write_block(&mut buf, BlockType::Sig, b"old-sig").unwrap();

        let mut out = Vec::new();
        transform(&buf, &mut out, |ty, payload| {
            if ty == BlockType::Sig {
                Some(b"new-sig".to_vec())
            } else {
                let _ = payload;
                None
            }
        })
        .unwrap();

        let parsed = parse(&out).unwrap();
        assert_eq!(parsed.content, b"slab");
        assert_eq!(parsed.signatures, vec![&b"new-sig"[..]]);
    }
}
