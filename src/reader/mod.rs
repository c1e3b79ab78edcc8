//! Read-only database handle over a mapped file, a borrowed slice, or an
//! owned buffer. Parsing and (optional) signature verification happen once,
//! at open time; a handle that fails either is never returned to the
//! caller.

mod error;

pub use error::ReaderError;

use crate::container::{self, FileHeader};
use crate::signing::{SignatureBlock, Trust};
use crate::value::{self, Val};

#[derive(Debug)]
enum Storage<'a> {
    Mapped(memmap2::Mmap),
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

fn storage_buf<'a>(storage: &'a Storage<'_>) -> &'a [u8] {
    match storage {
        Storage::Mapped(mmap) => mmap,
        Storage::Borrowed(buf) => buf,
        Storage::Owned(buf) => buf,
    }
}

/// A parsed, (optionally) trust-verified database: the three consumption
/// modes named by the format unified behind one read API.
#[derive(Debug)]
pub struct Database<'a> {
    storage: Storage<'a>,
    content_range: (usize, usize),
    schema_id: u32,
}

impl<'a> Database<'a> {
    fn buf(&self) -> &[u8] {
        storage_buf(&self.storage)
    }

    /// Open a memory-mapped file. Fails (and drops the mapping) if the
    /// container is malformed, the schema id doesn't match `expected_schema`,
    /// or `trust` is given and no signature verifies.
    pub fn open_mapped(path: &std::path::Path, expected_schema: u32, trust: Option<&Trust>) -> Result<Database<'static>, ReaderError> {
        let span = tracing::debug_span!("open_mapped", path = %path.display(), schema_id = expected_schema);
        let _guard = span.enter();
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not concurrently
        // truncated by this process; callers opening files shared with other
        // writers accept the usual mmap caveats.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Database::open_from(Storage::Mapped(mmap), expected_schema, trust)
    }

    /// Open a borrowed in-memory byte slice (already read, or a blob from
    /// elsewhere in the caller's process).
    pub fn open_slice(buf: &'a [u8], expected_schema: u32, trust: Option<&Trust>) -> Result<Database<'a>, ReaderError> {
        Database::open_from(Storage::Borrowed(buf), expected_schema, trust)
    }

    /// Open an owned byte buffer, e.g. one read from a non-seekable source.
    pub fn open_owned(buf: Vec<u8>, expected_schema: u32, trust: Option<&Trust>) -> Result<Database<'static>, ReaderError> {
        Database::open_from(Storage::Owned(buf), expected_schema, trust)
    }

    fn open_from(storage: Storage<'a>, expected_schema: u32, trust: Option<&Trust>) -> Result<Database<'a>, ReaderError> {
        let buf = storage_buf(&storage);
        let parsed = container::parse(buf)?;

        if parsed.header.schema_id != expected_schema {
            return Err(ReaderError::SchemaMismatch { expected: expected_schema, found: parsed.header.schema_id });
        }

        if let Some(trust) = trust {
            let blocks: Vec<SignatureBlock> =
                parsed.signatures.iter().map(|raw| SignatureBlock::decode(raw)).collect::<Result<_, _>>()?;
            trust.verify(parsed.header, parsed.content, &blocks)?;
        }

        let start = parsed.content.as_ptr() as usize - buf.as_ptr() as usize;
        let content_range = (start, parsed.content.len());

        let schema_id = parsed.header.schema_id;
        tracing::debug!(schema_id, content_len = parsed.content.len(), "database opened");
        Ok(Database { storage, content_range, schema_id })
    }

    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }

    /// The raw payload slab: every interned value's bytes, read-only.
    pub fn content_slab(&self) -> &[u8] {
        let (start, len) = self.content_range;
        &self.buf()[start..start + len]
    }

    /// The database's root value: the trailing `val` of the content slab.
    pub fn root(&self) -> Val {
        value::root(&self.content_slab())
    }

    pub fn magic(&self) -> u32 {
        FileHeader::decode(self.buf()).map(|h| h.magic).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::container::{write_block, BlockType};
    use crate::container::FileHeader as FH;
    use crate::value::{Tag, Val};

    fn sample_file() -> Vec<u8> {
        let mut slab = Vec::new();
        slab.extend_from_slice(&Val::new(Tag::Int, 42).to_wire().to_le_bytes());
        let mut buf = Vec::new();
        buf.extend_from_slice(&FH::new(7).encode());
        write_block(&mut buf, BlockType::Adb, &slab).unwrap();
        buf
    }

    #[test]
    fn open_slice_exposes_root_and_schema_id() {
        let buf = sample_file();
        let db = Database::open_slice(&buf, 7, None).unwrap();
        assert_eq!(db.schema_id(), 7);
        assert_eq!(value::read_int(&db.content_slab(), db.root()), Some(42));
    }

    #[test]
    fn wrong_schema_id_is_rejected() {
        let buf = sample_file();
        assert!(matches!(Database::open_slice(&buf, 9, None), Err(ReaderError::SchemaMismatch { .. })));
    }

    #[test]
    fn missing_signature_with_trust_required_fails() {
        let buf = sample_file();
        let trust = Trust::new();
        assert!(Database::open_slice(&buf, 7, Some(&trust)).is_err());
    }

    #[test]
    fn open_owned_takes_ownership_of_the_buffer() {
        let buf = sample_file();
        let db = Database::open_owned(buf, 7, None).unwrap();
        assert_eq!(db.schema_id(), 7);
    }
}
