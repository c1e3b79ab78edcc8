//! Tagged 32-bit values (`val`) and the read-side value codec.
//!
//! A [`Val`] never exposes its raw word to schema callers; every accessor
//! goes through [`Tag`] and the bounds-checked [`deref`] helper.

mod codec;
mod tag;

pub use codec::{deref, read_blob, read_int, read_obj, root, Object, PayloadSource};
pub use tag::Tag;

/// Low 28 bits of a [`Val`] carry the payload; the remaining bits carry the tag.
pub const PAYLOAD_BITS: u32 = 28;
const PAYLOAD_MASK: u32 = (1 << PAYLOAD_BITS) - 1;

/// A 32-bit tagged value: high 4 bits are a [`Tag`], low 28 bits are a payload
/// that is either an immediate value or an offset into a payload slab.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Val(u32);

impl Val {
    /// The all-zero immediate, the value of every unset object field.
    pub const NULL: Val = Val(0);

    /// Build a value from an explicit tag and payload. Panics if `payload`
    /// does not fit in 28 bits; callers are expected to have validated this
    /// already (offsets are bounded by the slab, immediates by construction).
    pub fn new(tag: Tag, payload: u32) -> Self {
        assert!(payload <= PAYLOAD_MASK, "val payload overflows 28 bits");
        Val(((tag as u32) << PAYLOAD_BITS) | payload)
    }

    /// Reconstruct a `Val` from its on-wire 32-bit representation.
    pub fn from_wire(word: u32) -> Self {
        Val(word)
    }

    /// The on-wire 32-bit representation.
    pub fn to_wire(self) -> u32 {
        self.0
    }

    pub fn tag(self) -> Tag {
        Tag::from_bits((self.0 >> PAYLOAD_BITS) as u8)
    }

    pub fn payload(self) -> u32 {
        self.0 & PAYLOAD_MASK
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// An in-memory-only error encoding. Never written to a slab: a builder
    /// that produces one of these clears its poisoned flag's guarding magic
    /// instead of letting the value escape to disk.
    pub(crate) fn error(code: u32) -> Self {
        Val::new(Tag::Special, code)
    }

    pub(crate) fn is_error(self) -> bool {
        matches!(self.tag(), Tag::Special) && self.payload() != 0
    }
}

impl std::fmt::Debug for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Val")
            .field("tag", &self.tag())
            .field("payload", &self.payload())
            .finish()
    }
}
