/// Type tag occupying the high 4 bits of a [`super::Val`].
///
/// Numeric identifiers are fixed on the wire. Never renumber these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Tag {
    /// Reserved immediates, including [`super::Val::NULL`] and the
    /// in-memory-only error encodings used by the builder.
    Special = 0,
    /// Immediate unsigned integer, 0..=2^28-1, carried directly in the payload.
    Int = 1,
    /// Payload is an offset to a 4-byte little-endian integer (value >= 2^28).
    Int32 = 2,
    /// Declared, not implemented in v1 (see `UNSUPPORTED`).
    Int64 = 3,
    /// Payload offset to a 1-byte length-prefixed byte string.
    Blob8 = 4,
    /// Payload offset to a 2-byte length-prefixed byte string.
    Blob16 = 5,
    /// Payload offset to a 4-byte length-prefixed byte string.
    Blob32 = 6,
    /// Payload offset to a count-prefixed array of field `Val`s.
    Object = 7,
    /// Same layout as `Object`; semantically a homogeneous sequence.
    Array = 8,
    /// Any other 4-bit pattern. Never written; rejected as `BAD_FORMAT` on read.
    Reserved = 0xF,
}

impl Tag {
    pub(crate) fn from_bits(bits: u8) -> Tag {
        match bits {
            0 => Tag::Special,
            1 => Tag::Int,
            2 => Tag::Int32,
            3 => Tag::Int64,
            4 => Tag::Blob8,
            5 => Tag::Blob16,
            6 => Tag::Blob32,
            7 => Tag::Object,
            8 => Tag::Array,
            _ => Tag::Reserved,
        }
    }
}
