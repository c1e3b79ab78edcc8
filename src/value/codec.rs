use super::{Tag, Val};

/// Anything a [`Val`]'s payload can be dereferenced against: a growing
/// writer slab, a borrowed slice, or a memory-mapped file. Unifies the three
/// consumption modes behind one bounds-checked accessor.
pub trait PayloadSource {
    fn slab(&self) -> &[u8];
}

impl<T: AsRef<[u8]>> PayloadSource for T {
    fn slab(&self) -> &[u8] {
        self.as_ref()
    }
}

/// Dereference `val`'s payload plus `offs` for `len` bytes, iff the whole
/// range lies within the slab. Immediate values (`SPECIAL`, `INT`) have no
/// meaningful offset and always fail to deref.
pub fn deref<S: PayloadSource + ?Sized>(src: &S, val: Val, offs: u32, len: u32) -> Option<&[u8]> {
    if matches!(val.tag(), Tag::Special | Tag::Int) {
        return None;
    }
    let slab = src.slab();
    let start = (val.payload() as u64).checked_add(offs as u64)?;
    let end = start.checked_add(len as u64)?;
    if end > slab.len() as u64 {
        return None;
    }
    Some(&slab[start as usize..end as usize])
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes.try_into().unwrap())
}

/// Read an immediate or `INT_32`-deref'd integer. Returns `None` if `val` is
/// `NULL` (callers that want a schema default should substitute one in that
/// case) and `None` if the tag is neither `INT` nor `INT_32`, matching the
/// C reader's "unknown type yields 0" rule generalized to an explicit option.
pub fn read_int<S: PayloadSource + ?Sized>(src: &S, val: Val) -> Option<u32> {
    match val.tag() {
        Tag::Int => Some(val.payload()),
        Tag::Int32 => deref(src, val, 0, 4).map(read_u32_le),
        _ => None,
    }
}

/// Read a length-prefixed byte string. `None` for `NULL` or a non-blob tag,
/// or if any deref falls out of bounds.
pub fn read_blob<S: PayloadSource + ?Sized>(src: &S, val: Val) -> Option<&[u8]> {
    match val.tag() {
        Tag::Blob8 => {
            let len = *deref(src, val, 0, 1)?.first()?;
            deref(src, val, 1, len as u32)
        }
        Tag::Blob16 => {
            let len_bytes = deref(src, val, 0, 2)?;
            let len = u16::from_le_bytes(len_bytes.try_into().unwrap());
            deref(src, val, 2, len as u32)
        }
        Tag::Blob32 => {
            let len_bytes = deref(src, val, 0, 4)?;
            let len = read_u32_le(len_bytes);
            deref(src, val, 4, len)
        }
        _ => None,
    }
}

/// A view over an `OBJECT`/`ARRAY` entry table: `field(0)` is the inclusive
/// entry count, `field(1..count)` are the declared field values in order.
#[derive(Clone, Copy)]
pub struct Object<'a> {
    entries: &'a [u8],
    count: u32,
}

impl<'a> Object<'a> {
    /// Number of entries, including slot 0 (the count itself).
    pub fn count(&self) -> u32 {
        self.count
    }

    /// 1-based field access: slot 0 holds the count, so valid indices are
    /// `1..count`. Missing trailing fields (index >= count) read as `NULL`.
    pub fn field(&self, index: u32) -> Val {
        if index == 0 || index >= self.count {
            return Val::NULL;
        }
        let start = (index as usize) * 4;
        Val::from_wire(read_u32_le(&self.entries[start..start + 4]))
    }
}

/// Resolve `val` to an `Object` view. A malformed entry table is modeled
/// as a clean `None` rather than a half-valid object with a null backing
/// value; there is no way to read a field off a failed `read_obj`.
pub fn read_obj<'a, S: PayloadSource + ?Sized>(src: &'a S, val: Val) -> Option<Object<'a>> {
    if !matches!(val.tag(), Tag::Object | Tag::Array) {
        return None;
    }
    let count_bytes = deref(src, val, 0, 4)?;
    let count = read_u32_le(count_bytes);
    if count == 0 {
        return None;
    }
    let entries = deref(src, val, 0, count.checked_mul(4)?)?;
    Some(Object { entries, count })
}

/// The trailing `val` of the slab, or `NULL` if the slab is too short to
/// hold one.
pub fn root<S: PayloadSource + ?Sized>(src: &S) -> Val {
    let slab = src.slab();
    if slab.len() < 4 {
        return Val::NULL;
    }
    let tail = &slab[slab.len() - 4..];
    Val::from_wire(read_u32_le(tail))
}
