//! Scratch-buffer builder for `OBJECT` and `ARRAY` values.
//!
//! Unlike the C source's `adb_w` struct, the builder's capacity lives in its
//! own field rather than being smuggled into slot 0 of the scratch array;
//! slot 0 here is always the first declared field/element, never a count.

use crate::dedup::{Alignment, Writer};
use crate::value::{Tag, Val};

use super::scalars::{write_blob, write_int};
use super::{ObjectKind, ObjectSchema, SchemaError};

/// Builds one `OBJECT` or `ARRAY` value at a time against a [`Writer`].
/// `commit` interns the finished entry table and resets the builder so the
/// same scratch allocation can build the next sibling without reallocating.
pub struct Builder<'w> {
    writer: &'w mut Writer,
    schema: &'static ObjectSchema,
    cap: usize,
    used: usize,
    slots: Vec<Val>,
}

impl<'w> Builder<'w> {
    /// A builder for `schema`'s declared fields. `schema.kind` must be
    /// [`ObjectKind::Object`].
    pub fn new_object(writer: &'w mut Writer, schema: &'static ObjectSchema) -> Self {
        assert_eq!(schema.kind, ObjectKind::Object, "new_object requires an OBJECT schema");
        let cap = schema.fields.len();
        Builder { writer, schema, cap, used: 0, slots: vec![Val::NULL; cap] }
    }

    /// A builder for up to `cap` elements of `schema`'s element kind.
    /// `schema.kind` must be [`ObjectKind::Array`].
    pub fn new_array(writer: &'w mut Writer, schema: &'static ObjectSchema, cap: usize) -> Self {
        assert_eq!(schema.kind, ObjectKind::Array, "new_array requires an ARRAY schema");
        Builder { writer, schema, cap, used: 0, slots: vec![Val::NULL; cap] }
    }

    pub fn writer(&mut self) -> &mut Writer {
        self.writer
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn schema(&self) -> &'static ObjectSchema {
        self.schema
    }

    /// Set a declared field by its 1-based index. `OBJECT` builders only.
    /// Read back a slot's current value by its 1-based index, for
    /// `pre_commit` hooks that derive one field from another.
    pub fn get(&self, index: usize) -> Val {
        if index == 0 || index > self.cap {
            Val::NULL
        } else {
            self.slots[index - 1]
        }
    }

    pub fn set(&mut self, index: usize, val: Val) -> Result<(), SchemaError> {
        if index == 0 || index > self.cap {
            return Err(SchemaError::TooBig(format!("field index {index} exceeds cap {}", self.cap)));
        }
        self.slots[index - 1] = val;
        self.used = self.used.max(index);
        Ok(())
    }

    pub fn set_int(&mut self, index: usize, n: u32) -> Result<(), SchemaError> {
        let val = write_int(self.writer, n)?;
        self.set(index, val)
    }

    pub fn set_blob(&mut self, index: usize, bytes: &[u8]) -> Result<(), SchemaError> {
        let val = write_blob(self.writer, bytes)?;
        self.set(index, val)
    }

    pub fn set_obj(&mut self, index: usize, val: Val) -> Result<(), SchemaError> {
        self.set(index, val)
    }

    /// Append the next element of an `ARRAY` builder.
    pub fn append(&mut self, val: Val) -> Result<(), SchemaError> {
        if self.used >= self.cap {
            return Err(SchemaError::TooBig(format!("array builder cap {} exceeded", self.cap)));
        }
        self.slots[self.used] = val;
        self.used += 1;
        Ok(())
    }

    pub fn append_int(&mut self, n: u32) -> Result<(), SchemaError> {
        let val = write_int(self.writer, n)?;
        self.append(val)
    }

    pub fn append_blob(&mut self, bytes: &[u8]) -> Result<(), SchemaError> {
        let val = write_blob(self.writer, bytes)?;
        self.append(val)
    }

    /// Finish the current object, running `pre_commit` first if the schema
    /// declares one, then interning the entry table: the count word
    /// followed by every slot up to the last non-`NULL` one. The builder's
    /// slots are cleared afterward so it can be reused to build a sibling.
    pub fn commit(&mut self) -> Result<Val, SchemaError> {
        if self.writer.is_poisoned() {
            return Err(SchemaError::bad_format("writer is poisoned by an earlier error"));
        }
        if let Some(pre_commit) = self.schema.pre_commit {
            pre_commit(self)?;
        }

        let mut len = self.slots.len();
        while len > 0 && self.slots[len - 1].is_null() {
            len -= 1;
        }
        let count = (len + 1) as u32;

        let mut words = Vec::with_capacity(4 * (len + 1));
        words.extend_from_slice(&count.to_le_bytes());
        for v in &self.slots[..len] {
            words.extend_from_slice(&v.to_wire().to_le_bytes());
        }

        let offset = match self.writer.intern(&[&words], Alignment::Four) {
            Ok(off) => off,
            Err(e) => {
                self.writer.poison();
                return Err(e.into());
            }
        };

        let tag = match self.schema.kind {
            ObjectKind::Object => Tag::Object,
            ObjectKind::Array => Tag::Array,
        };

        self.slots.iter_mut().for_each(|s| *s = Val::NULL);
        self.used = 0;

        Ok(Val::new(tag, offset))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::manifest::{DEPENDENCY, DEPENDENCY_LIST, MANIFEST};
    use crate::value::{read_blob, read_int, read_obj};

    #[test]
    fn object_builder_trims_trailing_nulls() {
        let mut w = Writer::new(8);
        let mut b = Builder::new_object(&mut w, &DEPENDENCY);
        b.set_blob(1, b"left-pad").unwrap();
        b.set_int(2, 1).unwrap();
        let v = b.commit().unwrap();
        let obj = read_obj(&w, v).unwrap();
        assert_eq!(obj.count(), 3); // count slot + 2 fields, nothing trimmed
        assert_eq!(read_blob(&w, obj.field(1)), Some(&b"left-pad"[..]));
        assert_eq!(read_int(&w, obj.field(2)), Some(1));
    }

    #[test]
    fn array_builder_reuses_scratch_between_commits() {
        let mut w = Writer::new(8);
        let mut elem = Builder::new_object(&mut w, &DEPENDENCY);
        elem.set_blob(1, b"left-pad").unwrap();
        elem.set_int(2, 1).unwrap();
        let dep_a = elem.commit().unwrap();
        elem.set_blob(1, b"right-pad").unwrap();
        elem.set_int(2, 2).unwrap();
        let dep_b = elem.commit().unwrap();

        let mut arr = Builder::new_array(&mut w, &DEPENDENCY_LIST, 4);
        arr.append(dep_a).unwrap();
        arr.append(dep_b).unwrap();
        let arr_val = arr.commit().unwrap();
        let obj = read_obj(&w, arr_val).unwrap();
        assert_eq!(obj.count(), 3); // trailing 2 of 4 slots trimmed
    }

    #[test]
    fn over_capacity_append_is_too_big() {
        let mut w = Writer::new(8);
        let mut arr = Builder::new_array(&mut w, &DEPENDENCY_LIST, 1);
        arr.append(Val::new(Tag::Int, 1)).unwrap();
        assert!(matches!(arr.append(Val::new(Tag::Int, 2)), Err(SchemaError::TooBig(_))));
    }

    #[test]
    fn manifest_pre_commit_fills_derived_field() {
        let mut w = Writer::new(8);
        let mut b = Builder::new_object(&mut w, &MANIFEST);
        b.set_blob(1, b"left-pad").unwrap();
        b.set_int(2, 1).unwrap();
        let v = b.commit().unwrap();
        let obj = read_obj(&w, v).unwrap();
        // slot0 + name + version + (NULL) dependencies + pre_commit-derived
        // dependency count: the trailing non-NULL count field keeps the
        // NULL dependencies slot from being trimmed.
        assert_eq!(obj.count(), 5);
        assert_eq!(read_int(&w, obj.field(4)), Some(0));
    }
}
