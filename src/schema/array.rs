//! In-place array mutation: `sort`, `sort_unique`, and binary-search lookup.
//! These are the only operations that rewrite bytes already written to a
//! writer's slab; everything else in the dedup store is append-only.

use std::cmp::Ordering;

use crate::dedup::Writer;
use crate::value::{self, Val};

use super::{kind_compare, Kind, SchemaError};

fn entries(writer: &Writer, arr: Val) -> Result<(u32, Vec<Val>), SchemaError> {
    let obj = value::read_obj(writer, arr).ok_or_else(|| SchemaError::bad_format("not an OBJECT/ARRAY value"))?;
    let count = obj.count();
    let items = (1..count).map(|i| obj.field(i)).collect();
    Ok((arr.payload(), items))
}

/// Sort an array's elements in place, by `element_kind`'s ordering.
pub fn sort(writer: &mut Writer, element_kind: &'static Kind, arr: Val) -> Result<(), SchemaError> {
    let (offset, mut items) = entries(writer, arr)?;
    items.sort_by(|a, b| kind_compare(element_kind, writer, *a, writer, *b));
    for (i, v) in items.into_iter().enumerate() {
        writer.patch_word(offset + (i as u32 + 1) * 4, v.to_wire());
    }
    Ok(())
}

/// Sort, then collapse adjacent equal elements, shrinking the array's
/// recorded count. Bytes past the new count are left in place but are no
/// longer reachable through `count`-bounded reads.
pub fn sort_unique(writer: &mut Writer, element_kind: &'static Kind, arr: Val) -> Result<(), SchemaError> {
    sort(writer, element_kind, arr)?;
    let (offset, items) = entries(writer, arr)?;

    let mut deduped: Vec<Val> = Vec::with_capacity(items.len());
    for v in items {
        let keep = match deduped.last() {
            Some(last) => kind_compare(element_kind, writer, *last, writer, v) != Ordering::Equal,
            None => true,
        };
        if keep {
            deduped.push(v);
        }
    }

    for (i, v) in deduped.iter().enumerate() {
        writer.patch_word(offset + (i as u32 + 1) * 4, v.to_wire());
    }
    writer.patch_word(offset, deduped.len() as u32 + 1);
    Ok(())
}

/// Binary search for `needle` in a sorted array.
///
/// With `cur == 0`, returns the leftmost index whose element compares equal
/// to `needle`, or `-1` if none does. With `cur > 0`, the caller is already
/// iterating an equal-range starting at a prior `array_find` result: this
/// checks only whether `cur + 1` is also equal, returning it if so and `-1`
/// otherwise. Iterating `cur = array_find(..., 0, ...)` and then repeatedly
/// `array_find(..., cur, ...)` visits every element equal to `needle`.
pub fn array_find(
    db: &dyn crate::value::PayloadSource,
    element_kind: &'static Kind,
    arr: Val,
    cur: i64,
    needle_db: &dyn crate::value::PayloadSource,
    needle: Val,
) -> i64 {
    let obj = match value::read_obj(db, arr) {
        Some(o) => o,
        None => return -1,
    };
    let count = obj.count();

    if cur > 0 {
        let next = cur as u32 + 1;
        if next < count && kind_compare(element_kind, db, obj.field(next), needle_db, needle) == Ordering::Equal {
            return next as i64;
        }
        return -1;
    }

    let (mut lo, mut hi) = (1u32, count);
    let mut found = None;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match kind_compare(element_kind, db, obj.field(mid), needle_db, needle) {
            Ordering::Equal => {
                found = Some(mid);
                hi = mid;
            }
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }
    found.map(|i| i as i64).unwrap_or(-1)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{Builder, Field, ObjectKind, ObjectSchema};
    use crate::value::Tag;

    fn int_array(writer: &mut Writer, values: &[u32]) -> Val {
        static INT_FIELDS: [Field; 1] = [Field { name: "n", kind: &Kind::Int(crate::schema::default_int()) }];
        static INTS: ObjectSchema = ObjectSchema {
            kind: ObjectKind::Array,
            fields: &INT_FIELDS,
            fromstring: None,
            pre_commit: None,
            compare: None,
            get_default_int: None,
        };
        let mut b = Builder::new_array(writer, &INTS, values.len());
        for &v in values {
            b.append(Val::new(Tag::Int, v)).unwrap();
        }
        b.commit().unwrap()
    }

    #[test]
    fn sort_orders_elements_ascending() {
        let mut w = Writer::new(8);
        let arr = int_array(&mut w, &[3, 1, 2]);
        const KIND: Kind = Kind::Int(crate::schema::default_int());
        let kind = &KIND;
        sort(&mut w, kind, arr).unwrap();
        let obj = value::read_obj(&w, arr).unwrap();
        let got: Vec<u32> = (1..obj.count()).map(|i| value::read_int(&w, obj.field(i)).unwrap()).collect();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn sort_unique_collapses_duplicates_and_shrinks_count() {
        let mut w = Writer::new(8);
        let arr = int_array(&mut w, &[3, 1, 2, 3, 1]);
        const KIND: Kind = Kind::Int(crate::schema::default_int());
        let kind = &KIND;
        sort_unique(&mut w, kind, arr).unwrap();
        let obj = value::read_obj(&w, arr).unwrap();
        assert_eq!(obj.count(), 4); // slot0 + {1,2,3}
        let got: Vec<u32> = (1..obj.count()).map(|i| value::read_int(&w, obj.field(i)).unwrap()).collect();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn array_find_locates_leftmost_and_walks_equal_range() {
        let mut w = Writer::new(8);
        let arr = int_array(&mut w, &[1, 2, 2, 2, 3]);
        const KIND: Kind = Kind::Int(crate::schema::default_int());
        let kind = &KIND;
        let needle = Val::new(Tag::Int, 2);
        let first = array_find(&w, kind, arr, 0, &w, needle);
        assert_eq!(first, 2);
        let second = array_find(&w, kind, arr, first, &w, needle);
        assert_eq!(second, 3);
        let third = array_find(&w, kind, arr, second, &w, needle);
        assert_eq!(third, 4);
        let fourth = array_find(&w, kind, arr, third, &w, needle);
        assert_eq!(fourth, -1);
    }

    #[test]
    fn array_find_missing_needle_is_negative_one() {
        let mut w = Writer::new(8);
        let arr = int_array(&mut w, &[1, 2, 3]);
        const KIND: Kind = Kind::Int(crate::schema::default_int());
        let kind = &KIND;
        let needle = Val::new(Tag::Int, 9);
        assert_eq!(array_find(&w, kind, arr, 0, &w, needle), -1);
    }
}
