//! A worked example schema: a package manifest with a name, a version, and
//! a list of dependency records, each itself a (name, version) pair. Used
//! across the test suite as the canonical schema the rest of the crate
//! exercises, the way a package database's schema wires `fromstring`,
//! `compare`, and `pre_commit` hooks together over a handful of scalar and
//! object fields.

use crate::value;

use super::builder::Builder;
use super::scalars::{default_blob, default_int};
use super::{Field, Kind, ObjectKind, ObjectSchema, SchemaError};

/// Fields: 1 = name (blob), 2 = version (int).
pub static DEPENDENCY_FIELDS: [Field; 2] = [
    Field { name: "name", kind: &Kind::Blob(default_blob()) },
    Field { name: "version", kind: &Kind::Int(default_int()) },
];

pub static DEPENDENCY: ObjectSchema = ObjectSchema {
    kind: ObjectKind::Object,
    fields: &DEPENDENCY_FIELDS,
    fromstring: Some(dependency_fromstring),
    pre_commit: None,
    compare: None,
    get_default_int: None,
};

pub static DEPENDENCY_ELEMENT: [Field; 1] = [Field { name: "dependency", kind: &Kind::Object(&DEPENDENCY) }];

pub static DEPENDENCY_LIST: ObjectSchema = ObjectSchema {
    kind: ObjectKind::Array,
    fields: &DEPENDENCY_ELEMENT,
    fromstring: None,
    pre_commit: None,
    compare: None,
    get_default_int: None,
};

/// Fields: 1 = name (blob), 2 = version (int), 3 = dependencies (array),
/// 4 = dependency count (int, derived by `pre_commit`).
pub static MANIFEST_FIELDS: [Field; 4] = [
    Field { name: "name", kind: &Kind::Blob(default_blob()) },
    Field { name: "version", kind: &Kind::Int(default_int()) },
    Field { name: "dependencies", kind: &Kind::Array(&DEPENDENCY_LIST) },
    Field { name: "dependency_count", kind: &Kind::Int(default_int()) },
];

pub static MANIFEST: ObjectSchema = ObjectSchema {
    kind: ObjectKind::Object,
    fields: &MANIFEST_FIELDS,
    fromstring: None,
    pre_commit: Some(manifest_pre_commit),
    compare: None,
    get_default_int: None,
};

/// Parses `name@version`, e.g. `"left-pad@1"`.
fn dependency_fromstring(b: &mut Builder, text: &str) -> Result<(), SchemaError> {
    let (name, version) = text
        .split_once('@')
        .ok_or_else(|| SchemaError::bad_format(format!("dependency literal missing '@': {text:?}")))?;
    b.set_blob(1, name.as_bytes())?;
    b.set_int(2, version.trim().parse().map_err(|_| SchemaError::bad_format(format!("bad version: {version:?}")))?)?;
    Ok(())
}

/// Fills field 4 (`dependency_count`) from the length of field 3
/// (`dependencies`), which must already have been set by the time
/// `commit` runs `pre_commit`.
fn manifest_pre_commit(b: &mut Builder) -> Result<(), SchemaError> {
    let deps = b.get(3);
    let count = if deps.is_null() {
        0
    } else {
        let writer = &*b.writer();
        value::read_obj(writer, deps).map(|o| o.count().saturating_sub(1)).unwrap_or(0)
    };
    b.set_int(4, count)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dedup::Writer;
    use crate::value::{read_blob, read_int, read_obj};

    #[test]
    fn dependency_fromstring_splits_name_and_version() {
        let mut w = Writer::new(8);
        let mut b = Builder::new_object(&mut w, &DEPENDENCY);
        (DEPENDENCY.fromstring.unwrap())(&mut b, "left-pad@1").unwrap();
        let v = b.commit().unwrap();
        let obj = read_obj(&w, v).unwrap();
        assert_eq!(read_blob(&w, obj.field(1)), Some(&b"left-pad"[..]));
        assert_eq!(read_int(&w, obj.field(2)), Some(1));
    }

    #[test]
    fn manifest_with_dependencies_derives_count() {
        let mut w = Writer::new(8);

        let mut dep_builder = Builder::new_object(&mut w, &DEPENDENCY);
        dep_builder.set_blob(1, b"left-pad").unwrap();
        dep_builder.set_int(2, 1).unwrap();
        let dep_a = dep_builder.commit().unwrap();
        dep_builder.set_blob(1, b"right-pad").unwrap();
        dep_builder.set_int(2, 2).unwrap();
        let dep_b = dep_builder.commit().unwrap();

        let mut list_builder = Builder::new_array(&mut w, &DEPENDENCY_LIST, 2);
        list_builder.append(dep_a).unwrap();
        list_builder.append(dep_b).unwrap();
        let deps = list_builder.commit().unwrap();

        let mut manifest_builder = Builder::new_object(&mut w, &MANIFEST);
        manifest_builder.set_blob(1, b"my-package").unwrap();
        manifest_builder.set_int(2, 3).unwrap();
        manifest_builder.set_obj(3, deps).unwrap();
        let manifest = manifest_builder.commit().unwrap();

        let obj = read_obj(&w, manifest).unwrap();
        assert_eq!(read_blob(&w, obj.field(1)), Some(&b"my-package"[..]));
        assert_eq!(read_int(&w, obj.field(4)), Some(2));
    }
}
