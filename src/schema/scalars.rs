//! Default scalar comparators and `fromstring` hooks, shared by every
//! schema that does not need a bespoke ordering or text syntax.

use std::cmp::Ordering;

use crate::dedup::{Alignment, Writer};
use crate::value::{self, PayloadSource, Tag, Val};

use super::{ScalarSchema, SchemaError};

fn compare_int(db1: &dyn PayloadSource, v1: Val, db2: &dyn PayloadSource, v2: Val) -> Ordering {
    value::read_int(db1, v1).unwrap_or(0).cmp(&value::read_int(db2, v2).unwrap_or(0))
}

fn compare_blob(db1: &dyn PayloadSource, v1: Val, db2: &dyn PayloadSource, v2: Val) -> Ordering {
    value::read_blob(db1, v1).unwrap_or(&[]).cmp(value::read_blob(db2, v2).unwrap_or(&[]))
}

fn fromstring_int(writer: &mut Writer, text: &str) -> Result<Val, SchemaError> {
    let n: u32 = text
        .trim()
        .parse()
        .map_err(|_| SchemaError::bad_format(format!("not an integer: {text:?}")))?;
    write_int(writer, n)
}

fn fromstring_blob(writer: &mut Writer, text: &str) -> Result<Val, SchemaError> {
    write_blob(writer, text.as_bytes())
}

/// Intern `n` as a `Val`, picking `INT` for values that fit the 28-bit
/// immediate payload and `INT_32` otherwise.
pub fn write_int(writer: &mut Writer, n: u32) -> Result<Val, SchemaError> {
    let max_immediate = (1u32 << value::PAYLOAD_BITS) - 1;
    if n <= max_immediate {
        Ok(Val::new(Tag::Int, n))
    } else {
        let offset = writer.intern(&[&n.to_le_bytes()], Alignment::Four)?;
        Ok(Val::new(Tag::Int32, offset))
    }
}

/// Intern `bytes` as a length-prefixed blob, picking the narrowest
/// length-prefix width (`BLOB_8`, `BLOB_16`, then `BLOB_32`) that fits.
pub fn write_blob(writer: &mut Writer, bytes: &[u8]) -> Result<Val, SchemaError> {
    if bytes.len() <= u8::MAX as usize {
        let len = [bytes.len() as u8];
        let offset = writer.intern(&[&len, bytes], Alignment::One)?;
        Ok(Val::new(Tag::Blob8, offset))
    } else if bytes.len() <= u16::MAX as usize {
        let len = (bytes.len() as u16).to_le_bytes();
        let offset = writer.intern(&[&len, bytes], Alignment::Two)?;
        Ok(Val::new(Tag::Blob16, offset))
    } else {
        return Err(SchemaError::TooBig(format!("blob of {} bytes exceeds BLOB_16", bytes.len())));
    }
}

/// Default ordering and text parsing for an integer field.
pub const fn default_int() -> ScalarSchema {
    ScalarSchema { compare: compare_int, fromstring: fromstring_int }
}

/// Default lexicographic ordering and UTF-8 text parsing for a blob field.
pub const fn default_blob() -> ScalarSchema {
    ScalarSchema { compare: compare_blob, fromstring: fromstring_blob }
}
