//! TBDB: a typed, schema-driven binary database format for package
//! manifests and similar structured metadata.
//!
//! A database is a little-endian, 8-byte-aligned block stream: a file
//! header, one content block holding a deduplicated tree of tagged 32-bit
//! values, zero or more detached signature blocks, and zero or more bulk
//! data blocks. [`schema`] describes the shape of the value tree;
//! [`reader`] and [`stream_reader`] read it back; [`signing`] produces and
//! checks the detached signatures; [`container`] is the framing underneath
//! all three.

pub mod container;
pub mod data_blocks;
pub mod dedup;
pub mod reader;
pub mod schema;
pub mod signing;
pub mod stream_reader;
pub mod value;

mod error;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
