//! An embedded, file-backed storage engine for structured records and
//! content-addressed blobs.
//!
//! Each table is one append-friendly line-delimited JSON file: a schema
//! header on line 1, one JSON record per line after. Records are generic
//! over a `Row` implementation and kept in an in-memory cache ordered by a
//! time-sortable [`id::Id`], with an observer protocol that keeps secondary
//! indexes consistent with every append/modify/delete.
//!
//! Binary content lives in a separate content-addressed blob store, keyed by
//! the SHA-256 of its bytes, so large opaque payloads never bloat a table
//! file.

#![warn(missing_docs)]

#[macro_use]
extern crate error_chain;
extern crate data_encoding;
extern crate fs2;
#[macro_use]
extern crate log;
extern crate once_cell;
extern crate parking_lot;
extern crate serde;
extern crate serde_json;
extern crate sha2;
#[cfg(test)]
extern crate env_logger;
#[cfg(test)]
#[macro_use]
extern crate matches;
#[cfg(test)]
#[macro_use]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

mod blob;
mod error;
mod id;
mod index;
mod schema;
mod table;

pub use blob::{Blob, BlobRef, BlobStore, BlobWriter};
pub use error::{Error, ErrorKind, Result};
pub use id::{new_id, new_id_sliced, Id};
pub use index::{Index, UniqueIndex};
pub use schema::{Column, ColumnType, Describe, Schema};
pub use table::{Observer, Row, Table};
