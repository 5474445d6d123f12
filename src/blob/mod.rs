//! Content-addressed blob storage.
//!
//! Each blob lives at `<root>/<hash[0:2]>/<hash[2:]>-<size>`, fanned out by
//! the first two characters of its base32hex SHA-256 hash. Writes go
//! through a streaming writer that hashes as it writes and finalizes by
//! renaming a tmp file into place, deduplicating on content.

mod blobref;
mod store;
mod writer;

pub use self::blobref::BlobRef;
pub use self::store::BlobStore;
pub use self::writer::BlobWriter;

use std::io::Read;
use std::sync::Arc;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use error::{ErrorKind, Result};

/// The pairing of a `BlobRef` with a runtime handle to its owning store.
/// Only the ref is serialized; the store handle is reattached by the
/// engine (`Row::visit_blobs_mut`) after a record is deserialized.
#[derive(Clone, Debug)]
pub struct Blob {
	blob_ref: BlobRef,
	store: Option<Arc<BlobStore>>,
}

impl Blob {
	/// A blob that already carries its store handle, e.g. right after
	/// `BlobWriter::close()`.
	pub fn new(blob_ref: BlobRef, store: Arc<BlobStore>) -> Blob {
		Blob { blob_ref, store: Some(store) }
	}

	/// A detached blob (no store handle yet); used when deserializing a
	/// record before the engine reattaches the owning store.
	pub fn detached(blob_ref: BlobRef) -> Blob {
		Blob { blob_ref, store: None }
	}

	/// The unset blob (`BlobRef::EMPTY`), detached.
	pub fn unset() -> Blob {
		Blob::detached(BlobRef::empty())
	}

	pub fn blob_ref(&self) -> &BlobRef {
		&self.blob_ref
	}

	pub fn is_unset(&self) -> bool {
		self.blob_ref.is_empty()
	}

	/// Reattaches the owning store. Called by the table engine after load.
	pub fn attach(&mut self, store: Arc<BlobStore>) {
		self.store = Some(store);
	}

	/// Opens a reader over the blob's content. Fails with `InvalidInput` if
	/// no store has been attached yet.
	pub fn open(&self) -> Result<Box<dyn Read>> {
		match &self.store {
			Some(store) => store.open_blob(&self.blob_ref),
			None => bail!(ErrorKind::InvalidInput(
				"blob has no attached store; was it loaded through Table::open_with_blobs?".into()
			)),
		}
	}
}

impl PartialEq for Blob {
	fn eq(&self, other: &Blob) -> bool {
		self.blob_ref == other.blob_ref
	}
}

impl Serialize for Blob {
	fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
		self.blob_ref.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Blob {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Blob, D::Error> {
		BlobRef::deserialize(deserializer).map(Blob::detached)
	}
}
