use serde::de::DeserializeOwned;
use serde::Serialize;

use blob::BlobStore;
use error::Result;
use id::Id;
use std::sync::Arc;

/// A record type stored in a `Table`.
///
/// Implementations are cloned freely by the engine, so the in-memory cache
/// is never aliased with a value a caller holds.
pub trait Row: Clone + Send + Sync + 'static + Serialize + DeserializeOwned {
	/// The record's primary key. Must be non-zero for a row the engine is
	/// willing to persist.
	fn id(&self) -> Id;

	/// Structural invariants enforced on append and on the mutated clone
	/// passed to `modify`. The engine surfaces a failure as `InvalidInput`.
	fn validate(&self) -> Result<()>;

	/// Reattaches a blob store handle to every embedded `Blob` field. Called
	/// by the table immediately after a row is deserialized from disk.
	/// Record types with no `Blob` fields use the default no-op.
	fn visit_blobs_mut(&mut self, _store: &Arc<BlobStore>) {}
}
