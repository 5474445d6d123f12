use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::{Blob, BlobRef, BlobStore};
use error::{ErrorKind, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A streaming writer over a new blob. Hashes content as it is written and,
/// on `close()`, finalizes the blob by renaming its tmp file into its
/// content-addressed location.
///
/// If dropped without `close()` or `abort()`, the tmp file is removed on a
/// best-effort basis so a panicking caller never leaves debris behind.
pub struct BlobWriter {
	store: Arc<BlobStore>,
	tmp_path: Option<PathBuf>,
	file: Option<File>,
	hasher: Sha256,
	size: u64,
}

impl BlobWriter {
	pub(super) fn new(store: Arc<BlobStore>) -> Result<BlobWriter> {
		let tmp_dir = store.root().join("tmp");
		fs::create_dir_all(&tmp_dir)?;

		let tmp_path = tmp_dir.join(unique_tmp_name());
		let file = File::create(&tmp_path)?;

		Ok(BlobWriter {
			store,
			tmp_path: Some(tmp_path),
			file: Some(file),
			hasher: Sha256::new(),
			size: 0,
		})
	}

	/// Appends bytes to the blob, updating the running hash.
	pub fn write(&mut self, buf: &[u8]) -> Result<()> {
		let file = self.file.as_mut().ok_or(ErrorKind::Closed)?;
		file.write_all(buf)?;
		self.hasher.update(buf);
		self.size += buf.len() as u64;
		Ok(())
	}

	/// Finalizes the blob: if nothing was written, removes the tmp file and
	/// returns the reserved empty-content ref with no on-disk artifact.
	/// Otherwise renames the tmp file into its content-addressed location,
	/// deduplicating if a blob with that hash already exists.
	pub fn close(mut self) -> Result<Blob> {
		let tmp_path = self.tmp_path.take().ok_or(ErrorKind::Closed)?;
		let mut file = self.file.take().expect("tmp_path and file are set together");
		file.flush()?;
		drop(file);

		if self.size == 0 {
			fs::remove_file(&tmp_path)?;
			return Ok(Blob::new(BlobRef::empty(), self.store.clone()));
		}

		let digest = self.hasher.clone().finalize();
		let blob_ref = BlobRef::from_digest(&digest, self.size);
		self.store.finalize_tmp(&tmp_path, &blob_ref)?;

		Ok(Blob::new(blob_ref, self.store.clone()))
	}

	/// Discards the in-progress blob, removing its tmp file.
	pub fn abort(mut self) -> Result<()> {
		self.remove_tmp()
	}

	fn remove_tmp(&mut self) -> Result<()> {
		if let Some(path) = self.tmp_path.take() {
			self.file.take();
			match fs::remove_file(&path) {
				Ok(()) => {}
				Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
				Err(e) => return Err(e.into()),
			}
		}
		Ok(())
	}
}

impl Drop for BlobWriter {
	fn drop(&mut self) {
		let _ = self.remove_tmp();
	}
}

fn unique_tmp_name() -> String {
	let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
	format!("{}-{}", std::process::id(), n)
}
