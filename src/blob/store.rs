use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;

use super::{Blob, BlobRef, BlobWriter};
use error::{Error, ErrorKind, Result};

/// A content-addressed blob store rooted at a directory. Blobs live at
/// `<root>/<hash[0:2]>/<hash[2:]>-<size>`.
pub struct BlobStore {
	root: PathBuf,
	_lock_file: File,
}

impl BlobStore {
	const LOCK_FILE: &'static str = "LOCK";

	/// Opens (creating if absent) a blob store rooted at `root`, holding an
	/// advisory exclusive lock on it for the lifetime of the returned value.
	pub fn open<P: AsRef<Path>>(root: P) -> Result<Arc<BlobStore>> {
		let root = root.as_ref().to_owned();
		fs::create_dir_all(&root)?;

		let lock_path = root.join(Self::LOCK_FILE);
		let lock_file = fs::OpenOptions::new().write(true).create(true).open(&lock_path)?;
		if lock_file.try_lock_exclusive().is_err() {
			warn!("blob store {} is already locked by another handle", root.display());
			bail!(ErrorKind::Locked(lock_path));
		}

		Ok(Arc::new(BlobStore { root, _lock_file: lock_file }))
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Starts writing a new blob.
	pub fn new_blob(self: &Arc<Self>) -> Result<BlobWriter> {
		BlobWriter::new(self.clone())
	}

	/// Writes `content` in one call; a convenience over `new_blob`/`write`/`close`.
	pub fn put(self: &Arc<Self>, content: &[u8]) -> Result<Blob> {
		let mut writer = self.new_blob()?;
		writer.write(content)?;
		writer.close()
	}

	/// Opens a reader over a blob's content. The reserved empty ref reads as
	/// an empty stream with no filesystem access.
	pub fn open_blob(self: &Arc<Self>, blob_ref: &BlobRef) -> Result<Box<dyn Read>> {
		if blob_ref.is_empty() {
			bail!(ErrorKind::InvalidInput("blob ref is unset".into()));
		}
		if blob_ref.is_empty_content() {
			return Ok(Box::new(io::empty()));
		}

		let path = self.path_for(blob_ref);
		let file = File::open(&path).map_err(|e| match e.kind() {
			io::ErrorKind::NotFound => {
				Error::from(ErrorKind::NotFound(blob_ref.to_string()))
			}
			_ => Error::from(e),
		})?;
		Ok(Box::new(BufReader::new(file)))
	}

	/// Removes a single blob by ref. A no-op for the reserved empty ref.
	/// Missing files are not an error, matching the dedup-on-write contract:
	/// a ref may legitimately point at a blob another caller already removed.
	pub fn remove(&self, blob_ref: &BlobRef) -> Result<()> {
		if blob_ref.is_empty() || blob_ref.is_empty_content() {
			return Ok(());
		}

		match fs::remove_file(self.path_for(blob_ref)) {
			Ok(()) => Ok(()),
			Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	/// Sweeps the store, deleting every on-disk blob whose ref is not in
	/// `live`. Entries that are not a valid two-character fan-out directory
	/// (and not `tmp` or the lock file) are removed outright, as are stray
	/// `.tmp` files left behind by a crashed writer. Fan-out directories
	/// left empty by the sweep are removed. Collects every per-entry error
	/// encountered rather than stopping at the first one, surfacing them
	/// together as `Aggregate` if any occurred. The caller must only invoke
	/// this when no writes are in progress.
	pub fn gc(&self, live: &HashSet<BlobRef>) -> Result<u64> {
		let mut removed = 0u64;
		let mut errors = Vec::new();

		let entries = match fs::read_dir(&self.root) {
			Ok(entries) => entries,
			Err(e) => return Err(e.into()),
		};

		for entry in entries {
			let entry = match entry {
				Ok(entry) => entry,
				Err(e) => {
					errors.push(e.into());
					continue;
				}
			};

			let path = entry.path();
			let name = entry.file_name();
			let name = name.to_string_lossy().into_owned();

			if name == Self::LOCK_FILE {
				continue;
			}

			if name == "tmp" {
				if let Err(e) = self.gc_tmp_dir(&path) {
					errors.push(e);
				}
				continue;
			}

			if path.is_dir() && is_fan_out_name(&name) {
				match self.gc_fan_out_dir(&path, &name, live) {
					Ok(n) => removed += n,
					Err(e) => errors.push(e),
				}
				continue;
			}

			// Not a recognized entry: remove it recursively.
			let remove_result = if path.is_dir() { fs::remove_dir_all(&path) } else { fs::remove_file(&path) };
			if let Err(e) = remove_result {
				errors.push(e.into());
			}
		}

		if errors.is_empty() {
			debug!("gc on {} removed {} blob(s)", self.root.display(), removed);
			Ok(removed)
		} else {
			bail!(ErrorKind::Aggregate(errors));
		}
	}

	fn gc_tmp_dir(&self, dir_path: &Path) -> Result<()> {
		let entries = match fs::read_dir(dir_path) {
			Ok(entries) => entries,
			Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
			Err(e) => return Err(e.into()),
		};

		for entry in entries {
			let entry = entry?;
			let name = entry.file_name();
			if name.to_string_lossy().ends_with(".tmp") {
				fs::remove_file(entry.path())?;
			}
		}

		Ok(())
	}

	fn gc_fan_out_dir(&self, dir_path: &Path, fan_out: &str, live: &HashSet<BlobRef>) -> Result<u64> {
		let mut removed = 0u64;
		let mut remaining = 0u64;

		for entry in fs::read_dir(dir_path)? {
			let entry = entry?;
			let path = entry.path();

			if path.is_dir() {
				fs::remove_dir_all(&path)?;
				continue;
			}

			let name = entry.file_name();
			let name = name.to_string_lossy();

			let full_ref = match parse_file_name(fan_out, &name) {
				Some(r) => r,
				None => {
					fs::remove_file(&path)?;
					continue;
				}
			};

			if live.contains(&full_ref) {
				remaining += 1;
			} else {
				fs::remove_file(&path)?;
				removed += 1;
			}
		}

		if remaining == 0 {
			let _ = fs::remove_dir(dir_path);
		}

		Ok(removed)
	}

	pub(super) fn finalize_tmp(&self, tmp_path: &Path, blob_ref: &BlobRef) -> Result<()> {
		let dest = self.path_for(blob_ref);
		if dest.exists() {
			debug!("dedup hit finalizing {}", blob_ref);
			fs::remove_file(tmp_path)?;
			return Ok(());
		}

		if let Some(parent) = dest.parent() {
			fs::create_dir_all(parent)?;
		}

		match fs::rename(tmp_path, &dest) {
			Ok(()) => Ok(()),
			Err(e) => {
				// Lost a race with a concurrent writer finalizing the same
				// content; the winning file is equivalent, so treat as dedup.
				if dest.exists() {
					let _ = fs::remove_file(tmp_path);
					Ok(())
				} else {
					Err(e.into())
				}
			}
		}
	}

	fn path_for(&self, blob_ref: &BlobRef) -> PathBuf {
		self.root.join(blob_ref.fan_out()).join(format!("{}-{}", blob_ref.hash_remainder(), blob_ref.size_str()))
	}
}

fn is_fan_out_name(name: &str) -> bool {
	name.len() == 2 && name.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'V').contains(&b))
}

fn parse_file_name(fan_out: &str, file_name: &str) -> Option<BlobRef> {
	let dash = file_name.rfind('-')?;
	let (remainder, size_part) = file_name.split_at(dash);
	let size_part = &size_part[1..];
	let candidate = format!("sha256:{}{}-{}", fan_out, remainder, size_part);
	BlobRef::parse(candidate).ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Read as _;
	use std::sync::Once;
	use tempdir::TempDir;

	static INIT: Once = Once::new();

	fn setup() {
		INIT.call_once(|| {
			let _ = env_logger::try_init();
		});
	}

	fn store() -> (TempDir, Arc<BlobStore>) {
		setup();
		let dir = TempDir::new("blobstore").unwrap();
		let store = BlobStore::open(dir.path()).unwrap();
		(dir, store)
	}

	#[test]
	fn put_and_open_round_trips() {
		let (_dir, store) = store();
		let blob = store.put(b"hello, world!").unwrap();
		let mut buf = Vec::new();
		blob.open().unwrap().read_to_end(&mut buf).unwrap();
		assert_eq!(buf, b"hello, world!");
	}

	#[test]
	fn empty_content_returns_reserved_ref_with_no_file() {
		let (_dir, store) = store();
		let blob = store.put(b"").unwrap();
		assert!(blob.blob_ref().is_empty_content());

		let mut entries = fs::read_dir(store.root()).unwrap().filter(|e| {
			let name = e.as_ref().unwrap().file_name();
			name != "LOCK" && name != "tmp"
		});
		assert!(entries.next().is_none());
	}

	#[test]
	fn duplicate_content_dedups_to_one_file() {
		let (_dir, store) = store();
		let a = store.put(b"same bytes").unwrap();
		let b = store.put(b"same bytes").unwrap();
		assert_eq!(a.blob_ref(), b.blob_ref());

		let fan_out_dir = store.root().join(a.blob_ref().fan_out());
		assert_eq!(fs::read_dir(fan_out_dir).unwrap().count(), 1);
	}

	#[test]
	fn second_open_of_same_root_is_locked() {
		let dir = TempDir::new("blobstore").unwrap();
		let _first = BlobStore::open(dir.path()).unwrap();
		assert!(BlobStore::open(dir.path()).is_err());
	}

	#[test]
	fn gc_removes_unreferenced_blobs_and_keeps_live_ones() {
		let (_dir, store) = store();
		let keep = store.put(b"keep me").unwrap();
		let discard = store.put(b"drop me").unwrap();

		let mut live = HashSet::new();
		live.insert(keep.blob_ref().clone());

		let removed = store.gc(&live).unwrap();
		assert_eq!(removed, 1);
		assert!(store.open_blob(discard.blob_ref()).is_err());
		assert!(store.open_blob(keep.blob_ref()).is_ok());
	}

	#[test]
	fn remove_missing_blob_is_not_an_error() {
		let (_dir, store) = store();
		let blob = store.put(b"gone already").unwrap();
		store.remove(blob.blob_ref()).unwrap();
		store.remove(blob.blob_ref()).unwrap();
	}

	#[test]
	fn gc_sweeps_stray_tmp_files_and_foreign_entries() {
		let (_dir, store) = store();
		let keep = store.put(b"keep me").unwrap();

		fs::create_dir_all(store.root().join("tmp")).unwrap();
		fs::write(store.root().join("tmp").join("orphan.tmp"), b"junk").unwrap();
		fs::write(store.root().join("not-a-fanout-dir"), b"junk").unwrap();
		fs::create_dir_all(store.root().join("zz")).unwrap();
		fs::write(store.root().join("zz").join("garbage"), b"junk").unwrap();

		let mut live = HashSet::new();
		live.insert(keep.blob_ref().clone());
		store.gc(&live).unwrap();

		assert!(store.root().join("LOCK").exists());
		assert_eq!(fs_read_dir_count(&store.root().join("tmp")), 0);
		assert!(!store.root().join("not-a-fanout-dir").exists());
		assert!(!store.root().join("zz").exists());
		assert!(store.open_blob(keep.blob_ref()).is_ok());
	}

	fn fs_read_dir_count(path: &Path) -> usize {
		match fs::read_dir(path) {
			Ok(entries) => entries.count(),
			Err(_) => 0,
		}
	}
}
