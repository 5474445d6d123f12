use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::RwLock;

use super::{Observer, Row};
use blob::BlobStore;
use error::{Error, ErrorKind, Result};
use id::Id;
use schema::{Describe, Schema};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

struct Inner<T: Row> {
	rows: Vec<T>,
	observers: Vec<Arc<dyn Observer<T>>>,
	header_written: bool,
}

/// A generic, in-memory-cached, mutex-protected, order-preserving table of
/// records keyed by a sortable [`Id`](crate::id::Id). Backed by one
/// append-friendly line-delimited JSON file with a schema header on line 1.
pub struct Table<T: Row> {
	path: PathBuf,
	schema: Schema,
	blob_store: Option<Arc<BlobStore>>,
	inner: RwLock<Inner<T>>,
	_lock_file: File,
}

impl<T: Row + Describe> Table<T> {
	/// Opens (or creates, on first append) a table with no `Blob` fields.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Table<T>>> {
		Self::open_internal(path.as_ref(), None)
	}

	/// Opens a table whose rows carry `Blob` fields, reattaching `store` to
	/// every row deserialized from disk.
	pub fn open_with_blobs<P: AsRef<Path>>(path: P, store: Arc<BlobStore>) -> Result<Arc<Table<T>>> {
		Self::open_internal(path.as_ref(), Some(store))
	}

	fn open_internal(path: &Path, blob_store: Option<Arc<BlobStore>>) -> Result<Arc<Table<T>>> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}

		let lock_path = lock_path_for(path);
		let lock_file = OpenOptions::new().write(true).create(true).open(&lock_path)?;
		if let Err(_e) = lock_file.try_lock_exclusive() {
			warn!("table {} is already locked by another handle", path.display());
			bail!(ErrorKind::Locked(lock_path));
		}

		let (schema, mut rows, header_written) = match load_lines(path)? {
			Some(lines) => {
				let mut lines = lines.into_iter();
				let header_line = lines.next().ok_or_else(|| {
					Error::from(ErrorKind::SchemaInvalid(path.to_owned(), "file has no header line".into()))
				})?;
				let schema: Schema = serde_json::from_str(&header_line).map_err(|e| {
					Error::from(ErrorKind::SchemaInvalid(path.to_owned(), e.to_string()))
				})?;
				schema.validate(path)?;

				let mut rows = Vec::new();
				for line in lines {
					let row: T = serde_json::from_str(&line)
						.map_err(|e| Error::from(ErrorKind::Corrupt(path.to_owned(), e.to_string())))?;
					if row.id().is_zero() {
						bail!(ErrorKind::Corrupt(path.to_owned(), "row has a zero id".into()));
					}
					row.validate().map_err(|e| {
						Error::from(ErrorKind::Corrupt(path.to_owned(), format!("row failed validation: {}", e)))
					})?;
					rows.push(row);
				}
				(schema, rows, true)
			}
			None => (Schema::new(T::columns()), Vec::new(), false),
		};

		if let Some(store) = &blob_store {
			for row in &mut rows {
				row.visit_blobs_mut(store);
			}
		}

		if !is_sorted_by_id(&rows) {
			debug!("table {} had out-of-order rows on load; sorting in memory", path.display());
			rows.sort_by_key(Row::id);
		}

		for pair in rows.windows(2) {
			if pair[0].id() == pair[1].id() {
				bail!(ErrorKind::Corrupt(path.to_owned(), format!("duplicate id {}", pair[0].id())));
			}
		}

		Ok(Arc::new(Table {
			path: path.to_owned(),
			schema,
			blob_store,
			inner: RwLock::new(Inner { rows, observers: Vec::new(), header_written }),
			_lock_file: lock_file,
		}))
	}
}

impl<T: Row> Table<T> {
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	/// The blob store this table reattaches to `Blob` fields, if opened
	/// through [`Table::open_with_blobs`].
	pub fn blob_store(&self) -> Option<&Arc<BlobStore>> {
		self.blob_store.as_ref()
	}

	pub fn len(&self) -> usize {
		self.inner.read().rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A clone of the row with the largest id, or `None` if the table is empty.
	pub fn last(&self) -> Option<T> {
		self.inner.read().rows.last().cloned()
	}

	/// A clone of the row with the given id, or `None` if absent.
	pub fn get(&self, id: Id) -> Option<T> {
		let inner = self.inner.read();
		find(&inner.rows, id).map(|idx| inner.rows[idx].clone())
	}

	/// A snapshot, taken at call time, of every row with id strictly greater
	/// than `start_id`, in ascending order. `Id::ZERO` means "from the start".
	pub fn iter(&self, start_id: Id) -> Vec<T> {
		let inner = self.inner.read();
		let start = inner.rows.partition_point(|r| r.id() <= start_id);
		inner.rows[start..].to_vec()
	}

	/// Validates and persists `row`. `row.id()` must be non-zero and
	/// strictly greater than `last()`'s id.
	pub fn append(&self, row: T) -> Result<()> {
		if row.id().is_zero() {
			bail!(ErrorKind::InvalidInput("row id must not be zero".into()));
		}
		validate_row(&row)?;

		let mut inner = self.inner.write();
		if let Some(last) = inner.rows.last() {
			if row.id() <= last.id() {
				bail!(ErrorKind::AlreadyExists(row.id().to_string()));
			}
		}

		let line = serde_json::to_string(&row).map_err(|e| Error::from(io::Error::new(io::ErrorKind::Other, e)))?;

		let result = (|| -> Result<()> {
			let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
			if !inner.header_written {
				writeln!(file, "{}", serde_json::to_string(&self.schema).expect("schema serializes"))?;
			}
			writeln!(file, "{}", line)?;
			file.flush()?;
			Ok(())
		})();

		match result {
			Ok(()) => {
				inner.header_written = true;
				inner.rows.push(row.clone());
				for observer in &inner.observers {
					observer.on_append(&row);
				}
				Ok(())
			}
			Err(e) => {
				warn!("append to {} failed: {}", self.path.display(), e);
				Err(e)
			}
		}
	}

	/// Applies `f` to a clone of the row with id `id`; persists the result if
	/// `f` succeeds and the mutated clone still validates. Leaves the table
	/// unchanged if `f` errors or the mutated clone fails validation.
	pub fn modify<F>(&self, id: Id, f: F) -> Result<T>
	where
		F: FnOnce(&mut T) -> Result<()>,
	{
		let mut inner = self.inner.write();
		let idx = find(&inner.rows, id).ok_or_else(|| Error::from(ErrorKind::NotFound(id.to_string())))?;

		let prev = inner.rows[idx].clone();
		let mut curr = prev.clone();
		f(&mut curr)?;
		validate_row(&curr)?;

		let mut rewritten = inner.rows.clone();
		rewritten[idx] = curr.clone();

		match self.rewrite(&rewritten) {
			Ok(()) => {
				inner.rows[idx] = curr.clone();
				for observer in &inner.observers {
					observer.on_update(&prev, &curr);
				}
				Ok(curr)
			}
			Err(e) => {
				warn!("modify of {} in {} failed: {}", id, self.path.display(), e);
				Err(e)
			}
		}
	}

	/// Removes the row with id `id`, returning it.
	pub fn delete(&self, id: Id) -> Result<T> {
		let mut inner = self.inner.write();
		let idx = find(&inner.rows, id).ok_or_else(|| Error::from(ErrorKind::NotFound(id.to_string())))?;

		let mut rewritten = inner.rows.clone();
		let removed = rewritten.remove(idx);

		match self.rewrite(&rewritten) {
			Ok(()) => {
				inner.rows.remove(idx);
				for observer in &inner.observers {
					observer.on_delete(id, &removed);
				}
				Ok(removed)
			}
			Err(e) => {
				warn!("delete of {} in {} failed: {}", id, self.path.display(), e);
				Err(e)
			}
		}
	}

	/// Registers `observer`, then replays every current row to it as a
	/// sequence of `on_append` calls so it starts in sync.
	pub fn add_observer(&self, observer: Arc<dyn Observer<T>>) {
		let mut inner = self.inner.write();
		for row in &inner.rows {
			observer.on_append(row);
		}
		inner.observers.push(observer);
	}

	fn rewrite(&self, rows: &[T]) -> Result<()> {
		let tmp_path = tmp_path_for(&self.path);

		let write_result = (|| -> Result<()> {
			let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp_path)?;
			writeln!(file, "{}", serde_json::to_string(&self.schema).expect("schema serializes"))?;
			for row in rows {
				writeln!(file, "{}", serde_json::to_string(row).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?)?;
			}
			file.flush()?;
			Ok(())
		})();

		if let Err(e) = write_result {
			let _ = fs::remove_file(&tmp_path);
			return Err(e);
		}

		if let Err(e) = fs::rename(&tmp_path, &self.path) {
			let _ = fs::remove_file(&tmp_path);
			return Err(e.into());
		}

		Ok(())
	}
}

fn validate_row<T: Row>(row: &T) -> Result<()> {
	row.validate().map_err(|e| Error::from(ErrorKind::InvalidInput(e.to_string())))
}

fn find<T: Row>(rows: &[T], id: Id) -> Option<usize> {
	rows.binary_search_by_key(&id, Row::id).ok()
}

fn is_sorted_by_id<T: Row>(rows: &[T]) -> bool {
	rows.windows(2).all(|pair| pair[0].id() <= pair[1].id())
}

/// Reads a table file's lines, rejecting a file whose final line lacks a
/// trailing newline (a crash mid-write leaves a truncated last line).
/// Returns `None` if the file does not exist yet, or exists but is empty
/// (e.g. left behind by a crash between `create` and the header write) —
/// both cases open as an empty table with the header written on first
/// mutation.
fn load_lines(path: &Path) -> Result<Option<Vec<String>>> {
	let content = match fs::read_to_string(path) {
		Ok(content) => content,
		Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e.into()),
	};

	if content.is_empty() {
		return Ok(None);
	}

	if !content.ends_with('\n') {
		bail!(ErrorKind::Corrupt(path.to_owned(), "file does not end with a newline; last line is truncated".into()));
	}

	Ok(Some(content.lines().map(str::to_owned).collect()))
}

fn lock_path_for(path: &Path) -> PathBuf {
	let mut os = path.as_os_str().to_owned();
	os.push(".lock");
	PathBuf::from(os)
}

fn tmp_path_for(path: &Path) -> PathBuf {
	let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
	let mut os = path.as_os_str().to_owned();
	os.push(format!(".tmp-{}-{}", std::process::id(), n));
	PathBuf::from(os)
}
