#![allow(unknown_lints)]
#![allow(missing_docs)]

use std::io;
use std::path::PathBuf;

error_chain! {
	foreign_links {
		Io(io::Error);
	}

	errors {
		/// Zero ID, malformed ref, illegal decode input, or a record that failed
		/// its own `validate()` at append/modify time.
		InvalidInput(msg: String) {
			description("invalid input")
			display("invalid input: {}", msg),
		}
		/// `get`/`modify`/`delete` addressed an ID that isn't in the table.
		NotFound(id: String) {
			description("record not found")
			display("no record with id {}", id),
		}
		/// `append` with an ID already present, or not strictly greater than `last()`.
		AlreadyExists(id: String) {
			description("record already exists")
			display("record with id {} already exists or is out of order", id),
		}
		/// The schema header is missing its version or a column's name/type.
		SchemaInvalid(path: PathBuf, msg: String) {
			description("invalid schema header")
			display("invalid schema header in {}: {}", path.display(), msg),
		}
		/// A line failed to parse as JSON, a loaded row failed `validate()`,
		/// had a zero/duplicate ID, or a stored blob ref failed validation.
		Corrupt(path: PathBuf, msg: String) {
			description("corrupt table file")
			display("corrupt table file at {}: {}", path.display(), msg),
		}
		/// write/close called on an already-closed `BlobWriter`.
		Closed {
			description("blob writer is closed")
			display("blob writer is closed"),
		}
		/// `BlobStore::gc` accumulated more than one error during its sweep.
		Aggregate(errors: Vec<Error>) {
			description("multiple errors during gc")
			display("{} errors during gc: {}", errors.len(),
				errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")),
		}
		/// The table/blob-store root is already locked by another handle in this process tree.
		Locked(path: PathBuf) {
			description("root is locked")
			display("could not acquire exclusive lock on {}. If you're sure no other \
					  process is using it you can delete the LOCK file.", path.display()),
		}
	}
}
