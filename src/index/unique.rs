use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use id::Id;
use table::{Observer, Row, Table};

/// A unique secondary index mapping a key extracted from each row to its id.
/// Built once at registration by replaying the table's current contents;
/// kept in sync afterward via the `Observer` protocol.
pub struct UniqueIndex<T: Row, K> {
	table: Weak<Table<T>>,
	key: Box<dyn Fn(&T) -> K + Send + Sync>,
	map: Mutex<HashMap<K, Id>>,
}

impl<T: Row, K: Eq + Hash + Clone> UniqueIndex<T, K> {
	/// Builds and registers an index over `table`, keyed by `key`.
	pub fn new<F>(table: &Arc<Table<T>>, key: F) -> Arc<UniqueIndex<T, K>>
	where
		F: Fn(&T) -> K + Send + Sync + 'static,
	{
		let index = Arc::new(UniqueIndex { table: Arc::downgrade(table), key: Box::new(key), map: Mutex::new(HashMap::new()) });
		table.add_observer(index.clone());
		index
	}

	/// Looks up `k`, then resolves the id through the table. Returns `None`
	/// if the key is absent or the row has since been deleted.
	pub fn get(&self, k: &K) -> Option<T> {
		let id = *self.map.lock().get(k)?;
		self.table.upgrade()?.get(id)
	}

	pub fn len(&self) -> usize {
		self.map.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T: Row, K: Eq + Hash + Clone> Observer<T> for UniqueIndex<T, K> {
	fn on_append(&self, row: &T) {
		let key = (self.key)(row);
		self.map.lock().insert(key, row.id());
	}

	fn on_update(&self, prev: &T, curr: &T) {
		let prev_key = (self.key)(prev);
		let curr_key = (self.key)(curr);
		let mut map = self.map.lock();
		if prev_key != curr_key {
			map.remove(&prev_key);
		}
		map.insert(curr_key, curr.id());
	}

	fn on_delete(&self, _id: Id, row: &T) {
		let key = (self.key)(row);
		self.map.lock().remove(&key);
	}
}
