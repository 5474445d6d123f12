use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use id::Id;
use table::{Observer, Row, Table};

/// A non-unique secondary index mapping a key extracted from each row to the
/// set of ids with that key.
pub struct Index<T: Row, K> {
	table: Weak<Table<T>>,
	key: Box<dyn Fn(&T) -> K + Send + Sync>,
	map: Mutex<HashMap<K, HashSet<Id>>>,
}

impl<T: Row, K: Eq + Hash + Clone> Index<T, K> {
	/// Builds and registers an index over `table`, keyed by `key`.
	pub fn new<F>(table: &Arc<Table<T>>, key: F) -> Arc<Index<T, K>>
	where
		F: Fn(&T) -> K + Send + Sync + 'static,
	{
		let index = Arc::new(Index { table: Arc::downgrade(table), key: Box::new(key), map: Mutex::new(HashMap::new()) });
		table.add_observer(index.clone());
		index
	}

	/// Rows currently keyed by `k`, resolved through the table. Rows deleted
	/// since the snapshot was taken are skipped silently.
	pub fn iter(&self, k: &K) -> Vec<T> {
		let ids: Vec<Id> = match self.map.lock().get(k) {
			Some(set) => set.iter().copied().collect(),
			None => return Vec::new(),
		};

		let table = match self.table.upgrade() {
			Some(table) => table,
			None => return Vec::new(),
		};

		ids.into_iter().filter_map(|id| table.get(id)).collect()
	}

	pub fn key_count(&self) -> usize {
		self.map.lock().len()
	}
}

impl<T: Row, K: Eq + Hash + Clone> Observer<T> for Index<T, K> {
	fn on_append(&self, row: &T) {
		let key = (self.key)(row);
		self.map.lock().entry(key).or_insert_with(HashSet::new).insert(row.id());
	}

	fn on_update(&self, prev: &T, curr: &T) {
		let prev_key = (self.key)(prev);
		let curr_key = (self.key)(curr);
		let mut map = self.map.lock();

		if prev_key != curr_key {
			remove_from_set(&mut map, &prev_key, prev.id());
		}
		map.entry(curr_key).or_insert_with(HashSet::new).insert(curr.id());
	}

	fn on_delete(&self, id: Id, row: &T) {
		let key = (self.key)(row);
		remove_from_set(&mut self.map.lock(), &key, id);
	}
}

fn remove_from_set<K: Eq + Hash + Clone>(map: &mut HashMap<K, HashSet<Id>>, key: &K, id: Id) {
	if let Some(set) = map.get_mut(key) {
		set.remove(&id);
		if set.is_empty() {
			map.remove(key);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use error::Result;
	use schema::Describe;
	use serde::{Deserialize, Serialize};
	use std::collections::HashSet as Set;
	use tempdir::TempDir;

	#[derive(Debug, Clone, Serialize, Deserialize)]
	struct Person {
		id: Id,
		name: String,
	}

	impl Row for Person {
		fn id(&self) -> Id {
			self.id
		}

		fn validate(&self) -> Result<()> {
			Ok(())
		}
	}

	impl Describe for Person {}

	fn first_letter(p: &Person) -> char {
		p.name.chars().next().unwrap()
	}

	#[test]
	fn groups_by_key_and_follows_updates() {
		let dir = TempDir::new("multi_index").unwrap();
		let table = Table::<Person>::open(dir.path().join("people.jsonl")).unwrap();
		let by_initial = Index::new(&table, first_letter);

		let id1 = Id::from_u64(1);
		let id2 = Id::from_u64(2);
		let id3 = Id::from_u64(3);
		table.append(Person { id: id1, name: "alice".into() }).unwrap();
		table.append(Person { id: id2, name: "adam".into() }).unwrap();
		table.append(Person { id: id3, name: "bob".into() }).unwrap();

		let a_ids: Set<Id> = by_initial.iter(&'a').into_iter().map(|p| p.id).collect();
		assert_eq!(a_ids, [id1, id2].iter().copied().collect());
		assert_eq!(by_initial.iter(&'b').len(), 1);

		table.modify(id1, |p| { p.name = "zelda".into(); Ok(()) }).unwrap();
		let a_ids: Set<Id> = by_initial.iter(&'a').into_iter().map(|p| p.id).collect();
		assert_eq!(a_ids, [id2].iter().copied().collect());
		assert_eq!(by_initial.iter(&'z').len(), 1);
	}
}
