//! Storage of protocol records. Participants only see the [`Repository`] trait so a persistent
//! store can replace [`InMemoryRepository`].

use std::sync::{Mutex, MutexGuard, PoisonError};

/// A stored value and the key it is looked up by
pub trait Record: Clone + Send + Sync + 'static {
    type Descriptor: PartialEq;

    fn descriptor(&self) -> Self::Descriptor;
}

/// Every method is atomic with respect to the others. In particular the read-modify-write of
/// [`Repository::update_first`] cannot interleave with another update of the same record.
pub trait Repository<T: Record>: Send + Sync {
    fn insert(&self, record: T);

    /// Insert `record` and return the records stored before it under the same descriptor. Of two
    /// concurrent inserts of the same descriptor, one sees the other.
    fn insert_returning_matches(&self, record: T) -> Vec<T>;

    fn query(&self, predicate: &dyn Fn(&T) -> bool) -> Vec<T>;

    /// Apply `update` to the first record matching `predicate` and return the updated record
    fn update_first(
        &self,
        predicate: &dyn Fn(&T) -> bool,
        update: &mut dyn FnMut(&mut T),
    ) -> Option<T>;

    /// Remove and return all records matching `predicate`
    fn remove_where(&self, predicate: &dyn Fn(&T) -> bool) -> Vec<T>;

    fn all(&self) -> Vec<T>;

    fn clear(&self);

    fn query_by_descriptor(&self, descriptor: &T::Descriptor) -> Vec<T> {
        self.query(&|r| r.descriptor() == *descriptor)
    }

    fn remove_by_descriptor(&self, descriptor: &T::Descriptor) -> Vec<T> {
        self.remove_where(&|r| r.descriptor() == *descriptor)
    }
}

#[derive(Debug)]
pub struct InMemoryRepository<T> {
    records: Mutex<Vec<T>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the vector half-modified, so poisoning is ignored
    fn records(&self) -> MutexGuard<'_, Vec<T>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Record> Repository<T> for InMemoryRepository<T> {
    fn insert(&self, record: T) {
        self.records().push(record);
    }

    fn insert_returning_matches(&self, record: T) -> Vec<T> {
        let descriptor = record.descriptor();
        let mut records = self.records();
        let matches = records
            .iter()
            .filter(|r| r.descriptor() == descriptor)
            .cloned()
            .collect();
        records.push(record);
        matches
    }

    fn query(&self, predicate: &dyn Fn(&T) -> bool) -> Vec<T> {
        self.records()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    fn update_first(
        &self,
        predicate: &dyn Fn(&T) -> bool,
        update: &mut dyn FnMut(&mut T),
    ) -> Option<T> {
        let mut records = self.records();
        let record = records.iter_mut().find(|r| predicate(r))?;
        update(record);
        Some(record.clone())
    }

    fn remove_where(&self, predicate: &dyn Fn(&T) -> bool) -> Vec<T> {
        let mut records = self.records();
        let mut removed = Vec::new();
        let mut i = 0;
        while i < records.len() {
            if predicate(&records[i]) {
                removed.push(records.remove(i));
            } else {
                i += 1;
            }
        }
        removed
    }

    fn all(&self) -> Vec<T> {
        self.records().clone()
    }

    fn clear(&self) {
        self.records().clear();
    }
}
