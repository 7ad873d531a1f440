use std::collections::HashMap;

/// Id-keyed storage for backend resources.
///
/// Ids are never reused, so a stale handle cannot alias a newer resource.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    next: u64,
    items: HashMap<u64, T>,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            next: 1,
            items: HashMap::new(),
        }
    }
}

impl<T> ResourceTable<T> {
    pub(crate) fn insert(&mut self, item: T) -> u64 {
        let id = self.next;
        self.next += 1;
        self.items.insert(id, item);
        id
    }

    pub(crate) fn get(&self, id: u64) -> Option<&T> {
        self.items.get(&id)
    }

    pub(crate) fn remove(&mut self, id: u64) -> Option<T> {
        self.items.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
