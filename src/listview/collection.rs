use crate::model::Record;

/// Client-side cache of one resource collection, in server order.
/// Only ever changed by applying a server response.
#[derive(Debug, Clone)]
pub struct Collection<R> {
    items: Vec<R>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<R: Record> Collection<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, items: Vec<R>) {
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Replace the entry with the same id, or append a new one.
    pub fn upsert(&mut self, item: R) {
        let existing = item
            .id()
            .and_then(|id| self.items.iter().position(|e| e.id() == Some(id)));
        match existing {
            Some(idx) => self.items[idx] = item,
            None => self.items.push(item),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<R> {
        let idx = self.items.iter().position(|e| e.id() == Some(id))?;
        Some(self.items.remove(idx))
    }

    /// Returns false when no entry has that id.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.items.iter_mut().find(|item| item.id() == Some(id)) {
            Some(item) => {
                item.set_active(active);
                true
            }
            None => false,
        }
    }
}
