//! Arena-backed doubly-linked recency list.
//!
//! Nodes live in a `Vec` and link to each other by index, so there is no
//! cyclic ownership. Removed slots go on a free list and are reused by the next
//! insertion. The head is the least recently used entry, the tail the most
//! recently used.

/// Sentinel for "no neighbour".
const NIL: usize = usize::MAX;

/// A key bound to its stored value. Only the owning cache ever sees one.
#[derive(Debug)]
pub(crate) struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
}

#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<CacheEntry<K, V>>,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
pub(crate) struct RecencyList<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<K, V> RecencyList<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Appends at the most-recently-used end and returns the node index.
    pub fn push_back(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            entry: Some(CacheEntry { key, value }),
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        self.link_back(idx);
        self.len += 1;
        idx
    }

    /// Promotes `idx` to the most-recently-used end.
    pub fn move_to_back(&mut self, idx: usize) {
        if idx == self.tail {
            return;
        }
        self.unlink(idx);
        self.link_back(idx);
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_front(&mut self) -> Option<CacheEntry<K, V>> {
        if self.head == NIL {
            return None;
        }
        self.remove(self.head)
    }

    pub fn remove(&mut self, idx: usize) -> Option<CacheEntry<K, V>> {
        let entry = self.slots.get_mut(idx)?.entry.take()?;
        self.unlink(idx);
        self.free.push(idx);
        self.len -= 1;
        Some(entry)
    }

    pub fn get(&self, idx: usize) -> Option<&CacheEntry<K, V>> {
        self.slots.get(idx)?.entry.as_ref()
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut CacheEntry<K, V>> {
        self.slots.get_mut(idx)?.entry.as_mut()
    }

    /// Live entries in arena order (not recency order).
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<K, V>> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    /// Keys from least to most recently used.
    #[cfg(test)]
    pub fn keys_lru_to_mru(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while cursor != NIL {
            let slot = &self.slots[cursor];
            if let Some(entry) = slot.entry.as_ref() {
                keys.push(&entry.key);
            }
            cursor = slot.next;
        }
        keys
    }

    fn link_back(&mut self, idx: usize) {
        self.slots[idx].prev = self.tail;
        self.slots[idx].next = NIL;
        if self.tail != NIL {
            self.slots[self.tail].next = idx;
        } else {
            self.head = idx;
        }
        self.tail = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop_in_lru_order() {
        let mut list = RecencyList::with_capacity(4);
        list.push_back("a", 1);
        list.push_back("b", 2);
        list.push_back("c", 3);
        assert_eq!(list.keys_lru_to_mru(), vec![&"a", &"b", &"c"]);

        let oldest = list.pop_front().unwrap();
        assert_eq!((oldest.key, oldest.value), ("a", 1));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_move_to_back_reorders() {
        let mut list = RecencyList::with_capacity(4);
        let a = list.push_back("a", 1);
        list.push_back("b", 2);
        let c = list.push_back("c", 3);

        list.move_to_back(a);
        assert_eq!(list.keys_lru_to_mru(), vec![&"b", &"c", &"a"]);

        // Already at the back: no-op.
        list.move_to_back(a);
        list.move_to_back(c);
        assert_eq!(list.keys_lru_to_mru(), vec![&"b", &"a", &"c"]);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let mut list = RecencyList::with_capacity(2);
        let a = list.push_back("a", 1);
        list.push_back("b", 2);
        list.remove(a).unwrap();
        assert!(list.get(a).is_none());

        let c = list.push_back("c", 3);
        assert_eq!(c, a);
        assert_eq!(list.len(), 2);
        assert_eq!(list.keys_lru_to_mru(), vec![&"b", &"c"]);
    }

    #[test]
    fn test_remove_only_element_empties_list() {
        let mut list = RecencyList::with_capacity(1);
        let a = list.push_back("a", 1);
        assert!(list.remove(a).is_some());
        assert!(list.remove(a).is_none());
        assert!(list.pop_front().is_none());
        assert_eq!(list.len(), 0);
    }
}
