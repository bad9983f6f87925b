use crate::filesys::FsError;
use alloc::{collections::BinaryHeap, vec::Vec};
use core::cmp::Reverse;

/// Fixed-capacity slot arena. Ids are slot indices; freed ids are handed out
/// again lowest first before the never-used tail is touched.
pub(crate) struct SlotTable<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
    free: BinaryHeap<Reverse<usize>>,
}

impl<T> SlotTable<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            free: BinaryHeap::new(),
        }
    }

    /// Stores the value built for the next id and returns that id.
    pub(crate) fn insert_with(&mut self, build: impl FnOnce(usize) -> T) -> Result<usize, FsError> {
        if let Some(Reverse(id)) = self.free.pop() {
            self.slots[id] = Some(build(id));
            return Ok(id);
        }
        let id = self.slots.len();
        if id >= self.capacity {
            return Err(FsError::CapacityExceeded);
        }
        self.slots.push(Some(build(id)));
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: usize) -> Result<T, FsError> {
        self.check(id)?;
        let value = self
            .slots
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(FsError::NotFound)?;
        self.free.push(Reverse(id));
        Ok(value)
    }

    pub(crate) fn get(&self, id: usize) -> Result<&T, FsError> {
        self.check(id)?;
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(FsError::NotFound)
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Result<&mut T, FsError> {
        self.check(id)?;
        self.slots
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(FsError::NotFound)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn check(&self, id: usize) -> Result<(), FsError> {
        if id < self.capacity {
            Ok(())
        } else {
            Err(FsError::InvalidId)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_until_capacity() {
        let mut table = SlotTable::new(3);
        assert_eq!(table.insert_with(|id| id * 10), Ok(0));
        assert_eq!(table.insert_with(|id| id * 10), Ok(1));
        assert_eq!(table.insert_with(|id| id * 10), Ok(2));
        assert_eq!(table.insert_with(|id| id * 10), Err(FsError::CapacityExceeded));
        assert_eq!(table.get(2), Ok(&20));
    }

    #[test]
    fn lowest_freed_id_is_reused_first() {
        let mut table = SlotTable::new(8);
        for _ in 0..5 {
            table.insert_with(|id| id).unwrap();
        }
        table.remove(3).unwrap();
        table.remove(1).unwrap();
        assert_eq!(table.len(), 3);

        assert_eq!(table.insert_with(|id| id), Ok(1));
        assert_eq!(table.insert_with(|id| id), Ok(3));
        assert_eq!(table.insert_with(|id| id), Ok(5));
    }

    #[test]
    fn bad_ids() {
        let mut table: SlotTable<u8> = SlotTable::new(2);
        table.insert_with(|_| 7).unwrap();
        assert_eq!(table.get(1), Err(FsError::NotFound));
        assert_eq!(table.get(2), Err(FsError::InvalidId));
        assert_eq!(table.remove(1), Err(FsError::NotFound));
        assert_eq!(table.remove(0), Ok(7));
        assert_eq!(table.remove(0), Err(FsError::NotFound));
    }
}
