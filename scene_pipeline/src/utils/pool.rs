use super::SlotAllocator;

/// Index arena: values addressed by recycled `u32` slots.
///
/// Slots are stable for the lifetime of the value; growing the arena never
/// invalidates an index (only references obtained before the growth).
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: SlotAllocator,
    items: Vec<Option<T>>,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: SlotAllocator::new(),
            items: Vec::new(),
        }
    }

    /// Store `value` and return its slot
    pub fn alloc(&mut self, value: T) -> u32 {
        let id = self.slots.alloc();
        let index = id as usize;
        if index == self.items.len() {
            self.items.push(Some(value));
        } else {
            self.items[index] = Some(value);
        }
        id
    }

    /// Remove and return the value stored at `id`
    ///
    /// # Panics
    ///
    /// Panics if `id` is not live.
    pub fn dealloc(&mut self, id: u32) -> T {
        self.slots.free(id);
        match self.items[id as usize].take() {
            Some(value) => value,
            None => unreachable!("pool slot {} allocated without a value", id),
        }
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.items.get(id as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.items.get_mut(id as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.slots.is_allocated(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live `(slot, value)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_ref().map(|v| (i as u32, v)))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.items.iter_mut().for_each(|item| *item = None);
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<u32> for Pool<T> {
    type Output = T;

    fn index(&self, id: u32) -> &T {
        match self.get(id) {
            Some(value) => value,
            None => panic!("pool slot {} is not live", id),
        }
    }
}

impl<T> std::ops::IndexMut<u32> for Pool<T> {
    fn index_mut(&mut self, id: u32) -> &mut T {
        match self.get_mut(id) {
            Some(value) => value,
            None => panic!("pool slot {} is not live", id),
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
