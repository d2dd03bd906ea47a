/// Allocates and recycles `u32` slot indices with per-slot generations.
///
/// Freed indices are recycled LIFO on subsequent allocations, so the slot
/// range stays as small as the peak live count. Every `free` bumps the
/// slot's generation, which lets holders of a stale index detect reuse.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new();
/// let a = alloc.alloc();  // 0, generation 0
/// let b = alloc.alloc();  // 1
/// alloc.free(a);          // 0 is now available, generation 1
/// let c = alloc.alloc();  // 0 (recycled)
/// ```
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    free_list: Vec<u32>,
    generations: Vec<u32>,
    allocated: Vec<bool>,
    len: u32,
}

impl SlotAllocator {
    /// Create a new empty allocator
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            generations: Vec::new(),
            allocated: Vec::new(),
            len: 0,
        }
    }

    /// Allocate the next available slot index
    pub fn alloc(&mut self) -> u32 {
        self.len += 1;
        let id = self.free_list.pop().unwrap_or_else(|| {
            self.generations.push(0);
            self.allocated.push(false);
            (self.generations.len() - 1) as u32
        });
        self.allocated[id as usize] = true;
        id
    }

    /// Return a slot index to the pool for reuse
    ///
    /// # Panics
    ///
    /// Panics if `id` is not currently allocated.
    pub fn free(&mut self, id: u32) {
        assert!(self.is_allocated(id), "freeing an unallocated slot: {}", id);
        let slot = id as usize;
        self.allocated[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.len -= 1;
        self.free_list.push(id);
    }

    /// Whether `id` is currently handed out
    pub fn is_allocated(&self, id: u32) -> bool {
        self.allocated.get(id as usize).copied().unwrap_or(false)
    }

    /// Current generation of `id` (0 for never-allocated slots)
    pub fn generation(&self, id: u32) -> u32 {
        self.generations.get(id as usize).copied().unwrap_or(0)
    }

    /// Highest index ever allocated + 1.
    ///
    /// This is the minimum capacity the backing storage must have
    /// to accommodate all allocated indices.
    pub fn high_water_mark(&self) -> u32 {
        self.generations.len() as u32
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free every slot; generations of live slots are bumped
    pub fn clear(&mut self) {
        for id in 0..self.high_water_mark() {
            if self.is_allocated(id) {
                self.free(id);
            }
        }
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
