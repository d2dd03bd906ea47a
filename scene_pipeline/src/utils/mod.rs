mod slot_allocator;
mod pool;

pub use slot_allocator::SlotAllocator;
pub use pool::Pool;
