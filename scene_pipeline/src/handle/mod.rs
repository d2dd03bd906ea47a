//! Typed, reusable object handles

mod key;
mod key_allocator;

pub use key::{Key, ObjectKind};
pub use key_allocator::KeyAllocator;
