//! Ordered cross-stage command channels
//!
//! A queue has any number of producers and exactly one consuming stage.
//! Commands from one producer are observed in enqueue order, never
//! coalesced, and each is consumed exactly once.

mod command_queue;
mod future;

pub use command_queue::{unbounded, CommandReceiver, CommandSender};
pub use future::{promise, CommandFuture, Promise};
