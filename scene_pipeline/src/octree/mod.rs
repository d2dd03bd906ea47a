//! Loose octree spatial index
//!
//! Nodes and elements live in index arenas (`utils::Pool`) and reference each
//! other by `u32` slot. Two reserved slot values mark absent sons: a node
//! whose son 0 is `UNDEFINED_IDX` is a leaf; a non-leaf node has all eight
//! son slots set, either to a real node or to `LEAF_NODE_IDX`.

mod node;
mod loose_octree;

pub use loose_octree::LooseOctree;
pub use node::{LEAF_NODE_IDX, UNDEFINED_IDX};
