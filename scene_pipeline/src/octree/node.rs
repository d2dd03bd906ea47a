use glam::{BVec3, Vec3};
use crate::math::AABB;

/// No such node / element
pub const UNDEFINED_IDX: u32 = u32::MAX;

/// Son slot of a non-leaf node that has no real node behind it
pub const LEAF_NODE_IDX: u32 = u32::MAX - 1;

/// A cell of the loose octree.
#[derive(Debug, Clone)]
pub(crate) struct LooseOctreeNode {
    /// Partition region: element centers must lie inside it
    pub bounds: AABB,
    /// `bounds` grown by half its size on every side; used for culling
    pub loose: AABB,
    /// Point shared by the eight son regions
    pub split: Vec3,
    pub father: u32,
    pub sons: [u32; 8],
    /// Elements linked directly at this node
    pub element_count: u32,
    /// Head of the intrusive element list
    pub first_element: u32,
    /// Elements in the whole subtree, this node included
    pub unique_sub_elements: u32,
}

impl LooseOctreeNode {
    pub fn new(bounds: AABB, father: u32) -> Self {
        Self {
            bounds,
            loose: bounds.expanded(bounds.half_extents()),
            split: bounds.center(),
            father,
            sons: [UNDEFINED_IDX; 8],
            element_count: 0,
            first_element: UNDEFINED_IDX,
            unique_sub_elements: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.sons[0] == UNDEFINED_IDX
    }

    pub fn is_root(&self) -> bool {
        self.father == UNDEFINED_IDX
    }

    /// Center inside the partition region and box strictly smaller than the node
    pub fn fits(&self, aabb: &AABB) -> bool {
        self.bounds.contains_point(aabb.center()) && self.bounds.size().cmpgt(aabb.size()).all()
    }

    /// Son slot whose region holds `point` (x → 4, y → 2, z → 1 when on the high side).
    /// A point on the split plane goes to the high side.
    pub fn son_slot_toward(&self, point: Vec3) -> usize {
        high_side_slot(point.cmpge(self.split))
    }

    /// Partition region of son `slot`; sons share `split` exactly
    pub fn son_bounds(&self, slot: usize) -> AABB {
        let high = slot_mask(slot);
        AABB {
            min: Vec3::select(high, self.split, self.bounds.min),
            max: Vec3::select(high, self.bounds.max, self.split),
        }
    }

    /// Slot in which `son` is linked
    pub fn slot_of(&self, son: u32) -> Option<usize> {
        self.sons.iter().position(|&s| s == son)
    }
}

pub(crate) fn high_side_slot(high: BVec3) -> usize {
    (if high.x { 4 } else { 0 }) + (if high.y { 2 } else { 0 }) + (if high.z { 1 } else { 0 })
}

fn slot_mask(slot: usize) -> BVec3 {
    BVec3::new(slot & 4 != 0, slot & 2 != 0, slot & 1 != 0)
}
