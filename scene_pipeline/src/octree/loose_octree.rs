/// LooseOctree — dynamic loose octree over world-space AABBs.
///
/// An object is stored at exactly one node: the deepest node reached by
/// descending from the root while the object's center lies in the node's
/// partition region and its size is below half the node's size. Culling
/// tests use each node's loose region, which is guaranteed to enclose every
/// object stored in the node's subtree.
///
/// The tree grows on demand: an object whose center lies outside the root
/// makes the root double toward it (repeatedly if needed). Subtrees whose
/// `unique_sub_elements` drops to zero are deallocated immediately, and
/// `try_contract_root` replaces a root with its only populated son.

use std::hash::Hash;
use rustc_hash::FxHashMap;
use glam::Vec3;
use crate::camera::{Frustum, FrustumTest};
use crate::config::OctreeConfig;
use crate::error::Result;
use crate::math::AABB;
use crate::utils::Pool;
use crate::{pipeline_debug, pipeline_err};
use super::node::{high_side_slot, LooseOctreeNode, LEAF_NODE_IDX, UNDEFINED_IDX};

const LOG_SOURCE: &str = "pipeline3d::LooseOctree";

/// Intrusive list entry linking one object into its owning node
#[derive(Debug, Clone)]
struct OctreeElement<K> {
    object: K,
    aabb: AABB,
    node: u32,
    next: u32,
    prev: u32,
}

/// Loose octree keyed by `K` (any small copyable identifier).
pub struct LooseOctree<K> {
    config: OctreeConfig,
    nodes: Pool<LooseOctreeNode>,
    elements: Pool<OctreeElement<K>>,
    root: u32,
    /// Reverse lookup: object → element slot
    object_locations: FxHashMap<K, u32>,
}

impl<K: Copy + Eq + Hash> LooseOctree<K> {
    /// Create an empty tree whose root is the cube
    /// `[-root_half_extent, root_half_extent]³`.
    pub fn new(config: OctreeConfig) -> Self {
        let mut nodes = Pool::new();
        let root = nodes.alloc(LooseOctreeNode::new(Self::initial_root_bounds(&config), UNDEFINED_IDX));
        Self {
            config,
            nodes,
            elements: Pool::new(),
            root,
            object_locations: FxHashMap::default(),
        }
    }

    fn initial_root_bounds(config: &OctreeConfig) -> AABB {
        AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(config.root_half_extent))
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Number of indexed objects
    pub fn len(&self) -> usize {
        self.object_locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_locations.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.object_locations.contains_key(key)
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Partition region of the current root
    pub fn root_bounds(&self) -> AABB {
        self.nodes[self.root].bounds
    }

    /// Loose (culling) region of the current root
    pub fn root_loose_bounds(&self) -> AABB {
        self.nodes[self.root].loose
    }

    /// AABB the object was last inserted or moved with
    pub fn aabb_of(&self, key: &K) -> Option<AABB> {
        self.object_locations.get(key).map(|&e| self.elements[e].aabb)
    }

    /// Partition region of the node currently holding the object
    pub fn owning_node_bounds(&self, key: &K) -> Option<AABB> {
        self.object_locations
            .get(key)
            .map(|&e| self.nodes[self.elements[e].node].bounds)
    }

    /// Number of nodes between the root and the object's node (root = 0)
    pub fn depth_of(&self, key: &K) -> Option<usize> {
        let element = *self.object_locations.get(key)?;
        let mut depth = 0;
        let mut current = self.nodes[self.elements[element].node].father;
        while current != UNDEFINED_IDX {
            depth += 1;
            current = self.nodes[current].father;
        }
        Some(depth)
    }

    // ===== MUTATION =====

    /// Index a new object.
    ///
    /// # Panics
    ///
    /// Panics if the object is already indexed or if `aabb` is not finite
    /// and ordered.
    pub fn insert(&mut self, key: K, aabb: AABB) {
        assert!(aabb.is_valid(), "LooseOctree: invalid AABB {:?}", aabb);
        assert!(!self.object_locations.contains_key(&key), "LooseOctree: object already indexed");

        let element = self.elements.alloc(OctreeElement {
            object: key,
            aabb,
            node: UNDEFINED_IDX,
            next: UNDEFINED_IDX,
            prev: UNDEFINED_IDX,
        });
        self.object_locations.insert(key, element);
        self.add_element(element);
    }

    /// Remove an object; returns false when it was not indexed.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(element) = self.object_locations.remove(key) else {
            return false;
        };
        let node = self.detach(element);
        self.elements.dealloc(element);

        let mut to_clean = UNDEFINED_IDX;
        let mut current = node;
        while current != UNDEFINED_IDX {
            let node = &mut self.nodes[current];
            node.unique_sub_elements -= 1;
            if node.unique_sub_elements == 0 {
                to_clean = current;
            }
            current = node.father;
        }
        if to_clean != UNDEFINED_IDX {
            self.collect_garbage(to_clean);
        }
        true
    }

    /// Relocate an object after its AABB changed.
    ///
    /// Stays in place while the object still fits its node, sinks into a son
    /// when it became small enough, and otherwise climbs to the first
    /// ancestor that fits it. Climbing past the root re-inserts from the root,
    /// growing it as needed.
    ///
    /// # Panics
    ///
    /// Panics if the object is not indexed or if `aabb` is invalid.
    pub fn move_object(&mut self, key: &K, aabb: AABB) {
        assert!(aabb.is_valid(), "LooseOctree: invalid AABB {:?}", aabb);
        let element = match self.object_locations.get(key) {
            Some(&element) => element,
            None => panic!("LooseOctree: moving an object that is not indexed"),
        };
        self.elements[element].aabb = aabb;
        let node_idx = self.elements[element].node;

        if self.claims(node_idx, &aabb) {
            if self.can_descend(node_idx, &aabb) {
                let slot = self.nodes[node_idx].son_slot_toward(aabb.center());
                self.detach(element);
                let son = self.son_or_generate(node_idx, slot);
                self.add_element_recursive(son, element);
            }
            return;
        }

        self.detach(element);
        let node = &mut self.nodes[node_idx];
        node.unique_sub_elements -= 1;
        let mut to_clean = if node.unique_sub_elements == 0 { node_idx } else { UNDEFINED_IDX };
        let mut current = node.father;

        while current != UNDEFINED_IDX {
            let node = &mut self.nodes[current];
            node.unique_sub_elements -= 1;
            let (unique, father) = (node.unique_sub_elements, node.father);

            if self.claims(current, &aabb) {
                if to_clean != UNDEFINED_IDX {
                    self.collect_garbage(to_clean);
                }
                self.add_element_recursive(current, element);
                return;
            }
            if unique == 0 {
                to_clean = current;
            }
            current = father;
        }

        if to_clean != UNDEFINED_IDX {
            self.collect_garbage(to_clean);
        }
        self.add_element(element);
    }

    /// Replace the root by its only populated son.
    ///
    /// Applies when the root is not a leaf, holds no element itself and
    /// exactly one son has a non-empty subtree. Returns whether the root
    /// changed.
    pub fn try_contract_root(&mut self) -> bool {
        let old_root = self.root;
        let root = &self.nodes[old_root];
        if root.is_leaf() || root.element_count != 0 {
            return false;
        }

        let mut populated = root
            .sons
            .iter()
            .enumerate()
            .filter(|&(_, &son)| son != LEAF_NODE_IDX && self.nodes[son].unique_sub_elements != 0);
        let (slot, new_root) = match (populated.next(), populated.next()) {
            (Some((slot, &son)), None) => (slot, son),
            _ => return false,
        };

        self.nodes[old_root].sons[slot] = UNDEFINED_IDX;
        self.remove_all_sons(old_root);
        self.nodes.dealloc(old_root);
        self.nodes[new_root].father = UNDEFINED_IDX;
        self.root = new_root;

        pipeline_debug!(LOG_SOURCE, "Root contracted to {:?}", self.nodes[new_root].bounds);
        true
    }

    /// Node fits the box and insertion from the root would route its center
    /// through the node. Centers on a shared face belong to the high side.
    fn claims(&self, node_idx: u32, aabb: &AABB) -> bool {
        if !self.nodes[node_idx].fits(aabb) {
            return false;
        }
        let center = aabb.center();
        let mut current = node_idx;
        loop {
            let father = self.nodes[current].father;
            if father == UNDEFINED_IDX {
                return true;
            }
            let node = &self.nodes[father];
            if node.sons[node.son_slot_toward(center)] != current {
                return false;
            }
            current = father;
        }
    }

    /// Contract the root as long as possible; returns the number of steps.
    pub fn shrink(&mut self) -> usize {
        let mut steps = 0;
        while self.try_contract_root() {
            steps += 1;
        }
        steps
    }

    /// Drop every object and reset the root to its initial region.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.elements.clear();
        self.object_locations.clear();
        self.root = self
            .nodes
            .alloc(LooseOctreeNode::new(Self::initial_root_bounds(&self.config), UNDEFINED_IDX));
    }

    // ===== QUERIES =====

    /// Append every object whose AABB intersects the frustum.
    ///
    /// Subtrees whose loose region is outside are skipped; subtrees whose
    /// loose region is fully inside are collected without per-object tests.
    pub fn query_frustum(&self, frustum: &Frustum, results: &mut Vec<K>) {
        self.query_node(self.root, frustum, results);
    }

    fn query_node(&self, node_idx: u32, frustum: &Frustum, results: &mut Vec<K>) {
        let node = &self.nodes[node_idx];
        if node.unique_sub_elements == 0 {
            return;
        }

        match frustum.classify_aabb(&node.loose) {
            FrustumTest::Outside => {}
            FrustumTest::Inside => self.collect_subtree(node_idx, results),
            FrustumTest::Partial => {
                results.extend(
                    self.node_elements(node)
                        .filter(|e| frustum.intersects_aabb(&e.aabb))
                        .map(|e| e.object),
                );
                for son in self.real_sons(node) {
                    self.query_node(son, frustum, results);
                }
            }
        }
    }

    fn collect_subtree(&self, node_idx: u32, results: &mut Vec<K>) {
        let node = &self.nodes[node_idx];
        results.extend(self.node_elements(node).map(|e| e.object));
        for son in self.real_sons(node) {
            self.collect_subtree(son, results);
        }
    }

    fn node_elements<'a>(&'a self, node: &LooseOctreeNode) -> NodeElements<'a, K> {
        NodeElements {
            elements: &self.elements,
            current: node.first_element,
        }
    }

    fn real_sons(&self, node: &LooseOctreeNode) -> impl Iterator<Item = u32> {
        let sons = if node.is_leaf() { [UNDEFINED_IDX; 8] } else { node.sons };
        sons.into_iter().filter(|&s| s != UNDEFINED_IDX && s != LEAF_NODE_IDX)
    }

    // ===== INSERTION INTERNALS =====

    /// Insert from the root, growing it until the element fits.
    fn add_element(&mut self, element: u32) {
        let aabb = self.elements[element].aabb;
        while !self.nodes[self.root].fits(&aabb) {
            self.extend_root(aabb.center());
        }
        self.add_element_recursive(self.root, element);
    }

    /// Descend from `node_idx` (which must fit the element), counting the
    /// element in every node passed through.
    fn add_element_recursive(&mut self, mut node_idx: u32, element: u32) {
        let aabb = self.elements[element].aabb;
        loop {
            self.nodes[node_idx].unique_sub_elements += 1;
            if !self.can_descend(node_idx, &aabb) {
                self.attach(node_idx, element);
                return;
            }
            let slot = self.nodes[node_idx].son_slot_toward(aabb.center());
            node_idx = self.son_or_generate(node_idx, slot);
        }
    }

    /// Box smaller than the son region toward its center, and that son not
    /// smaller than `min_node_size`
    fn can_descend(&self, node_idx: u32, aabb: &AABB) -> bool {
        let node = &self.nodes[node_idx];
        let son = node.son_bounds(node.son_slot_toward(aabb.center())).size();
        son.cmpgt(aabb.size()).all() && son.min_element() >= self.config.min_node_size
    }

    fn son_or_generate(&mut self, node_idx: u32, slot: usize) -> u32 {
        let son = self.nodes[node_idx].sons[slot];
        if son == UNDEFINED_IDX || son == LEAF_NODE_IDX {
            self.generate_son(node_idx, slot)
        } else {
            son
        }
    }

    fn generate_son(&mut self, node_idx: u32, slot: usize) -> u32 {
        let bounds = self.nodes[node_idx].son_bounds(slot);
        let son = self.nodes.alloc(LooseOctreeNode::new(bounds, node_idx));

        let node = &mut self.nodes[node_idx];
        if node.is_leaf() {
            node.sons = [LEAF_NODE_IDX; 8];
        }
        node.sons[slot] = son;
        son
    }

    /// Double the root toward `toward`; the old root becomes a son of the
    /// new one, or is discarded when empty.
    fn extend_root(&mut self, toward: Vec3) {
        let old_root = self.root;
        let (bounds, unique) = {
            let old = &self.nodes[old_root];
            (old.bounds, old.unique_sub_elements)
        };
        let size = bounds.size();
        let negative = toward.cmplt(bounds.center());

        let mut new_root = LooseOctreeNode::new(
            AABB {
                min: Vec3::select(negative, bounds.min - size, bounds.min),
                max: Vec3::select(negative, bounds.max, bounds.max + size),
            },
            UNDEFINED_IDX,
        );
        // the old root's faces become the split planes, so its region is a son region
        new_root.split = Vec3::select(negative, bounds.min, bounds.max);
        new_root.unique_sub_elements = unique;

        if unique == 0 {
            self.remove_node(old_root);
        } else {
            new_root.sons = [LEAF_NODE_IDX; 8];
            new_root.sons[high_side_slot(negative)] = old_root;
        }
        let new_idx = self.nodes.alloc(new_root);
        if unique != 0 {
            self.nodes[old_root].father = new_idx;
        }
        self.root = new_idx;

        pipeline_debug!(LOG_SOURCE, "Root extended to {:?}", self.nodes[new_idx].bounds);
    }

    // ===== ELEMENT LIST =====

    /// Link `element` at the head of the node's list
    fn attach(&mut self, node_idx: u32, element: u32) {
        let first = self.nodes[node_idx].first_element;
        {
            let e = &mut self.elements[element];
            e.node = node_idx;
            e.next = first;
            e.prev = UNDEFINED_IDX;
        }
        if first != UNDEFINED_IDX {
            self.elements[first].prev = element;
        }
        let node = &mut self.nodes[node_idx];
        node.first_element = element;
        node.element_count += 1;
    }

    /// Unlink `element` from its node's list; returns that node
    fn detach(&mut self, element: u32) -> u32 {
        let (node_idx, prev, next) = {
            let e = &self.elements[element];
            (e.node, e.prev, e.next)
        };
        if prev != UNDEFINED_IDX {
            self.elements[prev].next = next;
        } else {
            self.nodes[node_idx].first_element = next;
        }
        if next != UNDEFINED_IDX {
            self.elements[next].prev = prev;
        }
        self.nodes[node_idx].element_count -= 1;

        let e = &mut self.elements[element];
        e.node = UNDEFINED_IDX;
        e.next = UNDEFINED_IDX;
        e.prev = UNDEFINED_IDX;
        node_idx
    }

    // ===== NODE REMOVAL =====

    /// Deallocate an emptied subtree. The root itself is kept (as a leaf).
    fn collect_garbage(&mut self, node_idx: u32) {
        if node_idx == self.root {
            self.remove_all_sons(node_idx);
        } else {
            self.remove_node(node_idx);
        }
    }

    fn remove_node(&mut self, node_idx: u32) {
        self.remove_all_sons(node_idx);
        let father = self.nodes[node_idx].father;
        if father != UNDEFINED_IDX {
            let slot = self.nodes[father].slot_of(node_idx);
            if let Some(slot) = slot {
                self.nodes[father].sons[slot] = LEAF_NODE_IDX;
            }
        }
        self.nodes.dealloc(node_idx);
    }

    fn remove_all_sons(&mut self, node_idx: u32) {
        let sons = self.nodes[node_idx].sons;
        for son in sons {
            if son != UNDEFINED_IDX && son != LEAF_NODE_IDX {
                self.remove_all_sons(son);
                self.nodes.dealloc(son);
            }
        }
        self.nodes[node_idx].sons = [UNDEFINED_IDX; 8];
    }

    // ===== INTEGRITY =====

    /// Verify the structural invariants of the whole tree.
    ///
    /// Checks leaf/internal son consistency, father/son links and son
    /// regions, element list links and back-references, the containment of
    /// every element center in its node, subtree counts, and that no node
    /// or element is leaked.
    pub fn check_integrity(&self) -> Result<()> {
        let root = &self.nodes[self.root];
        if !root.is_root() {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "root node {} has father {}", self.root, root.father));
        }

        let mut visited_nodes = 0usize;
        let total = self.check_node(self.root, &mut visited_nodes)?;

        if total as usize != self.object_locations.len() {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "tree counts {} elements but {} objects are indexed", total, self.object_locations.len()));
        }
        if self.elements.len() != self.object_locations.len() {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "{} live elements for {} indexed objects", self.elements.len(), self.object_locations.len()));
        }
        if visited_nodes != self.nodes.len() {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "{} nodes reachable but {} allocated", visited_nodes, self.nodes.len()));
        }
        Ok(())
    }

    /// Check one subtree; returns its real element count.
    fn check_node(&self, node_idx: u32, visited: &mut usize) -> Result<u32> {
        *visited += 1;
        let node = &self.nodes[node_idx];

        if node.is_leaf() {
            if node.sons.iter().any(|&s| s != UNDEFINED_IDX) {
                return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                    "leaf node {} has a defined son", node_idx));
            }
        } else if node.sons.iter().any(|&s| s == UNDEFINED_IDX) {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "internal node {} has an undefined son", node_idx));
        }

        let mut count = 0u32;
        let mut prev = UNDEFINED_IDX;
        let mut current = node.first_element;
        while current != UNDEFINED_IDX {
            let e = match self.elements.get(current) {
                Some(e) => e,
                None => return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                    "node {} links dead element {}", node_idx, current)),
            };
            if e.node != node_idx || e.prev != prev {
                return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                    "element {} has broken links in node {}", current, node_idx));
            }
            if self.object_locations.get(&e.object) != Some(&current) {
                return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                    "element {} is not the indexed location of its object", current));
            }
            if !node.bounds.contains_point(e.aabb.center()) {
                return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                    "element {} center {:?} outside node {} region {:?}",
                    current, e.aabb.center(), node_idx, node.bounds));
            }
            count += 1;
            prev = current;
            current = e.next;
        }
        if count != node.element_count {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "node {} lists {} elements but counts {}", node_idx, count, node.element_count));
        }

        let mut subtree = count;
        if !node.is_leaf() {
            for (slot, &son) in node.sons.iter().enumerate() {
                if son == LEAF_NODE_IDX {
                    continue;
                }
                let son_node = match self.nodes.get(son) {
                    Some(n) => n,
                    None => return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                        "node {} links dead son {}", node_idx, son)),
                };
                if son_node.father != node_idx || son_node.bounds != node.son_bounds(slot) {
                    return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                        "son {} in slot {} of node {} is misplaced", son, slot, node_idx));
                }
                subtree += self.check_node(son, visited)?;
            }
        }

        if subtree != node.unique_sub_elements {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "node {} has {} elements in its subtree but counts {}",
                node_idx, subtree, node.unique_sub_elements));
        }
        if subtree == 0 && !node.is_root() {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "empty node {} was not collected", node_idx));
        }
        Ok(subtree)
    }
}

/// Iterator over a node's intrusive element list
struct NodeElements<'a, K> {
    elements: &'a Pool<OctreeElement<K>>,
    current: u32,
}

impl<'a, K> Iterator for NodeElements<'a, K> {
    type Item = &'a OctreeElement<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == UNDEFINED_IDX {
            return None;
        }
        let element = &self.elements[self.current];
        self.current = element.next;
        Some(element)
    }
}

#[cfg(test)]
#[path = "loose_octree_tests.rs"]
mod tests;
