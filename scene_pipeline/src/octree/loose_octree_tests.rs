use glam::{Mat4, Vec3};
use rustc_hash::FxHashSet;
use crate::camera::Frustum;
use crate::config::OctreeConfig;
use crate::error::Error;
use crate::math::AABB;
use super::*;

// ============================================================================
// Helpers
// ============================================================================

fn unit_tree() -> LooseOctree<u32> {
    LooseOctree::new(OctreeConfig::default())
}

fn tree_with_extent(root_half_extent: f32) -> LooseOctree<u32> {
    LooseOctree::new(OctreeConfig { root_half_extent, ..OctreeConfig::default() })
}

fn box_at(center: Vec3, half: f32) -> AABB {
    AABB::from_center_half_extents(center, Vec3::splat(half))
}

/// Orthographic frustum looking down -Z, covering [cx-w, cx+w] x [cy-w, cy+w]
fn ortho_frustum(cx: f32, cy: f32, w: f32) -> Frustum {
    let projection = Mat4::orthographic_rh(-w, w, -w, w, 0.1, 1000.0);
    let view = Mat4::from_translation(Vec3::new(cx, cy, 100.0)).inverse();
    Frustum::from_camera(&projection, &view)
}

fn perspective_frustum(eye: Vec3, target: Vec3) -> Frustum {
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 60.0);
    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    Frustum::from_camera(&projection, &view)
}

/// Small deterministic generator for reproducible random scenes
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32) / ((1u64 << 24) as f32)
    }

    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    fn point(&mut self, extent: f32) -> Vec3 {
        Vec3::new(self.range(-extent, extent), self.range(-extent, extent), self.range(-extent, extent))
    }
}

/// Sorted (bounds, unique_sub_elements) of every live node
fn node_summary(tree: &LooseOctree<u32>) -> Vec<([f32; 6], u32)> {
    let mut summary: Vec<_> = tree
        .nodes
        .iter()
        .map(|(_, n)| {
            let (a, b) = (n.bounds.min, n.bounds.max);
            ([a.x, a.y, a.z, b.x, b.y, b.z], n.unique_sub_elements)
        })
        .collect();
    summary.sort_by(|a, b| a.partial_cmp(b).unwrap());
    summary
}

fn query_set(tree: &LooseOctree<u32>, frustum: &Frustum) -> FxHashSet<u32> {
    let mut results = Vec::new();
    tree.query_frustum(frustum, &mut results);
    let set: FxHashSet<u32> = results.iter().copied().collect();
    assert_eq!(set.len(), results.len(), "query returned duplicates");
    set
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_tree_has_single_leaf_root() {
    let tree = unit_tree();
    assert!(tree.is_empty());
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.root_bounds(), box_at(Vec3::ZERO, 1.0));
    assert_eq!(tree.root_loose_bounds(), box_at(Vec3::ZERO, 2.0));
    assert!(tree.check_integrity().is_ok());
}

// ============================================================================
// Insert
// ============================================================================

#[test]
fn test_small_object_descends() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.5, 0.5), 0.05));

    assert_eq!(tree.len(), 1);
    assert!(tree.depth_of(&1).unwrap() >= 2);
    let owner = tree.owning_node_bounds(&1).unwrap();
    assert!(owner.contains_point(Vec3::new(0.5, 0.5, 0.5)));
    assert!(owner.size().x > 0.1);
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_object_larger_than_half_stays_at_root() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::ZERO, 0.6));
    assert_eq!(tree.depth_of(&1), Some(0));
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn test_son_regions_follow_octant_layout() {
    let mut tree = unit_tree();
    // High x, low y, high z → slot 4 + 1
    tree.insert(1, box_at(Vec3::new(0.5, -0.5, 0.5), 0.3));
    assert_eq!(tree.depth_of(&1), Some(1));
    assert_eq!(
        tree.owning_node_bounds(&1).unwrap(),
        AABB::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 1.0))
    );
    let root = &tree.nodes[tree.root];
    assert_ne!(root.sons[5], LEAF_NODE_IDX);
    assert!(root.sons.iter().enumerate().all(|(i, &s)| i == 5 || s == LEAF_NODE_IDX));
}

#[test]
fn test_zero_extent_object_stops_at_min_node_size() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.3, 0.3, 0.3), 0.0));
    let owner = tree.owning_node_bounds(&1).unwrap();
    // Its father had a half size of at least min_node_size
    assert!(owner.size().x >= 0.01);
    assert!(tree.depth_of(&1).unwrap() <= 8);
    assert!(tree.check_integrity().is_ok());
}

#[test]
#[should_panic(expected = "invalid AABB")]
fn test_insert_non_finite_aabb_panics() {
    let mut tree = unit_tree();
    tree.insert(1, AABB::new(Vec3::splat(f32::NAN), Vec3::ONE));
}

#[test]
#[should_panic(expected = "already indexed")]
fn test_duplicate_insert_panics() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::ZERO, 0.1));
    tree.insert(1, box_at(Vec3::ZERO, 0.1));
}

// ============================================================================
// Remove / round trip
// ============================================================================

#[test]
fn test_insert_remove_round_trip_restores_counts() {
    let mut rng = Lcg(7);
    let mut tree = unit_tree();
    for key in 0..40 {
        tree.insert(key, box_at(rng.point(0.9), rng.range(0.001, 0.2)));
    }
    let before = node_summary(&tree);
    let elements_before = tree.elements.len();

    for probe in 0..20 {
        tree.insert(1000 + probe, box_at(rng.point(0.95), rng.range(0.0, 0.3)));
        assert!(tree.remove(&(1000 + probe)));
        assert_eq!(node_summary(&tree), before);
        assert_eq!(tree.elements.len(), elements_before);
    }
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_remove_missing_returns_false() {
    let mut tree = unit_tree();
    assert!(!tree.remove(&3));
    tree.insert(3, box_at(Vec3::ZERO, 0.1));
    assert!(tree.remove(&3));
    assert!(!tree.remove(&3));
}

#[test]
fn test_removing_everything_collects_all_nodes_but_root() {
    let mut rng = Lcg(11);
    let mut tree = unit_tree();
    for key in 0..100 {
        tree.insert(key, box_at(rng.point(0.9), rng.range(0.0, 0.05)));
    }
    assert!(tree.node_count() > 1);
    for key in 0..100 {
        tree.remove(&key);
        assert!(tree.check_integrity().is_ok());
    }
    assert_eq!(tree.node_count(), 1);
    assert!(tree.nodes[tree.root].is_leaf());
    assert_eq!(tree.nodes[tree.root].unique_sub_elements, 0);
}

// ============================================================================
// Structural invariants
// ============================================================================

#[test]
fn test_containment_and_leaf_consistency_random() {
    let mut rng = Lcg(42);
    let mut tree = tree_with_extent(4.0);
    for key in 0..300 {
        tree.insert(key, box_at(rng.point(10.0), rng.range(0.0, 1.5)));
    }
    for key in (0..300).step_by(3) {
        tree.remove(&key);
    }

    for key in 0..300 {
        if let Some(aabb) = tree.aabb_of(&key) {
            let owner = tree.owning_node_bounds(&key).unwrap();
            assert!(owner.contains_point(aabb.center()), "object {} outside its node", key);
        }
    }
    for (_, node) in tree.nodes.iter() {
        let all_undefined = node.sons.iter().all(|&s| s == UNDEFINED_IDX);
        assert_eq!(node.is_leaf(), all_undefined);
        if !node.is_leaf() {
            assert!(node.sons.iter().all(|&s| s != UNDEFINED_IDX));
        }
    }
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_loose_region_encloses_stored_objects() {
    let mut rng = Lcg(5);
    let mut tree = unit_tree();
    for key in 0..200 {
        tree.insert(key, box_at(rng.point(3.0), rng.range(0.0, 0.8)));
    }
    for key in 0..200 {
        let element = tree.object_locations[&key];
        let node = &tree.nodes[tree.elements[element].node];
        assert!(node.loose.contains(&tree.aabb_of(&key).unwrap()));
    }
}

#[test]
fn test_check_integrity_detects_corruption() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.5, 0.5), 0.05));
    let root = tree.root;
    tree.nodes[root].unique_sub_elements += 1;
    assert!(matches!(tree.check_integrity(), Err(Error::IntegrityViolation(_))));
}

// ============================================================================
// Move
// ============================================================================

#[test]
fn test_move_within_node_keeps_owner() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.5, 0.5), 0.3));
    let owner = tree.owning_node_bounds(&1);
    tree.move_object(&1, box_at(Vec3::new(0.6, 0.4, 0.55), 0.3));
    assert_eq!(tree.owning_node_bounds(&1), owner);
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_shrinking_object_sinks_into_son() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.5, 0.5), 0.6));
    assert_eq!(tree.depth_of(&1), Some(0));
    tree.move_object(&1, box_at(Vec3::new(0.5, 0.5, 0.5), 0.05));
    assert!(tree.depth_of(&1).unwrap() >= 2);
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_move_to_other_branch_collects_old_branch() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.7, 0.7, 0.7), 0.01));
    tree.move_object(&1, box_at(Vec3::new(-0.7, -0.7, -0.7), 0.01));

    let owner = tree.owning_node_bounds(&1).unwrap();
    assert!(owner.max.x <= 0.0 && owner.max.y <= 0.0 && owner.max.z <= 0.0);
    let root = &tree.nodes[tree.root];
    assert_eq!(root.sons.iter().filter(|&&s| s != LEAF_NODE_IDX).count(), 1);
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_move_equivalent_to_remove_then_insert() {
    let mut rng = Lcg(1234);
    let mut moved = tree_with_extent(64.0);
    let mut reinserted = tree_with_extent(64.0);

    let mut initial = Vec::new();
    for key in 0..120u32 {
        let aabb = box_at(rng.point(50.0) + Vec3::splat(0.37), rng.range(0.0, 4.0));
        initial.push(aabb);
        moved.insert(key, aabb);
        reinserted.insert(key, aabb);
    }

    for key in 0..120u32 {
        let mut last = initial[key as usize];
        for _ in 0..6 {
            last = box_at(rng.point(50.0) + Vec3::splat(0.37), rng.range(0.0, 4.0));
            moved.move_object(&key, last);
        }
        reinserted.remove(&key);
        reinserted.insert(key, last);

        assert_eq!(moved.owning_node_bounds(&key), reinserted.owning_node_bounds(&key));
    }
    assert!(moved.check_integrity().is_ok());
    assert!(reinserted.check_integrity().is_ok());
}

#[test]
fn test_move_onto_split_plane_matches_reinsert() {
    let mut moved = unit_tree();
    let mut reinserted = unit_tree();
    for tree in [&mut moved, &mut reinserted] {
        tree.insert(1, box_at(Vec3::new(-0.1, -0.5, -0.5), 0.05));
        tree.insert(2, box_at(Vec3::new(0.5, 0.5, 0.5), 0.05));
    }
    // Center lands on the x = 0 face shared by two octants
    let target = box_at(Vec3::new(0.0, -0.5, -0.5), 0.05);

    moved.move_object(&1, target);
    reinserted.remove(&1);
    reinserted.insert(1, target);

    let owner = moved.owning_node_bounds(&1).unwrap();
    assert_eq!(owner.min.x, 0.0);
    assert_eq!(Some(owner), reinserted.owning_node_bounds(&1));
    assert!(moved.check_integrity().is_ok());
}

#[test]
fn test_move_onto_split_plane_random() {
    let mut rng = Lcg(77);
    let mut moved = unit_tree();
    let mut reinserted = unit_tree();
    for key in 0..40u32 {
        let aabb = box_at(rng.point(0.9), rng.range(0.0, 0.05));
        moved.insert(key, aabb);
        reinserted.insert(key, aabb);
    }

    // Snap centers to quarter planes so they sit on son faces
    for key in 0..40u32 {
        let snapped = (rng.point(0.9) * 4.0).round() / 4.0;
        let aabb = box_at(snapped, rng.range(0.0, 0.05));
        moved.move_object(&key, aabb);
        reinserted.remove(&key);
        reinserted.insert(key, aabb);
        assert_eq!(moved.owning_node_bounds(&key), reinserted.owning_node_bounds(&key));
    }
    assert!(moved.check_integrity().is_ok());
}

#[test]
fn test_move_past_root_grows_tree() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.0, 0.0), 0.1));
    tree.insert(2, box_at(Vec3::new(-0.5, -0.5, -0.5), 0.1));

    tree.move_object(&1, box_at(Vec3::new(20.0, 0.0, 0.0), 0.1));

    assert!(tree.root_bounds().contains_point(Vec3::new(20.0, 0.0, 0.0)));
    assert!(tree.root_bounds().contains_point(Vec3::new(-0.5, -0.5, -0.5)));
    assert!(tree.owning_node_bounds(&1).unwrap().contains_point(Vec3::new(20.0, 0.0, 0.0)));
    assert!(tree.check_integrity().is_ok());
    assert!(query_set(&tree, &ortho_frustum(20.0, 0.0, 1.0)).contains(&1));
    assert!(query_set(&tree, &ortho_frustum(-0.5, -0.5, 0.2)).contains(&2));
}

#[test]
fn test_move_past_root_of_only_object_grows_tree() {
    // The root's own count drops to zero while climbing
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.6, 0.6, 0.6), 0.01));
    tree.move_object(&1, box_at(Vec3::new(-30.0, 12.0, 3.0), 0.5));

    let center = Vec3::new(-30.0, 12.0, 3.0);
    assert!(tree.root_bounds().contains_point(center));
    assert!(tree.owning_node_bounds(&1).unwrap().contains_point(center));
    assert_eq!(tree.len(), 1);
    assert!(tree.check_integrity().is_ok());
    assert!(query_set(&tree, &ortho_frustum(-30.0, 12.0, 2.0)).contains(&1));
}

#[test]
#[should_panic(expected = "not indexed")]
fn test_move_unknown_object_panics() {
    let mut tree = unit_tree();
    tree.move_object(&9, box_at(Vec3::ZERO, 0.1));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_empty_tree_query_returns_nothing() {
    let tree = unit_tree();
    assert!(query_set(&tree, &ortho_frustum(0.0, 0.0, 10.0)).is_empty());
}

#[test]
fn test_query_matches_brute_force() {
    let mut rng = Lcg(99);
    let mut tree = tree_with_extent(2.0);
    let mut boxes = Vec::new();
    for key in 0..400u32 {
        let aabb = box_at(rng.point(40.0), rng.range(0.0, 3.0));
        boxes.push(aabb);
        tree.insert(key, aabb);
    }

    let frustums = [
        ortho_frustum(0.0, 0.0, 5.0),
        ortho_frustum(20.0, -10.0, 8.0),
        ortho_frustum(0.0, 0.0, 100.0),
        perspective_frustum(Vec3::new(0.0, 0.0, 45.0), Vec3::ZERO),
        perspective_frustum(Vec3::new(-30.0, 10.0, 0.0), Vec3::new(30.0, 0.0, 5.0)),
        perspective_frustum(Vec3::new(0.0, 80.0, 0.0), Vec3::new(0.1, 0.0, 0.0)),
    ];

    for frustum in &frustums {
        let expected: FxHashSet<u32> = boxes
            .iter()
            .enumerate()
            .filter(|(_, aabb)| frustum.intersects_aabb(aabb))
            .map(|(k, _)| k as u32)
            .collect();
        assert_eq!(query_set(&tree, frustum), expected);
    }
}

#[test]
fn test_query_skips_objects_outside() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.5, 0.0), 0.05));
    tree.insert(2, box_at(Vec3::new(-0.5, -0.5, 0.0), 0.05));
    let visible = query_set(&tree, &ortho_frustum(0.5, 0.5, 0.2));
    assert!(visible.contains(&1));
    assert!(!visible.contains(&2));
}

// ============================================================================
// Scenario: grow
// ============================================================================

#[test]
fn test_grow_root_toward_outlier() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(5.0, 0.0, 0.0), 0.1));

    let root = tree.root_bounds();
    // Growth toward +X keeps the original min.x
    assert_eq!(root.min.x, -1.0);
    assert!(root.max.x >= 5.0);
    assert!(root.contains_point(Vec3::new(5.0, 0.0, 0.0)));
    assert!(tree.check_integrity().is_ok());

    let camera = perspective_frustum(Vec3::new(5.0, 0.0, 10.0), Vec3::new(5.0, 0.0, 0.0));
    assert!(query_set(&tree, &camera).contains(&1));
}

#[test]
fn test_grow_reparents_populated_root() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(0.5, 0.5, 0.5), 0.05));
    let owner = tree.owning_node_bounds(&1);

    tree.insert(2, box_at(Vec3::new(5.0, 0.0, 0.0), 0.1));

    // The old root is now a son: object 1 keeps its node
    assert_eq!(tree.owning_node_bounds(&1), owner);
    assert_eq!(tree.nodes[tree.root].unique_sub_elements, 2);
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_grow_with_uneven_extent_keeps_integrity() {
    let mut rng = Lcg(42);
    let mut tree = tree_with_extent(0.3);
    for key in 0..200u32 {
        tree.insert(key, box_at(rng.point(50.0), rng.range(0.0, 1.0)));
    }
    assert!(tree.check_integrity().is_ok());

    for key in 0..200u32 {
        tree.move_object(&key, box_at(rng.point(60.0), rng.range(0.0, 1.0)));
    }
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_grown_root_splits_on_old_root_faces() {
    let mut tree = tree_with_extent(0.3);
    tree.insert(1, box_at(Vec3::new(0.1, 0.1, 0.1), 0.01));
    let old_root = tree.root_bounds();

    tree.insert(2, box_at(Vec3::new(-0.6, 0.0, 0.0), 0.01));

    let root = &tree.nodes[tree.root];
    assert_eq!(root.split.x, old_root.min.x);
    let reparented = root
        .sons
        .iter()
        .filter(|&&s| s != LEAF_NODE_IDX)
        .map(|&s| tree.nodes[s].bounds)
        .any(|bounds| bounds == old_root);
    assert!(reparented);
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_grow_discards_empty_root() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(-9.0, 3.0, 0.0), 0.1));
    // No stale empty nodes remain
    assert!(tree.check_integrity().is_ok());
}

// ============================================================================
// Scenario: contract
// ============================================================================

#[test]
fn test_contract_to_single_populated_branch() {
    let mut tree = tree_with_extent(8.0);
    let mut key = 0;
    for octant in 0..8 {
        let sign = |bit: u32| if octant & bit != 0 { 1.0 } else { -1.0 };
        let base = Vec3::new(sign(4), sign(2), sign(1)) * 5.0;
        for j in 0..4 {
            tree.insert(key, box_at(base + Vec3::splat(j as f32 * 0.1), 0.05));
            key += 1;
        }
    }
    assert!(!tree.try_contract_root());

    // Keep only the (+,+,+) branch: keys 28..32
    for k in 0..28 {
        tree.remove(&k);
    }
    assert!(tree.shrink() >= 1);

    let root = tree.root_bounds();
    assert!(root.min.cmpge(Vec3::ZERO).all());
    assert!(root.max.cmple(Vec3::splat(8.0)).all());
    for k in 28..32 {
        assert!(tree.contains(&k));
        assert!(root.contains_point(tree.aabb_of(&k).unwrap().center()));
    }
    assert!(!tree.try_contract_root());
    assert!(tree.check_integrity().is_ok());
}

#[test]
fn test_no_contraction_when_root_holds_elements() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::ZERO, 0.7));
    tree.insert(2, box_at(Vec3::new(0.5, 0.5, 0.5), 0.05));
    assert!(!tree.try_contract_root());
    assert_eq!(tree.shrink(), 0);
}

#[test]
fn test_contraction_keeps_queries_correct() {
    let mut rng = Lcg(3);
    let mut tree = tree_with_extent(16.0);
    for key in 0..64u32 {
        tree.insert(key, box_at(Vec3::new(10.0, 10.0, 10.0) + rng.point(1.0), 0.05));
    }
    tree.shrink();
    assert!(tree.root_bounds().size().x < 32.0);
    let visible = query_set(&tree, &ortho_frustum(10.0, 10.0, 3.0));
    assert_eq!(visible.len(), 64);
    assert!(tree.check_integrity().is_ok());
}

// ============================================================================
// Clear
// ============================================================================

#[test]
fn test_clear_resets_root() {
    let mut tree = unit_tree();
    tree.insert(1, box_at(Vec3::new(40.0, 0.0, 0.0), 0.1));
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.root_bounds(), box_at(Vec3::ZERO, 1.0));
    assert!(tree.check_integrity().is_ok());
}
