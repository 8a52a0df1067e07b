use crate::interaction::SurfaceInteraction;
use crate::material::TransportMode;
use crate::primitive::Primitive;
use crate::reflection::bsdf::Bsdf;
use crate::{Bounds3f, Float, Ray, Vec3f};
use bumpalo::Bump;
use std::sync::Arc;

const MAX_TODO: usize = 64;

/// An 8-byte kd-tree node. `data1`'s low 2 bits hold the split axis (3 for a
/// leaf); its high 30 bits hold the above-child index (interior) or the
/// primitive count (leaf). `data0` holds the split position bit pattern
/// (interior) or the single primitive index / index-list offset (leaf).
#[derive(Clone, Copy, Default)]
struct KdTreeNode {
    data0: u32,
    data1: u32,
}

impl KdTreeNode {
    fn leaf(prim_nums: &[u32], prim_indices: &mut Vec<u32>) -> Self {
        let np = prim_nums.len() as u32;
        let data0 = match prim_nums {
            [] => 0,
            [one] => *one,
            many => {
                let offset = prim_indices.len() as u32;
                prim_indices.extend_from_slice(many);
                offset
            }
        };
        Self {
            data0,
            data1: 3 | (np << 2),
        }
    }

    fn interior(axis: usize, above_child: u32, split: Float) -> Self {
        Self {
            data0: split.to_bits(),
            data1: axis as u32 | (above_child << 2),
        }
    }

    fn split_pos(&self) -> Float {
        Float::from_bits(self.data0)
    }

    fn split_axis(&self) -> usize {
        (self.data1 & 3) as usize
    }

    fn is_leaf(&self) -> bool {
        self.data1 & 3 == 3
    }

    fn above_child(&self) -> usize {
        (self.data1 >> 2) as usize
    }

    fn n_hitables(&self) -> usize {
        (self.data1 >> 2) as usize
    }

    fn one_hitable(&self) -> usize {
        self.data0 as usize
    }

    fn hitable_indices_offset(&self) -> usize {
        self.data0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EdgeType {
    Start,
    End,
}

#[derive(Clone, Copy)]
struct BoundEdge {
    t: Float,
    hitable_index: u32,
    edge_type: EdgeType,
}

impl BoundEdge {
    fn new(t: Float, hitable_index: u32, starting: bool) -> Self {
        Self {
            t,
            hitable_index,
            edge_type: if starting {
                EdgeType::Start
            } else {
                EdgeType::End
            },
        }
    }
}

#[derive(Clone, Copy, Default)]
struct KdToDo {
    node: usize,
    t_min: Float,
    t_max: Float,
}

/// A SAH-built kd-tree over hitables; the scene's aggregate.
pub struct KdTree {
    hitables: Vec<Arc<dyn Primitive>>,
    hitable_indices: Vec<u32>,
    nodes: Vec<KdTreeNode>,
    next_free_node: usize,
    bounds: Bounds3f,
    isect_cost: Float,
    traversal_cost: Float,
    empty_bonus: Float,
    max_hitables: usize,
}

impl KdTree {
    pub fn new(hitables: Vec<Arc<dyn Primitive>>) -> Self {
        Self::with_options(hitables, 80.0, 1.0, 0.5, 1, None)
    }

    pub fn with_options(
        hitables: Vec<Arc<dyn Primitive>>,
        isect_cost: Float,
        traversal_cost: Float,
        empty_bonus: Float,
        max_hitables: usize,
        max_depth: Option<u32>,
    ) -> Self {
        let max_depth = max_depth.unwrap_or_else(|| {
            (8.0 + 1.3 * (hitables.len().max(1) as Float).log2()).round() as u32
        });

        let mut bounds = Bounds3f::empty();
        let mut hitable_bounds = Vec::with_capacity(hitables.len());
        for hitable in &hitables {
            let b = hitable.world_bound();
            bounds = bounds.join(&b);
            hitable_bounds.push(b);
        }

        let mut edges: [Vec<BoundEdge>; 3] = [
            vec![BoundEdge::new(0.0, 0, true); 2 * hitables.len()],
            vec![BoundEdge::new(0.0, 0, true); 2 * hitables.len()],
            vec![BoundEdge::new(0.0, 0, true); 2 * hitables.len()],
        ];
        let hitable_nums: Vec<u32> = (0..hitables.len() as u32).collect();

        let mut tree = Self {
            hitables,
            hitable_indices: Vec::new(),
            nodes: Vec::new(),
            next_free_node: 0,
            bounds,
            isect_cost,
            traversal_cost,
            empty_bonus,
            max_hitables,
        };

        tree.build_tree(0, bounds, &hitable_bounds, &hitable_nums, max_depth, &mut edges, 0);
        tree.nodes.truncate(tree.next_free_node);

        tracing::info!(
            hitables = tree.hitables.len(),
            nodes = tree.next_free_node,
            max_depth,
            "built kd-tree"
        );

        tree
    }

    pub fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    #[allow(clippy::too_many_arguments)]
    fn build_tree(
        &mut self,
        node_num: usize,
        node_bounds: Bounds3f,
        all_hitable_bounds: &[Bounds3f],
        hitable_nums: &[u32],
        depth: u32,
        edges: &mut [Vec<BoundEdge>; 3],
        bad_refines: u32,
    ) {
        assert_eq!(node_num, self.next_free_node, "kd-tree node index mismatch");

        // Get the next unused node, growing the array by doubling.
        if self.next_free_node == self.nodes.len() {
            let n_new_alloc = (2 * self.nodes.len()).max(512);
            self.nodes.resize(n_new_alloc, KdTreeNode::default());
        }
        self.next_free_node += 1;

        let n_hitables = hitable_nums.len();
        if n_hitables <= self.max_hitables || depth == 0 {
            self.nodes[node_num] = KdTreeNode::leaf(hitable_nums, &mut self.hitable_indices);
            return;
        }

        // Choose the split axis and position with the lowest SAH cost.
        let mut best_axis: Option<usize> = None;
        let mut best_offset = 0;
        let mut best_cost = Float::INFINITY;
        let old_cost = self.isect_cost * n_hitables as Float;

        let inv_total_sa = 1.0 / node_bounds.surface_area();
        let diagonal = node_bounds.diagonal();

        let mut axis = node_bounds.maximum_extent();
        let mut bad_refines = bad_refines;

        for _retry in 0..3 {
            for (i, &hi) in hitable_nums.iter().enumerate() {
                let b = &all_hitable_bounds[hi as usize];
                edges[axis][2 * i] = BoundEdge::new(b.min[axis], hi, true);
                edges[axis][2 * i + 1] = BoundEdge::new(b.max[axis], hi, false);
            }

            // Stable sort: at equal positions a Start edge precedes an End edge.
            edges[axis][0..2 * n_hitables].sort_by(|e0, e1| {
                e0.t.partial_cmp(&e1.t)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then((e0.edge_type == EdgeType::End).cmp(&(e1.edge_type == EdgeType::End)))
            });

            // Sweep, computing the cost of splitting at each interior edge.
            let mut n_below = 0usize;
            let mut n_above = n_hitables;
            for i in 0..2 * n_hitables {
                let edge = edges[axis][i];
                if edge.edge_type == EdgeType::End {
                    n_above -= 1;
                }
                let edge_t = edge.t;
                if edge_t > node_bounds.min[axis] && edge_t < node_bounds.max[axis] {
                    let other_axis0 = (axis + 1) % 3;
                    let other_axis1 = (axis + 2) % 3;
                    let d0 = diagonal[other_axis0];
                    let d1 = diagonal[other_axis1];
                    let below_sa =
                        2.0 * (d0 * d1 + (edge_t - node_bounds.min[axis]) * (d0 + d1));
                    let above_sa =
                        2.0 * (d0 * d1 + (node_bounds.max[axis] - edge_t) * (d0 + d1));
                    let p_below = below_sa * inv_total_sa;
                    let p_above = above_sa * inv_total_sa;
                    let eb = if n_above == 0 || n_below == 0 {
                        self.empty_bonus
                    } else {
                        0.0
                    };
                    let cost = self.traversal_cost
                        + self.isect_cost
                            * (1.0 - eb)
                            * (p_below * n_below as Float + p_above * n_above as Float);

                    if cost < best_cost {
                        best_cost = cost;
                        best_axis = Some(axis);
                        best_offset = i;
                    }
                }
                if edge.edge_type == EdgeType::Start {
                    n_below += 1;
                }
            }
            debug_assert!(n_below == n_hitables && n_above == 0);

            if best_axis.is_some() {
                break;
            }
            axis = (axis + 1) % 3;
        }

        if best_cost > old_cost {
            bad_refines += 1;
        }
        let give_up = (best_cost > 4.0 * old_cost && n_hitables < 16) || bad_refines == 3;
        let best_axis = match best_axis {
            Some(a) if !give_up => a,
            _ => {
                self.nodes[node_num] = KdTreeNode::leaf(hitable_nums, &mut self.hitable_indices);
                return;
            }
        };

        // Classify primitives with respect to the chosen split.
        let below_nums: Vec<u32> = edges[best_axis][0..best_offset]
            .iter()
            .filter(|e| e.edge_type == EdgeType::Start)
            .map(|e| e.hitable_index)
            .collect();
        let above_nums: Vec<u32> = edges[best_axis][best_offset + 1..2 * n_hitables]
            .iter()
            .filter(|e| e.edge_type == EdgeType::End)
            .map(|e| e.hitable_index)
            .collect();

        let t_split = edges[best_axis][best_offset].t;
        let mut bounds_below = node_bounds;
        let mut bounds_above = node_bounds;
        bounds_below.max[best_axis] = t_split;
        bounds_above.min[best_axis] = t_split;

        // The below child is implicit at the next array slot; only the above
        // child index is stored in the interior node.
        self.build_tree(
            node_num + 1,
            bounds_below,
            all_hitable_bounds,
            &below_nums,
            depth - 1,
            edges,
            bad_refines,
        );
        let above_child = self.next_free_node as u32;
        self.nodes[node_num] = KdTreeNode::interior(best_axis, above_child, t_split);
        self.build_tree(
            above_child as usize,
            bounds_above,
            all_hitable_bounds,
            &above_nums,
            depth - 1,
            edges,
            bad_refines,
        );
    }

    fn leaf_hitables<'a>(&'a self, node: &KdTreeNode) -> impl Iterator<Item = &'a dyn Primitive> {
        let single = node.n_hitables() == 1;
        let one = node.one_hitable();
        let offset = node.hitable_indices_offset();
        (0..node.n_hitables()).map(move |i| {
            let index = if single {
                one
            } else {
                self.hitable_indices[offset + i] as usize
            };
            self.hitables[index].as_ref()
        })
    }
}

impl Primitive for KdTree {
    fn world_bound(&self) -> Bounds3f {
        self.bounds
    }

    fn intersect<'a>(&'a self, ray: &mut Ray) -> Option<SurfaceInteraction<'a>> {
        let (mut t_min, mut t_max) = self.bounds.hit(ray)?;

        let inv_dir = Vec3f::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);
        let mut todo = [KdToDo::default(); MAX_TODO];
        let mut todo_pos = 0usize;

        let mut isect: Option<SurfaceInteraction<'a>> = None;
        let mut node_idx = 0usize;

        loop {
            // A closer hit than this node's entry point ends the walk.
            if ray.t_max < t_min {
                break;
            }

            let node = self.nodes[node_idx];
            if !node.is_leaf() {
                let axis = node.split_axis();
                let t_plane = (node.split_pos() - ray.origin[axis]) * inv_dir[axis];

                let below_first = (ray.origin[axis] < node.split_pos())
                    || (ray.origin[axis] == node.split_pos() && ray.dir[axis] <= 0.0);
                let (first_child, second_child) = if below_first {
                    (node_idx + 1, node.above_child())
                } else {
                    (node.above_child(), node_idx + 1)
                };

                if t_plane > t_max || t_plane <= 0.0 {
                    node_idx = first_child;
                } else if t_plane < t_min {
                    node_idx = second_child;
                } else {
                    assert!(todo_pos < MAX_TODO, "kd-tree traversal stack overflow");
                    todo[todo_pos] = KdToDo {
                        node: second_child,
                        t_min: t_plane,
                        t_max,
                    };
                    todo_pos += 1;
                    node_idx = first_child;
                    t_max = t_plane;
                }
            } else {
                for hitable in self.leaf_hitables(&node) {
                    if let Some(hit) = hitable.intersect(ray) {
                        isect = Some(hit);
                    }
                }

                if todo_pos > 0 {
                    todo_pos -= 1;
                    node_idx = todo[todo_pos].node;
                    t_min = todo[todo_pos].t_min;
                    t_max = todo[todo_pos].t_max;
                } else {
                    break;
                }
            }
        }

        isect
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        let bounds_hit = self.bounds.hit(ray);
        let (mut t_min, mut t_max) = match bounds_hit {
            Some(range) => range,
            None => return false,
        };

        let inv_dir = Vec3f::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);
        let mut todo = [KdToDo::default(); MAX_TODO];
        let mut todo_pos = 0usize;
        let mut node_idx = 0usize;

        loop {
            let node = self.nodes[node_idx];
            if node.is_leaf() {
                if self.leaf_hitables(&node).any(|h| h.intersect_test(ray)) {
                    return true;
                }

                if todo_pos > 0 {
                    todo_pos -= 1;
                    node_idx = todo[todo_pos].node;
                    t_min = todo[todo_pos].t_min;
                    t_max = todo[todo_pos].t_max;
                } else {
                    break;
                }
            } else {
                let axis = node.split_axis();
                let t_plane = (node.split_pos() - ray.origin[axis]) * inv_dir[axis];

                let below_first = (ray.origin[axis] < node.split_pos())
                    || (ray.origin[axis] == node.split_pos() && ray.dir[axis] <= 0.0);
                let (first_child, second_child) = if below_first {
                    (node_idx + 1, node.above_child())
                } else {
                    (node.above_child(), node_idx + 1)
                };

                if t_plane > t_max || t_plane <= 0.0 {
                    node_idx = first_child;
                } else if t_plane < t_min {
                    node_idx = second_child;
                } else {
                    assert!(todo_pos < MAX_TODO, "kd-tree traversal stack overflow");
                    todo[todo_pos] = KdToDo {
                        node: second_child,
                        t_min: t_plane,
                        t_max,
                    };
                    todo_pos += 1;
                    node_idx = first_child;
                    t_max = t_plane;
                }
            }
        }
        false
    }

    fn area_light(&self) -> Option<&dyn crate::light::AreaLight> {
        None
    }

    fn material(&self) -> Option<&dyn crate::material::Material> {
        None
    }

    fn compute_scattering_functions<'b>(
        &self,
        _si: &SurfaceInteraction,
        _arena: &'b Bump,
        _mode: TransportMode,
        _allow_multiple_lobes: bool,
    ) -> Option<Bsdf<'b>> {
        unreachable!("scattering functions are computed on leaf primitives, not the aggregate")
    }
}
