// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Dynamic AABB tree
//!
//! A self-balancing binary tree of fattened AABBs, used as the broad-phase
//! acceleration structure. Leaves carry a client value (a [`crate::physics::BodyHandle`]
//! in practice); internal nodes carry only the union of their children's boxes.
//!
//! Grounded on the corpus's own dynamic AABB tree, generalized from an
//! index-with-sentinel arena to an `Option<NodeIndex>` arena and extended with
//! a `find_index` lookup and an explicit pair-collection entry point for the
//! broad phase.

use crate::math::{Aabb, Vec3};

type NodeIndex = usize;

#[derive(Debug, Clone)]
struct Node<T> {
    aabb: Aabb,
    parent: Option<NodeIndex>,
    children: Option<[NodeIndex; 2]>,
    height: i32,
    client: Option<T>,
}

impl<T> Node<T> {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// A dynamic, self-balancing AABB tree over fattened bounding boxes.
#[derive(Debug, Clone)]
pub struct DynamicBvh<T> {
    root: Option<NodeIndex>,
    nodes: Vec<Node<T>>,
    free_list: Vec<NodeIndex>,
}

impl<T> Default for DynamicBvh<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq> DynamicBvh<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: None,
            nodes: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Number of leaves currently registered (bodies, not internal nodes).
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.client.is_some()).count()
    }

    /// The root node's AABB, or `None` if the tree is empty.
    pub fn root_aabb(&self) -> Option<Aabb> {
        self.root.map(|r| self.nodes[r].aabb)
    }

    /// Inserts a new leaf with the given fattened AABB and returns its index.
    pub fn insert(&mut self, fat_aabb: Aabb, client: T) -> NodeIndex {
        let leaf = self.allocate(fat_aabb, Some(client));
        self.insert_leaf(leaf);
        leaf
    }

    /// Removes a leaf from the tree.
    pub fn remove(&mut self, leaf: NodeIndex) {
        debug_assert!(self.nodes[leaf].is_leaf());
        self.remove_leaf(leaf);
        self.deallocate(leaf);
    }

    /// Returns the client stored at `leaf`.
    pub fn client(&self, leaf: NodeIndex) -> T {
        self.nodes[leaf].client.expect("leaf node has no client")
    }

    /// Returns the stored (fattened) AABB at `leaf`.
    pub fn fat_aabb(&self, leaf: NodeIndex) -> Aabb {
        self.nodes[leaf].aabb
    }

    /// BFS search for the leaf whose client equals `target`.
    pub fn find_index(&self, target: T) -> Option<NodeIndex> {
        let root = self.root?;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(root);
        while let Some(i) = queue.pop_front() {
            let node = &self.nodes[i];
            if node.is_leaf() {
                if node.client == Some(target) {
                    return Some(i);
                }
            } else if let Some(children) = node.children {
                queue.push_back(children[0]);
                queue.push_back(children[1]);
            }
        }
        None
    }

    /// If `tight_aabb` has escaped the leaf's current fat box, re-fattens
    /// (optionally extending predictively along `displacement`) and
    /// reinserts the leaf. Returns `true` if the leaf moved.
    pub fn update(
        &mut self,
        leaf: NodeIndex,
        tight_aabb: Aabb,
        displacement: Vec3,
        extent: f32,
    ) -> bool {
        debug_assert!(self.nodes[leaf].is_leaf());
        if self.nodes[leaf].aabb.contains_aabb(&tight_aabb) {
            return false;
        }

        let client = self.nodes[leaf].client;
        self.remove_leaf(leaf);

        let margin = Vec3::new(extent, extent, extent);
        let mut fat = Aabb::from_min_max(tight_aabb.min - margin, tight_aabb.max + margin);
        if displacement.x < 0.0 {
            fat.min.x += displacement.x;
        } else {
            fat.max.x += displacement.x;
        }
        if displacement.y < 0.0 {
            fat.min.y += displacement.y;
        } else {
            fat.max.y += displacement.y;
        }
        if displacement.z < 0.0 {
            fat.min.z += displacement.z;
        } else {
            fat.max.z += displacement.z;
        }

        self.nodes[leaf].aabb = fat;
        self.nodes[leaf].client = client;
        self.insert_leaf(leaf);
        true
    }

    /// Every leaf overlapping `aabb`.
    pub fn query(&self, aabb: &Aabb) -> Vec<T> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if !node.aabb.intersects_aabb(aabb) {
                continue;
            }
            if node.is_leaf() {
                out.push(node.client.expect("leaf node has no client"));
            } else if let Some(children) = node.children {
                stack.push(children[0]);
                stack.push(children[1]);
            }
        }
        out
    }

    /// Every pair of leaves whose fat boxes overlap, found by a single
    /// top-down walk that prunes any subtree pair whose boxes are disjoint.
    /// Order is deterministic for a fixed tree shape but not otherwise
    /// meaningful; callers normalize ordering and dedup as needed (see the
    /// broad-phase module docs).
    pub fn collect_pairs(&self) -> Vec<(T, T)> {
        let mut pairs = Vec::new();
        let Some(root) = self.root else {
            return pairs;
        };
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if node.is_leaf() {
                continue;
            }
            let children = node.children.expect("internal node has children");
            self.collect_overlap(children[0], children[1], &mut pairs);
            stack.push(children[0]);
            stack.push(children[1]);
        }
        pairs
    }

    fn collect_overlap(&self, a: NodeIndex, b: NodeIndex, pairs: &mut Vec<(T, T)>) {
        let node_a = &self.nodes[a];
        let node_b = &self.nodes[b];
        if !node_a.aabb.intersects_aabb(&node_b.aabb) {
            return;
        }
        match (node_a.children, node_b.children) {
            (None, None) => {
                if a != b {
                    pairs.push((
                        node_a.client.expect("leaf node has no client"),
                        node_b.client.expect("leaf node has no client"),
                    ));
                }
            }
            (None, Some(bc)) => {
                self.collect_overlap(a, bc[0], pairs);
                self.collect_overlap(a, bc[1], pairs);
            }
            (Some(ac), None) => {
                self.collect_overlap(ac[0], b, pairs);
                self.collect_overlap(ac[1], b, pairs);
            }
            (Some(ac), Some(bc)) => {
                self.collect_overlap(ac[0], bc[0], pairs);
                self.collect_overlap(ac[0], bc[1], pairs);
                self.collect_overlap(ac[1], bc[0], pairs);
                self.collect_overlap(ac[1], bc[1], pairs);
            }
        }
    }

    // --- internal: insertion, removal, balancing ---

    fn insert_leaf(&mut self, leaf: NodeIndex) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return;
        };

        let leaf_aabb = self.nodes[leaf].aabb;
        let mut index = root;
        while !self.nodes[index].is_leaf() {
            let children = self.nodes[index].children.unwrap();
            let area = self.nodes[index].aabb.surface_area();
            let combined = self.nodes[index].aabb.merge(&leaf_aabb);
            let combined_area = combined.surface_area();

            let cost = 2.0 * combined_area;
            let inherited = 2.0 * (combined_area - area);

            let child_cost = |bvh: &Self, child: NodeIndex| -> f32 {
                let child_node = &bvh.nodes[child];
                let new_area = child_node.aabb.merge(&leaf_aabb).surface_area();
                if child_node.is_leaf() {
                    new_area + inherited
                } else {
                    new_area - child_node.aabb.surface_area() + inherited
                }
            };

            let cost0 = child_cost(self, children[0]);
            let cost1 = child_cost(self, children[1]);

            if cost <= cost0 && cost <= cost1 {
                break;
            }
            index = if cost0 < cost1 { children[0] } else { children[1] };
        }

        let sibling = index;
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate(leaf_aabb.merge(&self.nodes[sibling].aabb), None);
        self.nodes[new_parent].parent = old_parent;
        self.nodes[new_parent].height = self.nodes[sibling].height + 1;
        self.nodes[new_parent].children = Some([sibling, leaf]);
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        match old_parent {
            Some(p) => {
                let children = self.nodes[p].children.as_mut().unwrap();
                if children[0] == sibling {
                    children[0] = new_parent;
                } else {
                    children[1] = new_parent;
                }
            }
            None => self.root = Some(new_parent),
        }

        self.refit_from(self.nodes[leaf].parent);
    }

    fn remove_leaf(&mut self, leaf: NodeIndex) {
        if Some(leaf) == self.root {
            self.root = None;
            return;
        }

        let parent = self.nodes[leaf].parent.expect("non-root leaf has a parent");
        let grandparent = self.nodes[parent].parent;
        let children = self.nodes[parent].children.unwrap();
        let sibling = if children[0] == leaf { children[1] } else { children[0] };

        match grandparent {
            Some(gp) => {
                let gp_children = self.nodes[gp].children.as_mut().unwrap();
                if gp_children[0] == parent {
                    gp_children[0] = sibling;
                } else {
                    gp_children[1] = sibling;
                }
                self.nodes[sibling].parent = Some(gp);
                self.deallocate(parent);
                self.refit_from(Some(gp));
            }
            None => {
                self.root = Some(sibling);
                self.nodes[sibling].parent = None;
                self.deallocate(parent);
            }
        }
    }

    /// Walks from `start` to the root, rebalancing and refitting box/height
    /// at every internal node along the way.
    fn refit_from(&mut self, start: Option<NodeIndex>) {
        let mut index = start;
        while let Some(i) = index {
            let balanced = self.balance(i);
            let children = self.nodes[balanced].children.expect("internal node has children");
            self.nodes[balanced].aabb = self.nodes[children[0]].aabb.merge(&self.nodes[children[1]].aabb);
            self.nodes[balanced].height =
                1 + self.nodes[children[0]].height.max(self.nodes[children[1]].height);
            index = self.nodes[balanced].parent;
        }
    }

    // --- node allocation ---

    fn allocate(&mut self, aabb: Aabb, client: Option<T>) -> NodeIndex {
        if let Some(index) = self.free_list.pop() {
            self.nodes[index] = Node {
                aabb,
                parent: None,
                children: None,
                height: 0,
                client,
            };
            index
        } else {
            self.nodes.push(Node {
                aabb,
                parent: None,
                children: None,
                height: 0,
                client,
            });
            self.nodes.len() - 1
        }
    }

    fn deallocate(&mut self, index: NodeIndex) {
        self.nodes[index].client = None;
        self.nodes[index].children = None;
        self.nodes[index].parent = None;
        self.free_list.push(index);
    }

    // --- AVL-style rotation ---

    /// Standard dynamic-tree rotation: if `i`'s children differ in height by
    /// more than one, rotate the taller child up and re-parent the shorter of
    /// its two grandchildren onto the opposite side, preserving the height
    /// balance invariant.
    fn balance(&mut self, i: NodeIndex) -> NodeIndex {
        let node = &self.nodes[i];
        if node.is_leaf() || node.height < 2 {
            return i;
        }
        let children = node.children.unwrap();
        let (left, right) = (children[0], children[1]);
        let bal = self.nodes[right].height - self.nodes[left].height;

        if bal > 1 {
            return self.rotate_up(i, right, left);
        }
        if bal < -1 {
            return self.rotate_up(i, left, right);
        }
        i
    }

    /// Rotates `promoted` up to replace `old_root`, keeping `other_child` as
    /// `old_root`'s remaining child and re-homing one of `promoted`'s two
    /// children onto `old_root` in its place (the taller stays with `promoted`).
    fn rotate_up(&mut self, old_root: NodeIndex, promoted: NodeIndex, other_child: NodeIndex) -> NodeIndex {
        let grandchildren = self.nodes[promoted].children.unwrap();
        let (tall, short) = if self.nodes[grandchildren[0]].height > self.nodes[grandchildren[1]].height {
            (grandchildren[0], grandchildren[1])
        } else {
            (grandchildren[1], grandchildren[0])
        };

        let parent = self.nodes[old_root].parent;
        self.nodes[promoted].parent = parent;
        self.nodes[old_root].parent = Some(promoted);

        match parent {
            Some(p) => {
                let pc = self.nodes[p].children.as_mut().unwrap();
                if pc[0] == old_root {
                    pc[0] = promoted;
                } else {
                    pc[1] = promoted;
                }
            }
            None => self.root = Some(promoted),
        }

        self.nodes[promoted].children = Some([old_root, tall]);
        self.nodes[old_root].children = Some([other_child, short]);
        self.nodes[short].parent = Some(old_root);

        self.update_meta(old_root);
        self.update_meta(promoted);
        promoted
    }

    fn update_meta(&mut self, index: NodeIndex) {
        let children = self.nodes[index].children.expect("internal node has children");
        self.nodes[index].aabb = self.nodes[children[0]].aabb.merge(&self.nodes[children[1]].aabb);
        self.nodes[index].height = 1 + self.nodes[children[0]].height.max(self.nodes[children[1]].height);
    }
}
