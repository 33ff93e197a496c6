// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Index arithmetic for the complete binary storage tree.
//!
//! Nodes are numbered 0 (root) through `2^(height + 1) - 2` in level order, so
//! the children of node `n` are `2n + 1` and `2n + 2` and the leaves occupy
//! `[2^height - 1, 2^(height + 1) - 2]`. All path computation is pure index
//! arithmetic; the bucket store is the only source of truth for contents.

use crate::{TreeHeight, TreeIndex};
use rand::{CryptoRng, Rng, RngCore};

/// The first (leftmost) leaf of a tree of the given height.
pub fn first_leaf(height: TreeHeight) -> TreeIndex {
    2u64.pow(height) - 1
}

/// The last (rightmost) leaf of a tree of the given height.
pub fn last_leaf(height: TreeHeight) -> TreeIndex {
    2u64.pow(height + 1) - 2
}

pub trait CompleteBinaryTreeIndex {
    fn parent(&self) -> Self;
    fn path_to_root(&self) -> Vec<TreeIndex>;
    fn random_leaf<R: RngCore + CryptoRng>(height: TreeHeight, rng: &mut R) -> Self;
    fn random_leaf_in_subtree<R: RngCore + CryptoRng>(
        &self,
        height: TreeHeight,
        rng: &mut R,
    ) -> Self;
    fn depth(&self) -> TreeHeight;
    fn is_leaf(&self, height: TreeHeight) -> bool;
}

impl CompleteBinaryTreeIndex for TreeIndex {
    fn parent(&self) -> Self {
        // The root has no parent.
        assert_ne!(*self, 0);
        (self - 1) / 2
    }

    /// The ordered node sequence from `self` up to and including the root.
    /// For a leaf of a tree of height `h` the sequence has length `h + 1`.
    fn path_to_root(&self) -> Vec<TreeIndex> {
        let mut path = Vec::with_capacity((self.depth() + 1) as usize);
        let mut node = *self;
        while node > 0 {
            path.push(node);
            node = node.parent();
        }
        path.push(0);
        path
    }

    fn random_leaf<R: RngCore + CryptoRng>(height: TreeHeight, rng: &mut R) -> Self {
        rng.gen_range(first_leaf(height)..=last_leaf(height))
    }

    /// A uniformly random leaf of the subtree rooted at `self`. Every
    /// leaf-to-root path through such a leaf passes through `self`.
    fn random_leaf_in_subtree<R: RngCore + CryptoRng>(
        &self,
        height: TreeHeight,
        rng: &mut R,
    ) -> Self {
        let mut node = *self;
        for _ in self.depth()..height {
            node = 2 * node + 1 + rng.gen_range(0..2u64);
        }
        node
    }

    fn depth(&self) -> TreeHeight {
        // With 0-based level-order numbering, node n sits at depth floor(log2(n + 1)).
        (self + 1).ilog2()
    }

    fn is_leaf(&self, height: TreeHeight) -> bool {
        self.depth() == height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn leaf_ranges() {
        assert_eq!(first_leaf(3), 7);
        assert_eq!(last_leaf(3), 14);
        assert_eq!(first_leaf(1), 1);
        assert_eq!(last_leaf(1), 2);
    }

    #[test]
    fn depths_and_parents() {
        assert_eq!(0u64.depth(), 0);
        assert_eq!(1u64.depth(), 1);
        assert_eq!(2u64.depth(), 1);
        assert_eq!(7u64.depth(), 3);
        assert_eq!(14u64.depth(), 3);
        assert_eq!(7u64.parent(), 3);
        assert_eq!(8u64.parent(), 3);
        assert_eq!(14u64.parent(), 6);
        assert_eq!(1u64.parent(), 0);
    }

    // Every leaf-to-root path has length height + 1, ends at the root, and each
    // step moves from a child to its parent.
    #[test]
    fn paths_are_well_formed_for_every_leaf() {
        for height in 1..=8 {
            for leaf in first_leaf(height)..=last_leaf(height) {
                let path = leaf.path_to_root();
                assert_eq!(path.len(), (height + 1) as usize);
                assert_eq!(path[0], leaf);
                assert_eq!(*path.last().unwrap(), 0);
                for pair in path.windows(2) {
                    let (child, parent) = (pair[0], pair[1]);
                    assert!(child == 2 * parent + 1 || child == 2 * parent + 2);
                }
            }
        }
    }

    #[test]
    fn random_leaves_cover_the_leaf_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let height = 3;
        let mut seen = std::collections::HashSet::new();
        for _ in 0..512 {
            let leaf = TreeIndex::random_leaf(height, &mut rng);
            assert!(leaf >= first_leaf(height) && leaf <= last_leaf(height));
            seen.insert(leaf);
        }
        assert_eq!(seen.len() as u64, 2u64.pow(height));
    }

    #[test]
    fn subtree_leaves_lie_under_their_root() {
        let mut rng = StdRng::seed_from_u64(0);
        let height = 4;
        for node in [0u64, 1, 2, 5, 11, 22] {
            for _ in 0..64 {
                let leaf = node.random_leaf_in_subtree(height, &mut rng);
                assert!(leaf.is_leaf(height));
                assert!(leaf.path_to_root().contains(&node));
            }
        }
        // A leaf is its own subtree.
        let leaf = 17u64.random_leaf_in_subtree(height, &mut rng);
        assert_eq!(leaf, 17);
    }
}
