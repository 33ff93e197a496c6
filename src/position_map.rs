// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The Path ORAM position map.
//!
//! Maps each block id to the tree slot currently holding its record. The map is
//! the secret that makes obliviousness hold: it lives in trusted client memory,
//! is owned exclusively by one ORAM instance, and must never cross the trust
//! boundary to anything that can observe the bucket store.

use crate::{BlockId, SlotIndex, TreeIndex};
use std::collections::HashMap;
use subtle::{Choice, ConstantTimeEq};

/// The tree location of one block: a node and a slot within its bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockPosition {
    /// Index of the node whose bucket holds the record.
    pub node: TreeIndex,
    /// Slot within the bucket.
    pub slot: SlotIndex,
}

impl BlockPosition {
    pub fn new(node: TreeIndex, slot: SlotIndex) -> Self {
        Self { node, slot }
    }
}

impl ConstantTimeEq for BlockPosition {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.node.ct_eq(&other.node) & (self.slot as u64).ct_eq(&(other.slot as u64))
    }
}

/// In-memory `BlockId -> BlockPosition` mapping with a reverse occupancy index.
///
/// The reverse index answers "which block's record lives in this slot" so the
/// access sweep can pick out residents of the path it is about to rewrite. A
/// block displaced into the stash keeps its forward entry (stale until the next
/// assignment) but gives up its reverse entry; the stash is always consulted
/// before the forward map, so a stale entry is never served as current.
#[derive(Debug, Default)]
pub struct PositionMap {
    forward: HashMap<BlockId, BlockPosition>,
    occupants: HashMap<BlockPosition, BlockId>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The position currently recorded for `id`, if any. Pure lookup; first
    /// positions are allocated by the access engine, not here.
    pub fn lookup(&self, id: &str) -> Option<BlockPosition> {
        self.forward.get(id).copied()
    }

    /// The block whose record occupies `position`, if any.
    pub fn occupant(&self, position: BlockPosition) -> Option<&BlockId> {
        self.occupants.get(&position)
    }

    /// Records `position` as the current location of `id`, replacing any
    /// previous assignment.
    pub fn assign(&mut self, id: &str, position: BlockPosition) {
        if let Some(previous) = self.forward.insert(id.to_string(), position) {
            // Only clear the old slot if this block still owns it; the slot may
            // already have been handed to another block during the same sweep.
            if self.occupants.get(&previous).map(String::as_str) == Some(id) {
                self.occupants.remove(&previous);
            }
        }
        self.occupants.insert(position, id.to_string());
    }

    /// Clears the reverse entry for `position` when its resident leaves the
    /// tree for the stash. Returns the displaced block's id.
    pub fn release_slot(&mut self, position: BlockPosition) -> Option<BlockId> {
        self.occupants.remove(&position)
    }

    /// The number of blocks with a recorded position.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
