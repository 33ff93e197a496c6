// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Storage abstractions for the ORAM bucket tree.

use crate::{BucketCapacity, OramError, SlotIndex, TreeIndex};

/// Untrusted slot-addressed storage backing the ORAM tree.
///
/// A store addresses exactly `node_count * bucket_capacity` slots, each holding
/// one opaque record or nothing. Overwriting is always permitted and the store
/// draws no distinction between real and decoy records; both are just bytes.
///
/// Durable implementations must surface I/O failures as
/// [`OramError::StorageFault`], including a torn write left behind by a crash
/// mid-access, which must fail the next operation touching the affected slot
/// rather than be served silently.
pub trait BucketStore
where
    Self: Sized,
{
    /// Returns a new store of `node_count` buckets of `bucket_capacity` slots
    /// each, all vacant.
    fn new(node_count: TreeIndex, bucket_capacity: BucketCapacity) -> Result<Self, OramError>;

    /// The number of buckets addressed by this store.
    fn node_count(&self) -> TreeIndex;

    /// The number of slots in each bucket.
    fn bucket_capacity(&self) -> BucketCapacity;

    /// Reads the record stored at `(node, slot)`, or `None` if the slot has
    /// never been written.
    fn read_slot(&mut self, node: TreeIndex, slot: SlotIndex)
        -> Result<Option<Vec<u8>>, OramError>;

    /// Overwrites the record stored at `(node, slot)`.
    fn write_slot(
        &mut self,
        node: TreeIndex,
        slot: SlotIndex,
        record: Vec<u8>,
    ) -> Result<(), OramError>;
}

/// A simple in-memory store backed by a flat `Vec` of slots.
#[derive(Debug)]
pub struct MemoryBucketStore {
    slots: Vec<Option<Vec<u8>>>,
    node_count: TreeIndex,
    bucket_capacity: BucketCapacity,
}

impl MemoryBucketStore {
    /// Reverts a slot to the never-written state, for fault-injection tests.
    #[cfg(test)]
    pub(crate) fn clear_slot(&mut self, node: TreeIndex, slot: SlotIndex) {
        let index = self.flat_index(node, slot).unwrap();
        self.slots[index] = None;
    }

    fn flat_index(&self, node: TreeIndex, slot: SlotIndex) -> Result<usize, OramError> {
        if node >= self.node_count || slot >= self.bucket_capacity {
            return Err(OramError::AddressOutOfBounds);
        }
        let node: usize = node.try_into()?;
        Ok(node * self.bucket_capacity + slot)
    }
}

impl BucketStore for MemoryBucketStore {
    fn new(node_count: TreeIndex, bucket_capacity: BucketCapacity) -> Result<Self, OramError> {
        let total = usize::try_from(node_count)? * bucket_capacity;
        Ok(Self {
            slots: vec![None; total],
            node_count,
            bucket_capacity,
        })
    }

    fn node_count(&self) -> TreeIndex {
        self.node_count
    }

    fn bucket_capacity(&self) -> BucketCapacity {
        self.bucket_capacity
    }

    fn read_slot(
        &mut self,
        node: TreeIndex,
        slot: SlotIndex,
    ) -> Result<Option<Vec<u8>>, OramError> {
        let index = self.flat_index(node, slot)?;
        Ok(self.slots[index].clone())
    }

    fn write_slot(
        &mut self,
        node: TreeIndex,
        slot: SlotIndex,
        record: Vec<u8>,
    ) -> Result<(), OramError> {
        let index = self.flat_index(node, slot)?;
        self.slots[index] = Some(record);
        Ok(())
    }
}

/// A store that counts reads and writes per slot.
#[derive(Debug)]
pub struct CountingBucketStore {
    data: MemoryBucketStore,
    /// `reads[i]` tracks the total number of reads made to flat slot index `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` tracks the total number of writes made to flat slot index `i`.
    pub writes: Vec<u64>,
}

impl CountingBucketStore {
    /// Returns the total number of slot reads served by the store.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// Returns the total number of slot writes served by the store.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }

    /// The number of writes made to a single slot.
    pub fn slot_write_count(&self, node: TreeIndex, slot: SlotIndex) -> u64 {
        self.writes[node as usize * self.data.bucket_capacity + slot]
    }
}

impl BucketStore for CountingBucketStore {
    fn new(node_count: TreeIndex, bucket_capacity: BucketCapacity) -> Result<Self, OramError> {
        let total = usize::try_from(node_count)? * bucket_capacity;
        Ok(Self {
            data: MemoryBucketStore::new(node_count, bucket_capacity)?,
            reads: vec![0u64; total],
            writes: vec![0u64; total],
        })
    }

    fn node_count(&self) -> TreeIndex {
        self.data.node_count()
    }

    fn bucket_capacity(&self) -> BucketCapacity {
        self.data.bucket_capacity()
    }

    fn read_slot(
        &mut self,
        node: TreeIndex,
        slot: SlotIndex,
    ) -> Result<Option<Vec<u8>>, OramError> {
        log::debug!("Physical read -- node {} slot {}", node, slot);

        let index = self.data.flat_index(node, slot)?;
        self.reads[index] += 1;
        self.data.read_slot(node, slot)
    }

    fn write_slot(
        &mut self,
        node: TreeIndex,
        slot: SlotIndex,
        record: Vec<u8>,
    ) -> Result<(), OramError> {
        log::debug!("Physical write -- node {} slot {}", node, slot);

        let index = self.data.flat_index(node, slot)?;
        self.writes[index] += 1;
        self.data.write_slot(node, slot, record)
    }
}
