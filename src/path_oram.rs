// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The oblivious access engine.
//!
//! Every read and write runs the same protocol: resolve the block's current
//! position, sweep the full leaf-to-root path through it (reading and then
//! rewriting every slot), place the real record at a freshly drawn random
//! position on that path, fill every other slot with a decoy or an
//! opportunistically flushed block, and commit the new position only after the
//! sweep completes. The bucket store sees exactly `(height + 1) *
//! bucket_capacity` slot reads followed by the same number of slot writes per
//! access, whatever the block, the operation, or the outcome.

use crate::{
    bucket_store::BucketStore,
    crypto::{pad_payload, unpad_payload, PayloadCipher, LENGTH_PREFIX_LEN},
    position_map::{BlockPosition, PositionMap},
    stash::Stash,
    tree_index::CompleteBinaryTreeIndex,
    BlockId, OramConfig, OramError, TreeIndex,
};
use rand::{seq::SliceRandom, CryptoRng, Rng, RngCore};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

/// A block evicted from the tree during a sweep, or sitting in the stash,
/// waiting to be flushed back into a path slot.
#[derive(Debug)]
struct FlushCandidate {
    id: BlockId,
    /// The tree slot the block is vacating; `None` for blocks coming out of
    /// the stash.
    old_position: Option<BlockPosition>,
    record: Vec<u8>,
}

/// A Path ORAM instance over a pluggable bucket store and payload cipher.
///
/// The instance exclusively owns its position map, stash, and rng; `read` and
/// `write` take `&mut self`, so one access runs to completion before the next
/// begins. Callers invoking from multiple threads must wrap the instance in
/// their own mutual exclusion.
#[derive(Debug)]
pub struct PathOram<S: BucketStore, C: PayloadCipher, R: Rng + CryptoRng> {
    // Not meant to be exposed to clients; public for benchmarking and testing purposes.
    /// The untrusted memory the ORAM is obliviously accessing on behalf of its client.
    pub physical_memory: S,
    cipher: C,
    position_map: PositionMap,
    stash: Stash,
    config: OramConfig,
    rng: R,
}

impl<S: BucketStore, C: PayloadCipher, R: Rng + CryptoRng> PathOram<S, C, R> {
    /// Creates an ORAM over `physical_memory`, which must address exactly
    /// `tree_size * bucket_capacity` slots and should be empty.
    pub fn new(
        config: OramConfig,
        physical_memory: S,
        cipher: C,
        rng: R,
    ) -> Result<Self, OramError> {
        config.validate()?;
        if physical_memory.node_count() != config.tree_size()
            || physical_memory.bucket_capacity() != config.bucket_capacity
        {
            return Err(OramError::InvalidConfiguration);
        }

        log::debug!(
            "PathOram::new -- height {}, Z = {}, max payload {} bytes",
            config.height,
            config.bucket_capacity,
            config.max_payload_len
        );

        Ok(Self {
            physical_memory,
            cipher,
            position_map: PositionMap::new(),
            stash: Stash::new(config.stash_limit),
            config,
            rng,
        })
    }

    /// Stores `payload` under `id`, creating the block on first write.
    pub fn write(&mut self, id: &str, payload: &[u8]) -> Result<(), OramError> {
        self.access(id, Some(payload)).map(|_| ())
    }

    /// Returns the payload most recently written under `id`.
    pub fn read(&mut self, id: &str) -> Result<Vec<u8>, OramError> {
        self.access(id, None)?.ok_or(OramError::BlockNotFound)
    }

    /// The instance configuration.
    pub fn config(&self) -> &OramConfig {
        &self.config
    }

    /// The length of every sealed record in the store.
    pub fn record_len(&self) -> usize {
        self.cipher
            .sealed_len(LENGTH_PREFIX_LEN + self.config.max_payload_len)
    }

    #[cfg(test)]
    pub(crate) fn position_of(&self, id: &str) -> Option<BlockPosition> {
        self.position_map.lookup(id)
    }

    #[cfg(test)]
    pub(crate) fn stash_occupancy(&self) -> usize {
        self.stash.occupancy()
    }

    /// One oblivious access. `new_payload` is `Some` for a write and `None`
    /// for a read; the returned plaintext is `Some` exactly for reads.
    ///
    /// All fallible work (slot reads, decryption, placement, the stash bound)
    /// happens before the write sweep, and the position map and stash are
    /// mutated only after the sweep completes, so a failed access leaves the
    /// instance in its pre-access state.
    fn access(
        &mut self,
        id: &str,
        new_payload: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, OramError> {
        let height = self.config.height;
        let capacity = self.config.bucket_capacity;
        let record_len = self.record_len();

        if let Some(payload) = new_payload {
            if payload.len() > self.config.max_payload_len {
                return Err(OramError::PayloadSizeMismatch {
                    expected: self.config.max_payload_len,
                    actual: payload.len(),
                });
            }
        }

        // 1. Resolve the current position, stash first. No slot I/O yet: an
        // unknown read must fail before the store sees any traffic.
        let stash_hit = self.stash.contains(id);
        let known = self.position_map.lookup(id);
        if !stash_hit && known.is_none() && new_payload.is_none() {
            return Err(OramError::BlockNotFound);
        }
        // The tree slot the block currently occupies; a stashed block's map
        // entry is stale and only anchors the path choice.
        let own_position = if stash_hit { None } else { known };
        let anchor = match known {
            Some(position) => position.node,
            None => TreeIndex::random_leaf(height, &mut self.rng),
        };

        // 2. Sweep a full-length path through the anchor. Positions may point
        // at internal nodes, so extend those to a random leaf of their subtree.
        let leaf = if anchor.is_leaf(height) {
            anchor
        } else {
            anchor.random_leaf_in_subtree(height, &mut self.rng)
        };
        let path = leaf.path_to_root();

        // 3. Draw the position the block will hold after this access.
        let target = BlockPosition::new(
            path[self.rng.gen_range(0..path.len())],
            self.rng.gen_range(0..capacity),
        );

        // 4. Read phase: every slot on the path. Capture the accessed block's
        // record and evict every other resident of the path, since their slots
        // are about to be rewritten.
        let mut captured = self.stash.get(id).cloned();
        let mut displaced: Vec<FlushCandidate> = Vec::new();
        for &node in &path {
            for slot in 0..capacity {
                let position = BlockPosition::new(node, slot);
                let record = self.physical_memory.read_slot(node, slot)?;
                let is_own = own_position
                    .map(|p| bool::from(position.ct_eq(&p)))
                    .unwrap_or(false);
                if is_own {
                    let record =
                        record.ok_or(OramError::DataIntegrityFault { node, slot })?;
                    check_record_len(&record, record_len)?;
                    captured = Some(record);
                } else if let Some(resident) = self.position_map.occupant(position) {
                    if resident.as_str() != id {
                        let resident = resident.clone();
                        let record =
                            record.ok_or(OramError::DataIntegrityFault { node, slot })?;
                        check_record_len(&record, record_len)?;
                        displaced.push(FlushCandidate {
                            id: resident,
                            old_position: Some(position),
                            record,
                        });
                    }
                }
            }
        }

        // 5. Extract the real content and seal the record that will sit at the
        // target. Reads relocate the block too, under a fresh nonce, so
        // repeated accesses to one block never leave byte-identical records
        // for an observer to link.
        let result_plaintext: Option<Vec<u8>>;
        let target_record: Vec<u8>;
        match new_payload {
            Some(payload) => {
                result_plaintext = None;
                let padded = pad_payload(payload, self.config.max_payload_len)?;
                target_record = self.cipher.seal(&padded, &mut self.rng)?;
            }
            None => {
                let record = captured.as_ref().ok_or_else(|| {
                    let p = known.unwrap_or(target);
                    OramError::DataIntegrityFault {
                        node: p.node,
                        slot: p.slot,
                    }
                })?;
                let padded = self.cipher.open(record)?;
                result_plaintext = Some(unpad_payload(&padded)?);
                target_record = self.cipher.seal(&padded, &mut self.rng)?;
            }
        }
        check_record_len(&target_record, record_len)?;

        // Flush candidates: blocks evicted from this path plus whatever the
        // stash is holding from earlier accesses.
        let mut candidates = displaced;
        for (stashed_id, record) in self.stash.iter() {
            if stashed_id.as_str() != id {
                candidates.push(FlushCandidate {
                    id: stashed_id.clone(),
                    old_position: None,
                    record: record.clone(),
                });
            }
        }

        // Uniformly random placement over the path slots not taken by the target.
        let mut free: Vec<BlockPosition> = path
            .iter()
            .flat_map(|&node| (0..capacity).map(move |slot| BlockPosition::new(node, slot)))
            .filter(|position| !bool::from(position.ct_eq(&target)))
            .collect();
        free.shuffle(&mut self.rng);

        let mut plan: HashMap<BlockPosition, Vec<u8>> = HashMap::new();
        let mut assignments: Vec<(BlockId, Option<BlockPosition>, BlockPosition)> = Vec::new();
        let mut leftover: Vec<FlushCandidate> = Vec::new();
        plan.insert(target, target_record);
        for candidate in candidates {
            match free.pop() {
                Some(position) => {
                    // Fresh nonce for relocated records as well.
                    let padded = self.cipher.open(&candidate.record)?;
                    let record = self.cipher.seal(&padded, &mut self.rng)?;
                    check_record_len(&record, record_len)?;
                    plan.insert(position, record);
                    assignments.push((candidate.id, candidate.old_position, position));
                }
                None => leftover.push(candidate),
            }
        }

        // The stash bound is checked before the first slot write so that a
        // failed access leaves storage untouched.
        let placed_from_stash = assignments
            .iter()
            .filter(|(_, old, _)| old.is_none())
            .count();
        let into_stash = leftover
            .iter()
            .filter(|candidate| candidate.old_position.is_some())
            .count();
        let stash_after =
            self.stash.occupancy() + into_stash - placed_from_stash - usize::from(stash_hit);
        if stash_after > self.stash.limit() {
            return Err(OramError::StashOverflow {
                limit: self.stash.limit(),
            });
        }

        // 6. Write phase: rewrite every slot on the path. Slots without a
        // planned record get a fresh random decoy; the decoy is drawn for every
        // slot so real and decoy writes cost the same rng work.
        for &node in &path {
            for slot in 0..capacity {
                let position = BlockPosition::new(node, slot);
                let mut record = vec![0u8; record_len];
                self.rng.fill_bytes(&mut record);
                if let Some(real) = plan.remove(&position) {
                    record = real;
                }
                self.physical_memory.write_slot(node, slot, record)?;
            }
        }

        // 7. Commit. Every resident of the path has left its slot, so release
        // the reverse entries first, then record the new assignments.
        if let Some(position) = own_position {
            self.position_map.release_slot(position);
        }
        for (_, old_position, _) in &assignments {
            if let Some(position) = old_position {
                self.position_map.release_slot(*position);
            }
        }
        for candidate in &leftover {
            if let Some(position) = candidate.old_position {
                self.position_map.release_slot(position);
            }
        }

        self.position_map.assign(id, target);
        if stash_hit {
            self.stash.remove(id);
        }
        for (block_id, old_position, position) in assignments {
            if old_position.is_none() {
                self.stash.remove(&block_id);
            }
            self.position_map.assign(&block_id, position);
        }
        for candidate in leftover {
            if candidate.old_position.is_some() {
                self.stash.insert(candidate.id, candidate.record)?;
            }
        }

        Ok(result_plaintext)
    }
}

fn check_record_len(record: &[u8], expected: usize) -> Result<(), OramError> {
    if record.len() != expected {
        return Err(OramError::PayloadSizeMismatch {
            expected,
            actual: record.len(),
        });
    }
    Ok(())
}
