// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An oblivious block store implementing Path ORAM.
//!
//! Clients store named byte payloads ("blocks") on an untrusted bucket store
//! laid out as a complete binary tree. Every access sweeps a full leaf-to-root
//! path, rewriting each slot on it with either a real record or a decoy of
//! identical size, and then remaps the block to a fresh random position. An
//! observer of the bucket store sees a fixed-shape sequence of slot reads and
//! writes that is statistically independent of which block was requested and of
//! whether the access was a read or a write.
//!
//! Payload bytes are additionally protected by an authenticated cipher
//! ([`crypto::PayloadCipher`]) before they cross the trust boundary.

pub mod bucket_store;
pub mod crypto;
pub mod path_oram;
pub mod position_map;
pub mod stash;
pub mod tree_index;

#[cfg(test)]
pub(crate) mod test_utils;

use thiserror::Error;

pub use bucket_store::{BucketStore, CountingBucketStore, MemoryBucketStore};
pub use crypto::{Aes256GcmCipher, PayloadCipher};
pub use path_oram::PathOram;
pub use position_map::BlockPosition;

/// Index of a node in the complete binary storage tree. The root is 0.
pub type TreeIndex = u64;
/// Height of the storage tree; a tree of height `h` has `2^(h+1) - 1` nodes.
pub type TreeHeight = u32;
/// Index of a slot within one bucket.
pub type SlotIndex = usize;
/// Number of slots per bucket, the parameter "Z" from the Path ORAM literature.
pub type BucketCapacity = usize;
/// Logical name of a stored block.
pub type BlockId = String;

/// The parameter "Z" from the Path ORAM literature that sets the number of blocks per bucket; typical values are 3 or 4.
/// Here we adopt the more conservative setting of 4.
pub const DEFAULT_BUCKET_CAPACITY: BucketCapacity = 4;

/// Default bound on the number of blocks the stash can hold between accesses.
/// The original Path ORAM paper's experiments (Figure 3) found 40 sufficient
/// for an overflow probability below 2^-50 with Z = 4.
pub const DEFAULT_STASH_LIMIT: usize = 40;

const MAXIMUM_TREE_HEIGHT: TreeHeight = 62;

/// The error type returned by ORAM operations.
#[derive(Debug, Error)]
pub enum OramError {
    /// A read of a block that was never written.
    #[error("block not found")]
    BlockNotFound,
    /// A payload or slot record whose length diverges from the configured size.
    #[error("payload size mismatch: expected {expected} bytes, found {actual}")]
    PayloadSizeMismatch {
        /// The length required by the instance configuration.
        expected: usize,
        /// The length actually presented.
        actual: usize,
    },
    /// A slot the position map points at was vacant or unreadable mid-sweep.
    #[error("data integrity fault at node {node}, slot {slot}")]
    DataIntegrityFault {
        /// Node holding the faulty slot.
        node: TreeIndex,
        /// Slot index within the node's bucket.
        slot: SlotIndex,
    },
    /// The bucket store failed to serve a read or write.
    #[error("storage fault")]
    StorageFault(#[from] std::io::Error),
    /// Ciphertext failed authentication or was malformed.
    #[error("decryption fault")]
    DecryptionFault,
    /// The stash bound would be exceeded by this access.
    #[error("stash overflow: limit of {limit} blocks reached")]
    StashOverflow {
        /// The configured stash bound.
        limit: usize,
    },
    /// A node or slot index outside the storage tree.
    #[error("address out of bounds")]
    AddressOutOfBounds,
    /// A configuration the constructor rejects.
    #[error("invalid ORAM configuration")]
    InvalidConfiguration,
    /// An integer conversion failed.
    #[error("arithmetic error: {0}")]
    IntegerError(#[from] std::num::TryFromIntError),
}

/// Parameters fixed at construction for the lifetime of one ORAM instance.
#[derive(Clone, Copy, Debug)]
pub struct OramConfig {
    /// Height of the storage tree. A tree of height `h` has `2^h` leaves.
    pub height: TreeHeight,
    /// Number of slots per bucket.
    pub bucket_capacity: BucketCapacity,
    /// Maximum plaintext length in bytes. Shorter payloads are padded up to
    /// this length before encryption so that every stored record has the same
    /// size regardless of block or content.
    pub max_payload_len: usize,
    /// Bound on the number of blocks held in the stash between accesses.
    pub stash_limit: usize,
}

impl OramConfig {
    /// Returns a configuration with the default bucket capacity and stash limit.
    pub fn new(height: TreeHeight, max_payload_len: usize) -> Self {
        Self {
            height,
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
            max_payload_len,
            stash_limit: DEFAULT_STASH_LIMIT,
        }
    }

    /// The number of nodes in the storage tree, `2^(height + 1) - 1`.
    pub fn tree_size(&self) -> TreeIndex {
        2u64.pow(self.height + 1) - 1
    }

    pub(crate) fn validate(&self) -> Result<(), OramError> {
        if self.height == 0 || self.height > MAXIMUM_TREE_HEIGHT {
            return Err(OramError::InvalidConfiguration);
        }
        if self.bucket_capacity == 0 || self.max_payload_len == 0 {
            return Err(OramError::InvalidConfiguration);
        }
        Ok(())
    }
}
