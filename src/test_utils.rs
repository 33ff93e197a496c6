// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities: a shared logger and mirror-array workloads run
//! against ORAM instances over different stores and tree shapes.

use crate::{
    bucket_store::BucketStore, crypto::Aes256GcmCipher, path_oram::PathOram, BucketCapacity,
    OramConfig, OramError, TreeHeight, DEFAULT_STASH_LIMIT,
};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use simplelog::{Config, WriteLogger};
use std::collections::HashMap;
use std::sync::Once;

static INIT: Once = Once::new();

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

const WORKLOAD_MAX_PAYLOAD_LEN: usize = 24;

fn workload_oram<S: BucketStore>(
    height: TreeHeight,
    bucket_capacity: BucketCapacity,
) -> PathOram<S, Aes256GcmCipher, StdRng> {
    let mut key_rng = StdRng::seed_from_u64(0xBEEF);
    let key = Aes256GcmCipher::generate_key(&mut key_rng);
    let config = OramConfig {
        height,
        bucket_capacity,
        max_payload_len: WORKLOAD_MAX_PAYLOAD_LEN,
        stash_limit: DEFAULT_STASH_LIMIT,
    };
    let store = S::new(config.tree_size(), bucket_capacity).unwrap();
    let rng = StdRng::seed_from_u64(1);
    PathOram::new(config, store, Aes256GcmCipher::new(&key), rng).unwrap()
}

/// Runs a workload of random reads and writes over as many blocks as the tree
/// has leaves, checking every result against a trusted mirror.
pub(crate) fn test_correctness_random_workload<S: BucketStore>(
    height: TreeHeight,
    bucket_capacity: BucketCapacity,
    num_operations: u32,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = workload_oram::<S>(height, bucket_capacity);
    let block_count = 2u64.pow(height);
    let mut mirror: HashMap<String, Vec<u8>> = HashMap::new();

    for _ in 0..num_operations {
        let id = format!("block{}", rng.gen_range(0..block_count));
        let read_versus_write = rng.gen::<bool>();

        if read_versus_write {
            match mirror.get(&id) {
                Some(expected) => assert_eq!(&oram.read(&id).unwrap(), expected),
                None => assert!(matches!(oram.read(&id), Err(OramError::BlockNotFound))),
            }
        } else {
            let mut payload = vec![0u8; rng.gen_range(0..=WORKLOAD_MAX_PAYLOAD_LEN)];
            rng.fill_bytes(&mut payload);
            oram.write(&id, &payload).unwrap();
            mirror.insert(id, payload);
        }
    }

    for (id, expected) in &mirror {
        assert_eq!(&oram.read(id).unwrap(), expected, "{id}");
    }
}

/// Runs repeated sequential passes over the block space, checking every result
/// against a trusted mirror.
pub(crate) fn test_correctness_linear_workload<S: BucketStore>(
    height: TreeHeight,
    bucket_capacity: BucketCapacity,
    num_operations: u32,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = workload_oram::<S>(height, bucket_capacity);
    let block_count = 2u64.pow(height);
    let mut mirror: HashMap<String, Vec<u8>> = HashMap::new();

    let num_passes = num_operations / (block_count as u32);
    for _ in 0..num_passes {
        for index in 0..block_count {
            let id = format!("block{index}");
            let read_versus_write = rng.gen::<bool>();

            if read_versus_write && mirror.contains_key(&id) {
                assert_eq!(&oram.read(&id).unwrap(), &mirror[&id]);
            } else {
                let mut payload = vec![0u8; rng.gen_range(0..=WORKLOAD_MAX_PAYLOAD_LEN)];
                rng.fill_bytes(&mut payload);
                oram.write(&id, &payload).unwrap();
                mirror.insert(id, payload);
            }
        }
    }

    for (id, expected) in &mirror {
        assert_eq!(&oram.read(id).unwrap(), expected, "{id}");
    }
}

macro_rules! create_correctness_tests {
    ($store_type: ident, $height: expr, $capacity: expr, $iterations: expr) => {
        paste::paste! {
            #[test]
            fn [<random_workload_ $store_type:snake _ $height _ $capacity _ $iterations>]() {
                test_correctness_random_workload::<$store_type>($height, $capacity, $iterations);
            }

            #[test]
            fn [<linear_workload_ $store_type:snake _ $height _ $capacity _ $iterations>]() {
                test_correctness_linear_workload::<$store_type>($height, $capacity, $iterations);
            }
        }
    };
}

pub(crate) use create_correctness_tests;
