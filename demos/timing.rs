// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Measures cumulative wall-clock time across repeated write/read cycles and
//! prints an (iteration, cumulative seconds) table. Timing is a reporting
//! harness only; it is not part of the obliviousness guarantee.

use oram_store::{
    Aes256GcmCipher, BucketStore, MemoryBucketStore, OramConfig, OramError, PathOram,
};
use rand::{rngs::OsRng, RngCore};
use std::time::{Duration, Instant};

const ITERATIONS: u32 = 100;
const PAYLOAD_LEN: usize = 4096;

fn main() -> Result<(), OramError> {
    let mut rng = OsRng;
    let key = Aes256GcmCipher::generate_key(&mut rng);

    let config = OramConfig::new(3, PAYLOAD_LEN);
    let store = MemoryBucketStore::new(config.tree_size(), config.bucket_capacity)?;
    let mut oram = PathOram::new(config, store, Aes256GcmCipher::new(&key), rng)?;

    let mut payload = vec![0u8; PAYLOAD_LEN];
    OsRng.fill_bytes(&mut payload);

    let mut cumulative_write = Duration::ZERO;
    let mut cumulative_read = Duration::ZERO;

    println!(
        "{:>9}  {:>20}  {:>20}",
        "iteration", "cum. write (s)", "cum. read (s)"
    );
    for iteration in 1..=ITERATIONS {
        let start = Instant::now();
        oram.write("F1", &payload)?;
        cumulative_write += start.elapsed();

        let start = Instant::now();
        let returned = oram.read("F1")?;
        cumulative_read += start.elapsed();
        assert_eq!(returned, payload);

        println!(
            "{:>9}  {:>20.4}  {:>20.4}",
            iteration,
            cumulative_write.as_secs_f64(),
            cumulative_read.as_secs_f64()
        );
    }
    Ok(())
}
