// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains benchmarks for the `oram-store` crate.

extern crate criterion;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use oram_store::{
    Aes256GcmCipher, BucketStore, CountingBucketStore, MemoryBucketStore, OramConfig, PathOram,
    TreeHeight,
};
use rand::{rngs::StdRng, SeedableRng};

const HEIGHTS_TO_BENCHMARK: [TreeHeight; 3] = [4, 8, 12];
const PAYLOAD_LEN: usize = 4096;

fn benchmark_oram<S: BucketStore>(height: TreeHeight) -> PathOram<S, Aes256GcmCipher, StdRng> {
    let mut rng = StdRng::seed_from_u64(0);
    let key = Aes256GcmCipher::generate_key(&mut rng);
    let config = OramConfig::new(height, PAYLOAD_LEN);
    let store = S::new(config.tree_size(), config.bucket_capacity).unwrap();
    PathOram::new(config, store, Aes256GcmCipher::new(&key), rng).unwrap()
}

fn benchmark_write(c: &mut Criterion) {
    let payload = vec![0x5Au8; PAYLOAD_LEN];
    let mut group = c.benchmark_group("write");
    for height in HEIGHTS_TO_BENCHMARK {
        let mut oram = benchmark_oram::<MemoryBucketStore>(height);
        group.bench_with_input(BenchmarkId::from_parameter(height), &height, |bench, _| {
            bench.iter(|| oram.write(black_box("F1"), black_box(&payload)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_read(c: &mut Criterion) {
    let payload = vec![0x5Au8; PAYLOAD_LEN];
    let mut group = c.benchmark_group("read");
    for height in HEIGHTS_TO_BENCHMARK {
        let mut oram = benchmark_oram::<MemoryBucketStore>(height);
        oram.write("F1", &payload).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(height), &height, |bench, _| {
            bench.iter(|| black_box(oram.read(black_box("F1")).unwrap()))
        });
    }
    group.finish();
}

// Not a timing benchmark: reports the physical slot traffic per access, which
// should be exactly (height + 1) * bucket_capacity reads and writes.
fn count_accesses_on_read(_: &mut Criterion) {
    println!("Height, PhysicalReadsPerAccess, PhysicalWritesPerAccess");
    for height in HEIGHTS_TO_BENCHMARK {
        let mut oram = benchmark_oram::<CountingBucketStore>(height);
        oram.write("F1", &[0u8; PAYLOAD_LEN]).unwrap();

        let pre_reads = oram.physical_memory.get_read_count();
        let pre_writes = oram.physical_memory.get_write_count();
        oram.read("F1").unwrap();
        println!(
            "{}, {}, {}",
            height,
            oram.physical_memory.get_read_count() - pre_reads,
            oram.physical_memory.get_write_count() - pre_writes
        );
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().warm_up_time(Duration::new(0, 1_000_000_00)).measurement_time(Duration::new(0, 1_000_000_00)).sample_size(10);
    targets =
    benchmark_write,
    benchmark_read,
    count_accesses_on_read,
);
criterion_main!(benches);
