// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A very simple demonstration of the use of the oblivious store.

extern crate oram_store;

use oram_store::{
    Aes256GcmCipher, BucketStore, MemoryBucketStore, OramConfig, OramError, PathOram,
};
use rand::rngs::OsRng;

fn main() -> Result<(), OramError> {
    let mut rng = OsRng;
    let key = Aes256GcmCipher::generate_key(&mut rng);

    let config = OramConfig::new(3, 64);
    let store = MemoryBucketStore::new(config.tree_size(), config.bucket_capacity)?;
    let mut oram = PathOram::new(config, store, Aes256GcmCipher::new(&key), rng)?;

    oram.write("greeting", b"hello, oblivious world")?;
    println!("{}", String::from_utf8_lossy(&oram.read("greeting")?));
    Ok(())
}
