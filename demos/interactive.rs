// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A simple interactive demonstration of the oblivious store.

use oram_store::{
    Aes256GcmCipher, BucketStore, MemoryBucketStore, OramConfig, OramError, PathOram,
};
use rand::rngs::OsRng;
use rustyline::history::FileHistory;
use rustyline::Editor;

fn parse_number(
    prompt: &str,
    rl: &mut Editor<(), FileHistory>,
) -> Result<u32, Box<dyn std::error::Error>> {
    Ok(loop {
        println!("{}", prompt);
        println!();
        let readline: String = rl.readline("> ")?;
        let number_parse = readline.parse::<u32>();
        match number_parse {
            Ok(number) => break number,
            Err(_) => {
                println!("Expected a number. Try again.");
                continue;
            }
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = OsRng;
    let key = Aes256GcmCipher::generate_key(&mut rng);

    let mut rl = Editor::<(), _>::new().unwrap();

    let height = parse_number("Tree height? (3 gives 8 leaves)", &mut rl)?;
    let max_len = parse_number("Maximum payload length in bytes?", &mut rl)?;

    let config = OramConfig::new(height, max_len as usize);
    let store = MemoryBucketStore::new(config.tree_size(), config.bucket_capacity)?;
    let mut oram = PathOram::new(config, store, Aes256GcmCipher::new(&key), rng)?;

    loop {
        let action = loop {
            println!("Enter an option (R or W):");
            println!("R) Read");
            println!("W) Write");
            let action: String = rl.readline("> ")?;
            if (action != "R") & (action != "W") {
                println!("Try again.");
                continue;
            }
            break action;
        };

        println!("Block name?");
        let name: String = rl.readline("> ")?;

        if action == "R" {
            match oram.read(&name) {
                Ok(payload) => {
                    println!("Block {} holds {}.", name, String::from_utf8_lossy(&payload))
                }
                Err(OramError::BlockNotFound) => println!("No block named {}.", name),
                Err(error) => return Err(error.into()),
            }
        }

        if action == "W" {
            println!("Payload to write?");
            let payload: String = rl.readline("> ")?;
            match oram.write(&name, payload.as_bytes()) {
                Ok(()) => println!("Wrote {} bytes to block {}.", payload.len(), name),
                Err(OramError::PayloadSizeMismatch { expected, actual }) => {
                    println!("Payload too long: {} bytes, the maximum is {}.", actual, expected)
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}
