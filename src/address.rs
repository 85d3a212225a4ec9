/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! address converts between raw byte addresses and their bech32 string form, and
//! generates fresh addresses for newly instantiated contracts.

use bech32::{FromBase32, ToBase32, Variant};
use rand::Rng;

use crate::error::HostError;

/// Byte length of generated contract account addresses.
const ACCOUNT_BYTES: usize = 20;

/// Decode a bech32 string into its raw payload bytes.
///
/// The human-readable prefix is accepted as-is rather than checked against an
/// expected value; contracts routinely canonicalize addresses from foreign chains.
pub fn canonicalize(human: &str) -> Result<Vec<u8>, HostError> {
    let (_, data, _) =
        bech32::decode(human).map_err(|e| HostError::InvalidAddress(format!("{}: {}", human, e)))?;
    Vec::<u8>::from_base32(&data)
        .map_err(|e| HostError::InvalidAddress(format!("{}: {}", human, e)))
}

/// Encode raw payload bytes into the checksummed bech32 form under `prefix`.
pub fn humanize(raw: &[u8], prefix: &str) -> Result<String, HostError> {
    bech32::encode(prefix, raw.to_base32(), Variant::Bech32)
        .map_err(|e| HostError::InvalidAddress(format!("prefix {}: {}", prefix, e)))
}

/// Produce a pseudo-random valid address under `prefix`.
///
/// Collision checking against the live instance registry is the caller's job;
/// see [crate::backend::Backend].
pub fn generate(prefix: &str) -> String {
    let mut raw = [0u8; ACCOUNT_BYTES];
    rand::thread_rng().fill(&mut raw[..]);
    // Encoding fixed-length random bytes under a valid prefix cannot fail.
    humanize(&raw, prefix).expect("bech32 encoding of generated address")
}
