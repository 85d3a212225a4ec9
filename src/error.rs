/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines the failures a host call can surface to the external caller.

use crate::contract::FuncError;

/// Descriptive error definitions of a host call.
///
/// `ContractError` and `MalformedResult` represent contract-logic failures and always
/// propagate to the original caller; they are never retried or swallowed.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No uploaded code carries this code id.
    #[error("no uploaded code with id {0}")]
    NoSuchCode(u64),

    /// No live contract instance is registered under this address.
    #[error("no contract instance at address {0}")]
    NoSuchInstance(String),

    /// A bech32 address failed to decode (checksum or charset violation).
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// More bytes were written into a guest region than its capacity allows.
    #[error("region overflow: {length} bytes do not fit into capacity {capacity}")]
    RegionOverflow { capacity: u32, length: u32 },

    /// The guest returned a result envelope holding neither `Ok` nor `Err`.
    #[error("contract {address} returned a malformed result for {action}")]
    MalformedResult { address: String, action: String },

    /// The guest returned `Err`; carries the raw payload and the failing call.
    #[error("contract {address} failed in {action}: {payload}")]
    ContractError {
        address: String,
        action: String,
        payload: serde_json::Value,
    },

    /// Unrecognized query or message variant.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Upload was given an empty byte blob.
    #[error("cannot upload empty code")]
    EmptyCode,

    /// The bytes do not compile, or the module lacks a required export
    /// (memory, allocator, or the entry point named by the ABI variant).
    #[error("not a valid contract module: {0}")]
    InvalidModule(String),

    /// Any other trap raised while guest code was running.
    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

impl HostError {
    /// Recover the typed failure a host function raised inside a guest trap.
    ///
    /// Host functions fail by trapping the guest with a [FuncError]; wasmer hands the
    /// trap back as a `RuntimeError`, which is downcast here to restore the original
    /// error instead of reporting an opaque trap.
    pub(crate) fn from_guest_trap(address: &str, action: &str, trap: wasmer::RuntimeError) -> Self {
        match trap.downcast::<FuncError>() {
            Ok(FuncError::RegionOverflow {
                capacity, length, ..
            }) => HostError::RegionOverflow { capacity, length },
            Ok(FuncError::InvalidAddress(addr)) => HostError::InvalidAddress(addr),
            Ok(FuncError::ContractNotFound(addr)) => HostError::NoSuchInstance(addr),
            Ok(FuncError::NotSupported(what)) => HostError::NotSupported(what),
            Ok(FuncError::Host(inner)) => *inner,
            Ok(other) => HostError::Runtime(anyhow::anyhow!(
                "contract {} trapped in {}: {}",
                address,
                action,
                other
            )),
            Err(trap) => HostError::Runtime(anyhow::anyhow!(
                "contract {} trapped in {}: {}",
                address,
                action,
                trap
            )),
        }
    }
}
