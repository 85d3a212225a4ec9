/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definition and implementation of the host functions imported by contract modules.
//!
//! Function arguments suffixed with `_ptr` are pointers to region descriptors in
//! guest linear memory; see [crate::contract::wasmer::memory]. Functions returning a
//! pointer allocate a fresh region in the guest; `canonicalize_address` and
//! `humanize_address` instead write into a caller-allocated output region and return
//! the code 0 on success.

use serde_json::Value;

use crate::address;
use crate::contract::abi::AbiVariant;
use crate::contract::wasmer::env::Env;
use crate::contract::wasmer::memory::MemoryContext;
use crate::error::HostError;
use crate::types::SmartQuery;

/// FuncError defines the error returns from execution of host functions. Raising one
/// traps the guest; the instance boundary downcasts it back out of the wasmer
/// runtime error to surface a typed failure.
#[derive(Debug, thiserror::Error)]
pub enum FuncError {
    #[error("region at {ptr} cannot hold {length} bytes (capacity {capacity})")]
    RegionOverflow { ptr: u32, capacity: u32, length: u32 },

    #[error("malformed region descriptor at {0}")]
    MalformedRegion(u32),

    #[error("contract module does not export {0}")]
    MissingExport(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no contract instance at {0}")]
    ContractNotFound(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    /// A nested dispatcher call failed; carries the inner failure unchanged.
    #[error(transparent)]
    Host(Box<HostError>),

    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

/// Looks up the key read from `key_ptr` in the calling contract's storage. Returns a
/// fresh region holding the value, or the sentinel 0 if the key is absent.
pub(crate) fn db_read<A: AbiVariant>(env: &Env<A>, key_ptr: u32) -> Result<u32, FuncError> {
    let key = read_string(env, key_ptr)?;
    let value = env.storage.lock().unwrap().get(&key).cloned();
    match value {
        Some(value) => env.write_to_guest(&value),
        None => Ok(0),
    }
}

/// Stores the value read from `value_ptr` under the key read from `key_ptr`.
pub(crate) fn db_write<A: AbiVariant>(
    env: &Env<A>,
    key_ptr: u32,
    value_ptr: u32,
) -> Result<(), FuncError> {
    let key = read_string(env, key_ptr)?;
    let value = env.read_region(value_ptr)?;
    env.storage.lock().unwrap().insert(key, value);
    Ok(())
}

/// Deletes the key read from `key_ptr`.
pub(crate) fn db_remove<A: AbiVariant>(env: &Env<A>, key_ptr: u32) -> Result<(), FuncError> {
    let key = read_string(env, key_ptr)?;
    env.storage.lock().unwrap().remove(&key);
    Ok(())
}

/// Decodes the bech32 string at `src_ptr` and writes the raw payload bytes into the
/// caller-allocated region at `dst_ptr`.
pub(crate) fn canonicalize_address<A: AbiVariant>(
    env: &Env<A>,
    src_ptr: u32,
    dst_ptr: u32,
) -> Result<u32, FuncError> {
    let human = read_string(env, src_ptr)?;
    let raw = address::canonicalize(human.trim())
        .map_err(|_| FuncError::InvalidAddress(human.trim().to_string()))?;
    env.write_region(dst_ptr, &raw)?;
    Ok(0)
}

/// Encodes the raw bytes at `src_ptr` under the host's address prefix and writes the
/// bech32 string into the caller-allocated region at `dst_ptr`.
pub(crate) fn humanize_address<A: AbiVariant>(
    env: &Env<A>,
    src_ptr: u32,
    dst_ptr: u32,
) -> Result<u32, FuncError> {
    let raw = env.read_region(src_ptr)?;
    let human = address::humanize(&raw, env.backend.address_prefix())
        .map_err(|e| FuncError::InvalidAddress(e.to_string()))?;
    env.write_region(dst_ptr, human.as_bytes())?;
    Ok(0)
}

/// Decodes a tagged chain query and resolves it against the dispatcher. Only the
/// `wasm.smart` variant is supported; the target contract's query result is wrapped
/// back into the nested `Result` envelope contracts expect from the chain querier.
pub(crate) fn query_chain<A: AbiVariant>(env: &Env<A>, request_ptr: u32) -> Result<u32, FuncError> {
    let request: Value = serde_json::from_slice(&env.read_region(request_ptr)?)
        .map_err(|e| FuncError::NotSupported(format!("undecodable chain query: {}", e)))?;
    let smart = request
        .get("wasm")
        .and_then(|wasm| wasm.get("smart"))
        .cloned()
        .ok_or_else(|| {
            FuncError::NotSupported(format!("chain query variant: {}", request))
        })?;
    let query: SmartQuery = serde_json::from_value(smart)
        .map_err(|e| FuncError::NotSupported(format!("wasm.smart query: {}", e)))?;

    let result = env
        .backend
        .query(&query.contract_addr, &query.msg.0)
        .map_err(|e| match e {
            HostError::NoSuchInstance(addr) => FuncError::ContractNotFound(addr),
            other => FuncError::Host(Box::new(other)),
        })?;

    let wrapped = serde_json::json!({ "Ok": { "Ok": result } });
    let bytes = serde_json::to_vec(&wrapped).map_err(|e| FuncError::Runtime(e.into()))?;
    env.write_to_guest(&bytes)
}

/// Forwards the guest's debug string to the logging facade. Never fails.
pub(crate) fn debug<A: AbiVariant>(env: &Env<A>, msg_ptr: u32) -> Result<u32, FuncError> {
    let msg = env.read_region(msg_ptr)?;
    log::debug!("{}: {}", env.contract_address, String::from_utf8_lossy(&msg));
    Ok(0)
}

fn read_string<A: AbiVariant>(env: &Env<A>, ptr: u32) -> Result<String, FuncError> {
    Ok(String::from_utf8_lossy(&env.read_region(ptr)?).into_owned())
}

/// Signature-scheme imports that the host deliberately does not implement. Each one
/// logs a warning and reports success, so contracts that merely reference these
/// primitives can still run; a contract whose logic depends on a verification result
/// will observe success unconditionally.
pub(crate) mod stubs {
    fn skipped(name: &str) -> u32 {
        log::warn!("host import {} is not implemented; returning success", name);
        0
    }

    pub(crate) fn addr_validate(_addr_ptr: u32) -> u32 {
        skipped("addr_validate")
    }

    pub(crate) fn ed25519_verify(_msg_ptr: u32, _sig_ptr: u32, _pubkey_ptr: u32) -> u32 {
        skipped("ed25519_verify")
    }

    pub(crate) fn ed25519_sign(_msg_ptr: u32, _key_ptr: u32) -> u64 {
        skipped("ed25519_sign") as u64
    }

    pub(crate) fn ed25519_batch_verify(_msgs_ptr: u32, _sigs_ptr: u32, _pubkeys_ptr: u32) -> u32 {
        skipped("ed25519_batch_verify")
    }

    pub(crate) fn secp256k1_sign(_msg_ptr: u32, _key_ptr: u32) -> u64 {
        skipped("secp256k1_sign") as u64
    }

    pub(crate) fn secp256k1_verify(_hash_ptr: u32, _sig_ptr: u32, _pubkey_ptr: u32) -> u32 {
        skipped("secp256k1_verify")
    }

    pub(crate) fn secp256k1_recover_pubkey(
        _hash_ptr: u32,
        _sig_ptr: u32,
        _recovery_param: u32,
    ) -> u64 {
        skipped("secp256k1_recover_pubkey") as u64
    }
}

pub(crate) mod imports {
    //! The import tables handed to guest modules at instantiation, one per ABI
    //! variant. Both tables are written out in full; wasmer import objects do not
    //! compose well and the duplication keeps each table readable on its own.

    use wasmer::{imports, Function, ImportObject, Store};

    use super::stubs;
    use crate::contract::abi::AbiVariant;
    use crate::contract::wasmer::env::Env;

    /// Import set expected by legacy (single-message ABI) contracts.
    pub(crate) fn base<A: AbiVariant>(store: &Store, env: &Env<A>) -> ImportObject {
        imports! {
            "env" => {
                "db_read" => Function::new_native_with_env(store, env.clone(), super::db_read::<A>),
                "db_write" => Function::new_native_with_env(store, env.clone(), super::db_write::<A>),
                "db_remove" => Function::new_native_with_env(store, env.clone(), super::db_remove::<A>),
                "canonicalize_address" => Function::new_native_with_env(store, env.clone(), super::canonicalize_address::<A>),
                "humanize_address" => Function::new_native_with_env(store, env.clone(), super::humanize_address::<A>),
                "query_chain" => Function::new_native_with_env(store, env.clone(), super::query_chain::<A>),
                "debug" => Function::new_native_with_env(store, env.clone(), super::debug::<A>),
            }
        }
    }

    /// Import set expected by split-ABI contracts: the base set plus the
    /// signature-scheme stubs.
    pub(crate) fn extended<A: AbiVariant>(store: &Store, env: &Env<A>) -> ImportObject {
        imports! {
            "env" => {
                "db_read" => Function::new_native_with_env(store, env.clone(), super::db_read::<A>),
                "db_write" => Function::new_native_with_env(store, env.clone(), super::db_write::<A>),
                "db_remove" => Function::new_native_with_env(store, env.clone(), super::db_remove::<A>),
                "canonicalize_address" => Function::new_native_with_env(store, env.clone(), super::canonicalize_address::<A>),
                "humanize_address" => Function::new_native_with_env(store, env.clone(), super::humanize_address::<A>),
                "query_chain" => Function::new_native_with_env(store, env.clone(), super::query_chain::<A>),
                "debug" => Function::new_native_with_env(store, env.clone(), super::debug::<A>),

                "addr_validate" => Function::new_native(store, stubs::addr_validate),
                "ed25519_verify" => Function::new_native(store, stubs::ed25519_verify),
                "ed25519_sign" => Function::new_native(store, stubs::ed25519_sign),
                "ed25519_batch_verify" => Function::new_native(store, stubs::ed25519_batch_verify),
                "secp256k1_sign" => Function::new_native(store, stubs::secp256k1_sign),
                "secp256k1_verify" => Function::new_native(store, stubs::secp256k1_verify),
                "secp256k1_recover_pubkey" => Function::new_native(store, stubs::secp256k1_recover_pubkey),
            }
        }
    }
}
