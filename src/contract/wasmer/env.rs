/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the environment used for constructing the Wasm (specifically Wasmer)
//! instance of a contract.
//!
//! The environment (Env) gives the imported host functions access to the calling
//! contract's private storage and, for chain queries, to the dispatcher that owns
//! every live instance.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use wasmer::{LazyInit, Memory, NativeFunc};

use crate::backend::Backend;
use crate::contract::abi::AbiVariant;
use crate::contract::functions::FuncError;
use crate::contract::wasmer::memory::MemoryContext;

/// A contract's private key-value store. Exclusively owned by its instance; other
/// instances reach it only through sub-messages and query calls, never directly.
pub(crate) type Storage = BTreeMap<String, Vec<u8>>;

/// Env provides the functions in `exports` (which are in turn 'imported' by WASM
/// contracts) access to functionality that cannot cross the host-WASM barrier.
#[derive(wasmer::WasmerEnv, Clone)]
pub(crate) struct Env<A>
where
    A: AbiVariant,
{
    /// Handle back into the dispatcher, for recursive chain queries.
    pub backend: Backend<A>,

    /// The calling contract's storage.
    pub storage: Arc<Mutex<Storage>>,

    /// The calling contract's address, for log attribution.
    pub contract_address: String,

    #[wasmer(export)]
    pub memory: LazyInit<Memory>,

    #[wasmer(export(name = "allocate"))]
    pub allocate: LazyInit<NativeFunc<u32, u32>>,
}

impl<A: AbiVariant> Env<A> {
    pub fn new(backend: Backend<A>, storage: Arc<Mutex<Storage>>, contract_address: String) -> Self {
        Env {
            backend,
            storage,
            contract_address,
            memory: LazyInit::default(),
            allocate: LazyInit::default(),
        }
    }
}

impl<A: AbiVariant> MemoryContext for Env<A> {
    fn memory(&self) -> Result<Memory, FuncError> {
        self.memory
            .get_ref()
            .cloned()
            .ok_or_else(|| FuncError::MissingExport("memory".to_string()))
    }

    fn allocator(&self) -> Result<NativeFunc<u32, u32>, FuncError> {
        self.allocate
            .get_ref()
            .cloned()
            .ok_or_else(|| FuncError::MissingExport("allocate".to_string()))
    }
}
