/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a struct wrapping [wasmer::Module] to work with compiled contract bytecode.

use wasmer::{ImportObject, Store};

use crate::contract::wasmer::store;
use crate::error::HostError;

/// ContractModule is a WebAssembly executable compiled down to machine code in
/// preparation for instantiation. A fresh module (with its own store) is compiled for
/// every instantiated contract.
pub(crate) struct ContractModule {
    store: Store,
    module: wasmer::Module,
}

impl ContractModule {
    pub fn from_bytes(bytecode: &[u8]) -> Result<Self, HostError> {
        let store = store::instantiate_store();
        let module = wasmer::Module::from_binary(&store, bytecode)
            .map_err(|e| HostError::InvalidModule(e.to_string()))?;
        Ok(Self { store, module })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn instantiate(&self, imports: &ImportObject) -> Result<wasmer::Instance, HostError> {
        wasmer::Instance::new(&self.module, imports)
            .map_err(|e| HostError::InvalidModule(e.to_string()))
    }
}
