/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the runtime wrapper around one loaded contract: its wasmer instance plus
//! its private storage, with entry points that marshal arguments through the region
//! codec and decode the guest's `Result`-shaped JSON response.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use wasmer::{Memory, NativeFunc};

use crate::contract::functions::FuncError;
use crate::contract::wasmer::env::Storage;
use crate::contract::wasmer::memory::MemoryContext;
use crate::error::HostError;
use crate::types::Response;

/// ContractInstance is the stateful counterpart of a contract record: one loaded
/// module plus the storage map only this contract may touch.
#[derive(Clone)]
pub(crate) struct ContractInstance {
    pub address: String,
    pub code_hash: String,
    pub storage: Arc<Mutex<Storage>>,
    instance: wasmer::Instance,
}

impl ContractInstance {
    pub fn new(
        address: String,
        code_hash: String,
        storage: Arc<Mutex<Storage>>,
        instance: wasmer::Instance,
    ) -> Self {
        Self {
            address,
            code_hash,
            storage,
            instance,
        }
    }

    /// Invoke a state-changing entry point (init or execute, as named by the ABI
    /// variant) and decode the response envelope into a [Response].
    pub fn call(
        &self,
        export: &str,
        env: &Value,
        info: Option<&Value>,
        msg: &[u8],
    ) -> Result<Response, HostError> {
        let ok = self.call_envelope(export, Some(env), info, msg)?;
        Response::from_ok(&self.address, export, ok)
    }

    /// Invoke the query entry point. Queries take no `info` and their `Ok` payload is
    /// handed back verbatim rather than parsed as a response.
    pub fn query(&self, export: &str, env: Option<&Value>, msg: &[u8]) -> Result<Value, HostError> {
        self.call_envelope(export, env, None, msg)
    }

    fn call_envelope(
        &self,
        export: &str,
        env: Option<&Value>,
        info: Option<&Value>,
        msg: &[u8],
    ) -> Result<Value, HostError> {
        let mut args = Vec::with_capacity(3);
        if let Some(env) = env {
            args.push(self.pass_json(env).map_err(|e| self.surface(e))?);
        }
        if let Some(info) = info {
            args.push(self.pass_json(info).map_err(|e| self.surface(e))?);
        }
        args.push(self.write_to_guest(msg).map_err(|e| self.surface(e))?);

        let response_ptr = self.call_export(export, &args)?;
        let bytes = self.read_region(response_ptr).map_err(|e| self.surface(e))?;
        self.try_deallocate(response_ptr);

        let envelope: Value =
            serde_json::from_slice(&bytes).map_err(|_| HostError::MalformedResult {
                address: self.address.clone(),
                action: export.to_string(),
            })?;
        // the envelope must hold exactly one of Ok / Err
        match (envelope.get("Ok"), envelope.get("Err")) {
            (Some(ok), None) => Ok(ok.clone()),
            (None, Some(err)) => Err(HostError::ContractError {
                address: self.address.clone(),
                action: export.to_string(),
                payload: err.clone(),
            }),
            _ => Err(HostError::MalformedResult {
                address: self.address.clone(),
                action: export.to_string(),
            }),
        }
    }

    /// Call a guest export taking 1 to 3 region pointers and returning one.
    fn call_export(&self, export: &str, args: &[u32]) -> Result<u32, HostError> {
        let exports = &self.instance.exports;
        let missing = |_| HostError::InvalidModule(format!(
            "contract {} does not export {}",
            self.address, export
        ));
        let called = match *args {
            [msg] => exports
                .get_native_function::<u32, u32>(export)
                .map_err(missing)?
                .call(msg),
            [env, msg] => exports
                .get_native_function::<(u32, u32), u32>(export)
                .map_err(missing)?
                .call(env, msg),
            [env, info, msg] => exports
                .get_native_function::<(u32, u32, u32), u32>(export)
                .map_err(missing)?
                .call(env, info, msg),
            _ => unreachable!("entry points take between one and three pointers"),
        };
        called.map_err(|trap| HostError::from_guest_trap(&self.address, export, trap))
    }

    /// Hand a response region back to the guest allocator. Contracts without a
    /// deallocator export are tolerated silently.
    fn try_deallocate(&self, ptr: u32) {
        if let Ok(deallocate) = self
            .instance
            .exports
            .get_native_function::<u32, ()>("deallocate")
        {
            let _ = deallocate.call(ptr);
        }
    }

    /// Translate a marshaling failure on the host side of the boundary.
    fn surface(&self, e: FuncError) -> HostError {
        match e {
            FuncError::RegionOverflow {
                capacity, length, ..
            } => HostError::RegionOverflow { capacity, length },
            FuncError::MissingExport(name) => HostError::InvalidModule(format!(
                "contract {} does not export {}",
                self.address, name
            )),
            FuncError::MalformedRegion(ptr) => HostError::Runtime(anyhow::anyhow!(
                "contract {}: malformed region descriptor at {}",
                self.address,
                ptr
            )),
            other => HostError::Runtime(anyhow::anyhow!("contract {}: {}", self.address, other)),
        }
    }
}

impl MemoryContext for ContractInstance {
    // Exports are resolved fresh on every access: recursive sub-message dispatch can
    // re-enter this instance before an outer call has returned, and memory may have
    // grown in between.
    fn memory(&self) -> Result<Memory, FuncError> {
        self.instance
            .exports
            .get_memory("memory")
            .map(Clone::clone)
            .map_err(|_| FuncError::MissingExport("memory".to_string()))
    }

    fn allocator(&self) -> Result<NativeFunc<u32, u32>, FuncError> {
        self.instance
            .exports
            .get_native_function::<u32, u32>("allocate")
            .map_err(|_| FuncError::MissingExport("allocate".to_string()))
    }
}
