/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! backend defines the dispatcher that owns the registries of uploaded code and live
//! contract instances, performs calls, and recursively resolves the sub-messages a
//! call produced before returning control to the original caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::address;
use crate::contract::abi::AbiVariant;
use crate::contract::wasmer::env::{Env, Storage};
use crate::contract::{ContractInstance, ContractModule};
use crate::error::HostError;
use crate::types::{CallContext, Coin, Response, WasmMsg};

/// One uploaded code blob. Created on upload, immutable thereafter, never deleted
/// within a process lifetime.
#[derive(Clone, Debug)]
pub struct CodeEntry {
    pub code_id: u64,
    pub code_hash: String,
    pub bytes: Vec<u8>,
}

/// What an upload hands back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub code_id: u64,
    pub code_hash: String,
}

/// The durable half of an instantiated contract. The address is generated once and
/// never changes; neither do the label or the code reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractRecord {
    pub address: String,
    pub code_id: u64,
    pub code_hash: String,
    pub label: String,
}

/// Parameters of an instantiate call.
#[derive(Clone, Debug)]
pub struct InstantiateRequest {
    pub code_id: u64,
    pub code_hash: String,
    pub label: String,
    pub msg: Vec<u8>,
    pub funds: Vec<Coin>,
}

/// Registries owned exclusively by the dispatcher. The lock around them is only ever
/// held for lookups and registration, never while guest code runs, so recursive
/// dispatch cannot deadlock on it.
#[derive(Default)]
struct State {
    uploads: BTreeMap<u64, CodeEntry>,
    instances: HashMap<String, ContractInstance>,
    records: HashMap<String, ContractRecord>,
    code_id_for_hash: HashMap<String, u64>,
}

/// Backend is the mock chain: it executes contract binaries in-process against
/// per-contract storage, with no node, no consensus and no gas accounting.
///
/// All registries live inside this value. Independent test runs get independent
/// Backends; there is no process-wide state.
#[derive(Clone)]
pub struct Backend<A: AbiVariant> {
    state: Arc<Mutex<State>>,
    abi: A,
    chain_id: String,
    prefix: String,
}

impl<A: AbiVariant> Backend<A> {
    pub fn new(abi: A, chain_id: impl Into<String>, prefix: impl Into<String>) -> Self {
        Backend {
            state: Arc::new(Mutex::new(State::default())),
            abi,
            chain_id: chain_id.into(),
            prefix: prefix.into(),
        }
    }

    /// The human-readable prefix under which this backend mints and encodes
    /// contract addresses.
    pub fn address_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Store a compiled module blob and assign it the next code id. Pure append;
    /// uploading identical bytes twice yields two ids sharing one hash.
    pub fn upload(&self, bytes: &[u8]) -> Result<UploadReceipt, HostError> {
        if bytes.is_empty() {
            return Err(HostError::EmptyCode);
        }
        let code_hash = hex::encode(Sha256::digest(bytes));
        let mut state = self.state.lock().unwrap();
        let code_id = state.uploads.keys().next_back().map_or(1, |last| last + 1);
        state.code_id_for_hash.entry(code_hash.clone()).or_insert(code_id);
        state.uploads.insert(
            code_id,
            CodeEntry {
                code_id,
                code_hash: code_hash.clone(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(UploadReceipt { code_id, code_hash })
    }

    /// Pre-seed the code registry, e.g. from persisted deployment receipts. Freshly
    /// uploaded ids continue one past the highest seeded id.
    pub fn restore_codes(&self, entries: impl IntoIterator<Item = CodeEntry>) {
        let mut state = self.state.lock().unwrap();
        for entry in entries {
            state
                .code_id_for_hash
                .entry(entry.code_hash.clone())
                .or_insert(entry.code_id);
            state.uploads.insert(entry.code_id, entry);
        }
    }

    /// Compile the referenced code, mint an address, run the guest's init entry
    /// point, register the new contract, then resolve any sub-messages it emitted.
    pub fn instantiate(
        &self,
        sender: &str,
        req: InstantiateRequest,
    ) -> Result<ContractRecord, HostError> {
        let entry = {
            let state = self.state.lock().unwrap();
            state
                .uploads
                .get(&req.code_id)
                .cloned()
                .ok_or(HostError::NoSuchCode(req.code_id))?
        };

        let module = ContractModule::from_bytes(&entry.bytes)?;
        let contract_address = self.fresh_address();
        let storage = Arc::new(Mutex::new(Storage::new()));
        let env = Env::new(self.clone(), storage.clone(), contract_address.clone());
        let imports = self.abi.imports(module.store(), &env);
        let instance = module.instantiate(&imports)?;
        let contract = ContractInstance::new(
            contract_address.clone(),
            entry.code_hash.clone(),
            storage,
            instance,
        );

        let ctx = self.call_context(sender, &contract_address, req.funds);
        let response = contract.call(
            self.abi.init_export(),
            &self.abi.call_env(&ctx),
            self.abi.call_info(&ctx).as_ref(),
            &req.msg,
        )?;

        let record = ContractRecord {
            address: contract_address.clone(),
            code_id: entry.code_id,
            code_hash: entry.code_hash,
            label: req.label,
        };
        {
            // registered before sub-message resolution, so children can already
            // query their parent
            let mut state = self.state.lock().unwrap();
            state.instances.insert(contract_address.clone(), contract);
            state.records.insert(contract_address.clone(), record.clone());
        }

        self.resolve_messages(&contract_address, &response.messages)?;
        Ok(record)
    }

    /// Run the guest's execute entry point, then resolve any sub-messages it
    /// emitted. The returned response carries its `data` already decoded.
    pub fn execute(&self, sender: &str, address: &str, msg: &[u8]) -> Result<Response, HostError> {
        self.execute_with_funds(sender, address, msg, Vec::new())
    }

    pub fn execute_with_funds(
        &self,
        sender: &str,
        address: &str,
        msg: &[u8],
        funds: Vec<Coin>,
    ) -> Result<Response, HostError> {
        let contract = self.instance(address)?;
        let ctx = self.call_context(sender, address, funds);
        let response = contract.call(
            self.abi.execute_export(),
            &self.abi.call_env(&ctx),
            self.abi.call_info(&ctx).as_ref(),
            msg,
        )?;
        self.resolve_messages(address, &response.messages)?;
        Ok(response)
    }

    /// Run the guest's query entry point. Read-only: no info argument, and queries
    /// produce no sub-messages to resolve.
    pub fn query(&self, address: &str, msg: &[u8]) -> Result<Value, HostError> {
        let contract = self.instance(address)?;
        let env = if self.abi.query_takes_env() {
            let ctx = self.call_context("", address, Vec::new());
            Some(self.abi.call_env(&ctx))
        } else {
            None
        };
        contract.query(self.abi.query_export(), env.as_ref(), msg)
    }

    /// Read one key out of a contract's storage, for inspection from outside the
    /// call path (tests, harnesses).
    pub fn storage_read(&self, address: &str, key: &str) -> Result<Option<Vec<u8>>, HostError> {
        let contract = self.instance(address)?;
        let value = contract.storage.lock().unwrap().get(key).cloned();
        Ok(value)
    }

    pub fn record_of(&self, address: &str) -> Option<ContractRecord> {
        self.state.lock().unwrap().records.get(address).cloned()
    }

    pub fn label_of(&self, address: &str) -> Option<String> {
        self.record_of(address).map(|record| record.label)
    }

    /// Every contract instantiated so far, in no particular order.
    pub fn contracts(&self) -> Vec<ContractRecord> {
        self.state.lock().unwrap().records.values().cloned().collect()
    }

    pub fn code_entry(&self, code_id: u64) -> Option<CodeEntry> {
        self.state.lock().unwrap().uploads.get(&code_id).cloned()
    }

    /// Resolve the messages a successful call embedded in its response: in list
    /// order, depth-first, before control returns to the original caller. The
    /// emitting contract acts as the sender of every message it produced. Non-wasm
    /// messages belong to chain modules this host does not simulate; they are logged
    /// and skipped rather than failing the call.
    fn resolve_messages(&self, emitter: &str, messages: &[Value]) -> Result<(), HostError> {
        for message in messages {
            let Some(wasm) = message.get("wasm") else {
                log::info!(
                    "skipping sub-message from {} addressed to a module this host does not simulate: {}",
                    emitter,
                    message
                );
                continue;
            };
            let decoded: WasmMsg = serde_json::from_value(wasm.clone()).map_err(|e| {
                HostError::NotSupported(format!("wasm sub-message from {}: {}", emitter, e))
            })?;
            match decoded {
                WasmMsg::Instantiate {
                    code_id,
                    callback_code_hash,
                    label,
                    msg,
                    send,
                } => {
                    let code_id = self.resolve_code_id(code_id, &callback_code_hash)?;
                    self.instantiate(
                        emitter,
                        InstantiateRequest {
                            code_id,
                            code_hash: callback_code_hash,
                            label,
                            msg: msg.0,
                            funds: send,
                        },
                    )?;
                }
                WasmMsg::Execute {
                    contract_addr,
                    msg,
                    send,
                    ..
                } => {
                    self.execute_with_funds(emitter, &contract_addr, &msg.0, send)?;
                }
            }
        }
        Ok(())
    }

    /// Sub-messages may reference code by hash alone; fall back to the hash
    /// registry when the embedded id is unknown.
    fn resolve_code_id(&self, code_id: u64, code_hash: &str) -> Result<u64, HostError> {
        let state = self.state.lock().unwrap();
        if state.uploads.contains_key(&code_id) {
            return Ok(code_id);
        }
        if !code_hash.is_empty() {
            if let Some(id) = state.code_id_for_hash.get(code_hash) {
                return Ok(*id);
            }
        }
        Err(HostError::NoSuchCode(code_id))
    }

    fn instance(&self, address: &str) -> Result<ContractInstance, HostError> {
        self.state
            .lock()
            .unwrap()
            .instances
            .get(address)
            .cloned()
            .ok_or_else(|| HostError::NoSuchInstance(address.to_string()))
    }

    /// Mint an address no live instance holds. Regenerates on collision for the
    /// lifetime of the process.
    fn fresh_address(&self) -> String {
        let state = self.state.lock().unwrap();
        loop {
            let candidate = address::generate(&self.prefix);
            if !state.instances.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn call_context(&self, sender: &str, contract_address: &str, funds: Vec<Coin>) -> CallContext {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        CallContext {
            height: now_ms / 5000,
            time: now_ms / 1000,
            chain_id: self.chain_id.clone(),
            contract_address: contract_address.to_string(),
            sender: sender.to_string(),
            funds,
        }
    }
}
