/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! cw-mock-runtime executes CosmWasm-style contract binaries in-process, against a
//! mock chain held entirely in memory. It compiles uploaded WebAssembly with wasmer,
//! provides the host import set contracts link against (storage, address conversion,
//! chain queries, debug logging), marshals call arguments and results through the
//! region codec, and resolves the sub-messages a call emits depth-first before
//! returning to the caller.
//!
//! The entry point is [Backend]: upload code, instantiate it, then execute and query
//! the resulting instances. A backend is parameterized by an [AbiVariant] selecting
//! between the legacy `init`/`handle` contract generation and the split
//! `instantiate`/`execute` generation.

pub mod address;

pub mod backend;
pub use backend::{Backend, CodeEntry, ContractRecord, InstantiateRequest, UploadReceipt};

pub mod contract;
pub use contract::abi::{AbiVariant, LegacyAbi, SplitAbi};

pub mod error;
pub use error::HostError;

pub mod types;
pub use types::{Binary, Coin, Response, WasmMsg};
