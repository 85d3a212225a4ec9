/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines types and functions for loading, instantiating and calling (WASM) contract
//! binaries: the [abi] variant descriptors, the host [functions] imported by guests,
//! the per-contract [instance] wrapper and the compiled [module], with the
//! wasmer-specific plumbing under [wasmer].

pub mod abi;

pub mod functions;
pub use functions::FuncError;

pub mod instance;
pub(crate) use instance::*;

pub mod module;
pub(crate) use module::*;

pub mod wasmer;
