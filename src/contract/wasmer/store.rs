/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Store instantiation for contract compilation.

use wasmer::Store;
use wasmer_compiler_singlepass::Singlepass;
use wasmer_engine_universal::Universal;

/// Instantiate a Store that holds the states manipulated by a WASM program.
///
/// Uses the Singlepass compiler, which is optimised for fast compilation; the host
/// compiles a fresh module per instantiated contract, so compile speed dominates.
pub fn instantiate_store() -> Store {
    let compiler_config = Singlepass::new();
    let engine = Universal::new(compiler_config).engine();
    Store::new(&engine)
}
