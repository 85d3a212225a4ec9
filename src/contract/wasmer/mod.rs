/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wasmer-specific plumbing: the host [env] passed to imported functions, the region
//! codec over guest linear [memory], and [store] instantiation.

pub mod env;

pub mod memory;

pub mod store;
