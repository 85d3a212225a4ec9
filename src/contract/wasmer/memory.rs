/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the region codec: every byte buffer crossing the host/guest boundary is
//! described by a fixed 3-word descriptor in guest linear memory, and this module
//! implements reading and writing buffers through those descriptors.

use serde_json::Value;
use wasmer::{Array, Memory, NativeFunc, WasmPtr};

use crate::contract::functions::FuncError;

/// A region descriptor: three consecutive little-endian u32 words at the pointer
/// address, in this order. It is only ever materialized from guest memory right
/// before a read or write; it has no lifetime of its own.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Region {
    pub offset: u32,
    pub capacity: u32,
    pub length: u32,
}

impl Region {
    /// Read and validate the descriptor words at `ptr`. A zero offset, a length
    /// exceeding the capacity, or a buffer reaching past the end of linear memory
    /// all mean the guest handed us a corrupt pointer, which is fatal to the call.
    pub fn read(memory: &Memory, ptr: u32) -> Result<Region, FuncError> {
        let words = WasmPtr::<u32, Array>::new(ptr)
            .deref(memory, 0, 3)
            .ok_or(FuncError::MalformedRegion(ptr))?;
        let region = Region {
            offset: words[0].get(),
            capacity: words[1].get(),
            length: words[2].get(),
        };
        let end = (region.offset as u64).saturating_add(region.capacity as u64);
        if region.offset == 0 || region.length > region.capacity || end > memory.data_size() {
            return Err(FuncError::MalformedRegion(ptr));
        }
        Ok(region)
    }

    /// Update the length word of the descriptor at `ptr` in place.
    pub fn set_length(memory: &Memory, ptr: u32, length: u32) -> Result<(), FuncError> {
        let words = WasmPtr::<u32, Array>::new(ptr)
            .deref(memory, 0, 3)
            .ok_or(FuncError::MalformedRegion(ptr))?;
        words[2].set(length);
        Ok(())
    }
}

/// Memory context provides read-write access to a guest's linear memory through
/// region descriptors. It is implemented both by the host [env](super::env::Env)
/// handed to imported functions and by the contract instance itself, which resolves
/// the exports fresh for every call.
pub(crate) trait MemoryContext {
    fn memory(&self) -> Result<Memory, FuncError>;
    fn allocator(&self) -> Result<NativeFunc<u32, u32>, FuncError>;

    /// Ask the guest's exported allocator for a region of the given capacity.
    fn allocate(&self, len: u32) -> Result<u32, FuncError> {
        self.allocator()?
            .call(len)
            .map_err(|e| FuncError::Runtime(anyhow::anyhow!("guest allocator failed: {}", e)))
    }

    /// Slice `length` bytes starting at `offset` out of the region at `ptr`.
    fn read_region(&self, ptr: u32) -> Result<Vec<u8>, FuncError> {
        let memory = self.memory()?;
        let region = Region::read(&memory, ptr)?;
        let bytes = WasmPtr::<u8, Array>::new(region.offset)
            .deref(&memory, 0, region.length)
            .ok_or(FuncError::MalformedRegion(ptr))?;
        Ok(bytes.iter().map(|cell| cell.get()).collect())
    }

    /// Copy `data` into the region at `ptr` and update its length word.
    fn write_region(&self, ptr: u32, data: &[u8]) -> Result<(), FuncError> {
        let memory = self.memory()?;
        let region = Region::read(&memory, ptr)?;
        if data.len() as u64 > region.capacity as u64 {
            return Err(FuncError::RegionOverflow {
                ptr,
                capacity: region.capacity,
                length: data.len() as u32,
            });
        }
        let bytes = WasmPtr::<u8, Array>::new(region.offset)
            .deref(&memory, 0, data.len() as u32)
            .ok_or(FuncError::MalformedRegion(ptr))?;
        for (cell, byte) in bytes.iter().zip(data) {
            cell.set(*byte);
        }
        Region::set_length(&memory, ptr, data.len() as u32)
    }

    /// Allocate a fresh region and fill it, returning its pointer.
    fn write_to_guest(&self, data: &[u8]) -> Result<u32, FuncError> {
        let ptr = self.allocate(data.len() as u32)?;
        self.write_region(ptr, data)?;
        Ok(ptr)
    }

    /// Serialize `value` and move it into the guest. This is how every call
    /// argument crosses the boundary.
    fn pass_json(&self, value: &Value) -> Result<u32, FuncError> {
        let bytes = serde_json::to_vec(value).map_err(|e| FuncError::Runtime(e.into()))?;
        self.write_to_guest(&bytes)
    }
}
