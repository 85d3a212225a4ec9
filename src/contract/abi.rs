/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! ABI variant descriptors. A variant names the entry-point exports a contract
//! generation provides, shapes the per-call `env`/`info` JSON, and selects the host
//! import set. The dispatcher and instance are generic over the variant instead of
//! branching on version flags.

use serde_json::{json, Value};
use wasmer::{ImportObject, Store};

use crate::contract::functions::imports;
use crate::contract::wasmer::env::Env;
use crate::types::CallContext;

pub trait AbiVariant: Clone + Send + Sync + 'static {
    /// Export invoked on contract instantiation.
    fn init_export(&self) -> &'static str;

    /// Export invoked on contract execution.
    fn execute_export(&self) -> &'static str;

    /// Export invoked on contract query.
    fn query_export(&self) -> &'static str;

    /// Whether the query export takes the env pointer in addition to the message.
    fn query_takes_env(&self) -> bool;

    /// The `env` argument marshaled into every call.
    fn call_env(&self, ctx: &CallContext) -> Value;

    /// The `info` argument, for variants that split message info out of the env.
    fn call_info(&self, ctx: &CallContext) -> Option<Value>;

    /// The host import table this variant's contracts expect.
    fn imports(&self, store: &Store, env: &Env<Self>) -> ImportObject
    where
        Self: Sized;
}

/// The legacy single-message ABI: `init`/`handle` entry points, sender and funds
/// folded into `env.message`, query without env.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyAbi;

impl AbiVariant for LegacyAbi {
    fn init_export(&self) -> &'static str {
        "init"
    }

    fn execute_export(&self) -> &'static str {
        "handle"
    }

    fn query_export(&self) -> &'static str {
        "query"
    }

    fn query_takes_env(&self) -> bool {
        false
    }

    fn call_env(&self, ctx: &CallContext) -> Value {
        json!({
            "block": {
                "height": ctx.height,
                "time": ctx.time,
                "chain_id": ctx.chain_id,
            },
            "message": {
                "sender": ctx.sender,
                "sent_funds": ctx.funds,
            },
            "contract": {
                "address": ctx.contract_address,
            },
        })
    }

    fn call_info(&self, _ctx: &CallContext) -> Option<Value> {
        None
    }

    fn imports(&self, store: &Store, env: &Env<Self>) -> ImportObject {
        imports::base(store, env)
    }
}

/// The split ABI: `instantiate`/`execute` entry points, a separate
/// `info = {sender, funds}` argument, a `transaction` block in the env, query with
/// env, and the extended import set including the signature-scheme stubs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SplitAbi;

impl AbiVariant for SplitAbi {
    fn init_export(&self) -> &'static str {
        "instantiate"
    }

    fn execute_export(&self) -> &'static str {
        "execute"
    }

    fn query_export(&self) -> &'static str {
        "query"
    }

    fn query_takes_env(&self) -> bool {
        true
    }

    fn call_env(&self, ctx: &CallContext) -> Value {
        json!({
            "block": {
                "height": ctx.height,
                "time": ctx.time,
                "chain_id": ctx.chain_id,
            },
            "transaction": {
                "index": 0,
            },
            "contract": {
                "address": ctx.contract_address,
            },
        })
    }

    fn call_info(&self, ctx: &CallContext) -> Option<Value> {
        Some(json!({
            "sender": ctx.sender,
            "funds": ctx.funds,
        }))
    }

    fn imports(&self, store: &Store, env: &Env<Self>) -> ImportObject {
        imports::extended(store, env)
    }
}
