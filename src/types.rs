/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! types defines the JSON wire shapes exchanged with guests: call environments,
//! response envelopes, embedded sub-messages and chain-query requests.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::HostError;

/// A native token amount, as contracts serialize it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Binary is a byte blob that crosses the JSON boundary base64-encoded,
/// mirroring the encoding contracts use for embedded messages and response data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map(Binary)
            .map_err(serde::de::Error::custom)
    }
}

/// Inputs from which an ABI variant marshals the per-call `env` (and `info`) JSON.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub height: u64,
    pub time: u64,
    pub chain_id: String,
    pub contract_address: String,
    pub sender: String,
    pub funds: Vec<Coin>,
}

/// The `wasm` sub-messages a contract response may embed, directing the host to
/// perform another call on the emitting contract's behalf.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    Instantiate {
        #[serde(default)]
        code_id: u64,
        #[serde(default)]
        callback_code_hash: String,
        label: String,
        msg: Binary,
        #[serde(default)]
        send: Vec<Coin>,
    },
    Execute {
        contract_addr: String,
        #[serde(default)]
        callback_code_hash: String,
        msg: Binary,
        #[serde(default)]
        send: Vec<Coin>,
    },
}

/// The `wasm.smart` variant of a contract-to-host chain query.
#[derive(Clone, Debug, Deserialize)]
pub struct SmartQuery {
    pub contract_addr: String,
    #[serde(default)]
    pub callback_code_hash: String,
    pub msg: Binary,
}

/// A successful init/execute result, with embedded messages still attached
/// (the dispatcher consumes them) and `data` already base64-decoded.
#[derive(Clone, Debug, Default)]
pub struct Response {
    pub messages: Vec<Value>,
    pub data: Option<Vec<u8>>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    data: Option<Binary>,
}

impl Response {
    /// Decode the `Ok` payload of a guest result envelope. Unknown fields such as
    /// `log` or `attributes` are tolerated; they carry no meaning for the mock host.
    pub(crate) fn from_ok(address: &str, action: &str, ok: Value) -> Result<Self, HostError> {
        let raw: RawResponse =
            serde_json::from_value(ok).map_err(|_| HostError::MalformedResult {
                address: address.to_string(),
                action: action.to_string(),
            })?;
        Ok(Response {
            messages: raw.messages,
            data: raw.data.map(|b| b.0),
        })
    }
}
