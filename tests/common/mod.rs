/*
    Copyright © 2025, the cw-mock-runtime authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Shared fixtures for the integration tests: a builder assembling guest contract
//! modules from WAT, and a logger that captures records for assertion.
//!
//! The guest template implements the full contract ABI in hand-written WebAssembly.
//! Its init and query entry points return configurable JSON envelopes; its execute
//! entry point dispatches on the first byte of the incoming message:
//!
//! - `{` records the whole message in storage under the key `last` and returns the
//!   configured execute envelope (so JSON messages drive the sub-message tests),
//! - `r` removes the `last` key,
//! - `g` logs the recorded message through the `debug` import,
//! - `d` logs the rest of the message,
//! - `q` treats the rest of the message as a chain-query request, performs it and
//!   logs the raw reply,
//! - `c` canonicalizes the rest of the message as an address, humanizes it back and
//!   logs the result,
//! - `o` canonicalizes into a 4-byte output buffer, forcing a region overflow,
//! - `e` returns an `Err` envelope, `m` returns bytes that are not JSON.
//!
//! Query messages starting with `e` likewise produce an `Err` envelope.

#![allow(dead_code)]

use std::sync::{Mutex, Once};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

pub const OK_EMPTY: &str = r#"{"Ok":{"messages":[],"log":[]}}"#;

/// Configures the static JSON envelopes of a guest module and assembles it.
pub struct GuestBuilder {
    init: String,
    execute: String,
    query: String,
}

impl Default for GuestBuilder {
    fn default() -> Self {
        GuestBuilder {
            init: OK_EMPTY.to_string(),
            execute: OK_EMPTY.to_string(),
            query: r#"{"Ok":{"answer":42}}"#.to_string(),
        }
    }
}

impl GuestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope returned by the init entry point.
    pub fn init_response(mut self, json: &str) -> Self {
        self.init = json.to_string();
        self
    }

    /// Envelope returned by the execute entry point for JSON messages.
    pub fn execute_response(mut self, json: &str) -> Self {
        self.execute = json.to_string();
        self
    }

    /// Envelope returned by the query entry point.
    pub fn query_response(mut self, json: &str) -> Self {
        self.query = json.to_string();
        self
    }

    /// Assemble a module with the split `instantiate`/`execute` entry points.
    pub fn build_split(&self) -> Vec<u8> {
        self.build(
            r#"  (func (export "instantiate") (param i32 i32 i32) (result i32)
    (call $region (i32.const INIT_OFF) (i32.const INIT_LEN)))
  (func (export "execute") (param i32 i32 i32) (result i32)
    (call $run (local.get 2)))
  (func (export "query") (param i32 i32) (result i32)
    (call $answer (local.get 1)))"#,
        )
    }

    /// Assemble a module with the legacy `init`/`handle` entry points.
    pub fn build_legacy(&self) -> Vec<u8> {
        self.build(
            r#"  (func (export "init") (param i32 i32) (result i32)
    (call $region (i32.const INIT_OFF) (i32.const INIT_LEN)))
  (func (export "handle") (param i32 i32) (result i32)
    (call $run (local.get 1)))
  (func (export "query") (param i32) (result i32)
    (call $answer (local.get 0)))"#,
        )
    }

    fn build(&self, entries: &str) -> Vec<u8> {
        // Static data lives well below the heap base at 65536.
        let mut offset = 1024u32;
        let mut data = String::new();
        let mut place = |bytes: &[u8]| -> (u32, u32) {
            let here = offset;
            data.push_str(&format!(
                "  (data (i32.const {}) \"{}\")\n",
                here,
                wat_escape(bytes)
            ));
            offset += bytes.len() as u32;
            (here, bytes.len() as u32)
        };

        let key = place(b"last");
        let ok = place(OK_EMPTY.as_bytes());
        let err = place(br#"{"Err":{"generic_err":{"msg":"boom"}}}"#);
        let bad = place(b"not json");
        let miss = place(b"(no message recorded)");
        let qerr = place(br#"{"Err":{"generic_err":{"msg":"query boom"}}}"#);
        let init = place(self.init.as_bytes());
        let exec = place(self.execute.as_bytes());
        let query = place(self.query.as_bytes());

        let wat = GUEST_TEMPLATE
            .replace("DATA_SEGMENTS", data.trim_end())
            .replace("ENTRY_POINTS", entries)
            .replace("KEY_OFF", &key.0.to_string())
            .replace("KEY_LEN", &key.1.to_string())
            .replace("OK_OFF", &ok.0.to_string())
            .replace("OK_LEN", &ok.1.to_string())
            .replace("QERR_OFF", &qerr.0.to_string())
            .replace("QERR_LEN", &qerr.1.to_string())
            .replace("ERR_OFF", &err.0.to_string())
            .replace("ERR_LEN", &err.1.to_string())
            .replace("BAD_OFF", &bad.0.to_string())
            .replace("BAD_LEN", &bad.1.to_string())
            .replace("MISS_OFF", &miss.0.to_string())
            .replace("MISS_LEN", &miss.1.to_string())
            .replace("INIT_OFF", &init.0.to_string())
            .replace("INIT_LEN", &init.1.to_string())
            .replace("EXEC_OFF", &exec.0.to_string())
            .replace("EXEC_LEN", &exec.1.to_string())
            .replace("QUERY_OFF", &query.0.to_string())
            .replace("QUERY_LEN", &query.1.to_string());

        wat::parse_str(&wat).expect("guest template must assemble")
    }
}

const GUEST_TEMPLATE: &str = r#"(module
  (import "env" "db_read" (func $db_read (param i32) (result i32)))
  (import "env" "db_write" (func $db_write (param i32 i32)))
  (import "env" "db_remove" (func $db_remove (param i32)))
  (import "env" "canonicalize_address" (func $canonicalize (param i32 i32) (result i32)))
  (import "env" "humanize_address" (func $humanize (param i32 i32) (result i32)))
  (import "env" "query_chain" (func $query_chain (param i32) (result i32)))
  (import "env" "debug" (func $debug (param i32) (result i32)))

  (memory (export "memory") 4)
  (global $heap (mut i32) (i32.const 65536))

DATA_SEGMENTS

  (func $allocate (export "allocate") (param $size i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (i32.store (local.get $ptr) (i32.add (local.get $ptr) (i32.const 12)))
    (i32.store offset=4 (local.get $ptr) (local.get $size))
    (i32.store offset=8 (local.get $ptr) (i32.const 0))
    (global.set $heap
      (i32.and
        (i32.add (local.get $ptr) (i32.add (local.get $size) (i32.const 15)))
        (i32.const -4)))
    (local.get $ptr))

  (func (export "deallocate") (param i32))

  (func $region (param $off i32) (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (local.get $ptr) (i32.const 12)))
    (i32.store (local.get $ptr) (local.get $off))
    (i32.store offset=4 (local.get $ptr) (local.get $len))
    (i32.store offset=8 (local.get $ptr) (local.get $len))
    (local.get $ptr))

  (func $first (param $msg i32) (result i32)
    (i32.load8_u (i32.load (local.get $msg))))

  (func $tail (param $msg i32) (result i32)
    (call $region
      (i32.add (i32.load (local.get $msg)) (i32.const 1))
      (i32.sub (i32.load offset=8 (local.get $msg)) (i32.const 1))))

  (func $run (param $msg i32) (result i32)
    (local $b i32)
    (local $out i32)
    (local $human i32)
    (local.set $b (call $first (local.get $msg)))
    (if (i32.eq (local.get $b) (i32.const 123))
      (then
        (call $db_write
          (call $region (i32.const KEY_OFF) (i32.const KEY_LEN))
          (local.get $msg))
        (return (call $region (i32.const EXEC_OFF) (i32.const EXEC_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 101))
      (then (return (call $region (i32.const ERR_OFF) (i32.const ERR_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 109))
      (then (return (call $region (i32.const BAD_OFF) (i32.const BAD_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 114))
      (then
        (call $db_remove (call $region (i32.const KEY_OFF) (i32.const KEY_LEN)))
        (return (call $region (i32.const OK_OFF) (i32.const OK_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 100))
      (then
        (drop (call $debug (call $tail (local.get $msg))))
        (return (call $region (i32.const OK_OFF) (i32.const OK_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 103))
      (then
        (local.set $out
          (call $db_read (call $region (i32.const KEY_OFF) (i32.const KEY_LEN))))
        (if (i32.eqz (local.get $out))
          (then (local.set $out (call $region (i32.const MISS_OFF) (i32.const MISS_LEN)))))
        (drop (call $debug (local.get $out)))
        (return (call $region (i32.const OK_OFF) (i32.const OK_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 113))
      (then
        (drop (call $debug (call $query_chain (call $tail (local.get $msg)))))
        (return (call $region (i32.const OK_OFF) (i32.const OK_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 99))
      (then
        (local.set $out (call $allocate (i32.const 64)))
        (drop (call $canonicalize (call $tail (local.get $msg)) (local.get $out)))
        (local.set $human (call $allocate (i32.const 128)))
        (drop (call $humanize (local.get $out) (local.get $human)))
        (drop (call $debug (local.get $human)))
        (return (call $region (i32.const OK_OFF) (i32.const OK_LEN)))))
    (if (i32.eq (local.get $b) (i32.const 111))
      (then
        (drop (call $canonicalize
          (call $tail (local.get $msg))
          (call $allocate (i32.const 4))))
        (return (call $region (i32.const OK_OFF) (i32.const OK_LEN)))))
    (call $region (i32.const EXEC_OFF) (i32.const EXEC_LEN)))

  (func $answer (param $msg i32) (result i32)
    (if (result i32) (i32.eq (call $first (local.get $msg)) (i32.const 101))
      (then (call $region (i32.const QERR_OFF) (i32.const QERR_LEN)))
      (else (call $region (i32.const QUERY_OFF) (i32.const QUERY_LEN)))))

ENTRY_POINTS
)"#;

fn wat_escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:02x}", b)),
        }
    }
    out
}

pub fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// A `wasm.execute` sub-message as a contract would embed it in a response.
pub fn sub_execute(contract_addr: &str, msg: &[u8]) -> String {
    format!(
        r#"{{"wasm":{{"execute":{{"contract_addr":"{}","callback_code_hash":"","msg":"{}","send":[]}}}}}}"#,
        contract_addr,
        b64(msg)
    )
}

/// A `wasm.instantiate` sub-message.
pub fn sub_instantiate(code_id: u64, label: &str, msg: &[u8]) -> String {
    format!(
        r#"{{"wasm":{{"instantiate":{{"code_id":{},"callback_code_hash":"","label":"{}","msg":"{}","send":[]}}}}}}"#,
        code_id,
        label,
        b64(msg)
    )
}

/// An `Ok` envelope embedding the given sub-messages.
pub fn ok_with_messages(messages: &[String]) -> String {
    format!(r#"{{"Ok":{{"messages":[{}],"log":[]}}}}"#, messages.join(","))
}

struct CaptureLogger;

static RECORDS: Mutex<Vec<(log::Level, String)>> = Mutex::new(Vec::new());

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Route the log facade into an in-memory buffer. Idempotent within one test binary.
pub fn capture_logs() {
    static START: Once = Once::new();
    START.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger is installed");
        log::set_max_level(log::LevelFilter::Debug);
    });
}

/// Messages logged so far by the contract at `address`, with the attribution prefix
/// stripped. Tests run in parallel within one binary, so assertions must filter by
/// the addresses (or marker strings) belonging to their own backend.
pub fn logged_by(address: &str) -> Vec<String> {
    let prefix = format!("{}: ", address);
    RECORDS
        .lock()
        .unwrap()
        .iter()
        .filter_map(|(_, message)| message.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

/// All captured records at the given level containing `needle`.
pub fn logged_containing(level: log::Level, needle: &str) -> Vec<String> {
    RECORDS
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, message)| *l == level && message.contains(needle))
        .map(|(_, message)| message.clone())
        .collect()
}
