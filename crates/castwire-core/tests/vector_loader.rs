//! Shared fixture reader for the `vectors/*.json` files.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::path::PathBuf;

use serde::Deserialize;

/// One fixture: raw wire bytes plus either the decoded shape or the fault code.
#[derive(Debug, Deserialize)]
pub struct Vector {
    #[serde(rename = "description")]
    pub name: String,
    #[serde(rename = "frame")]
    pub input: Input,
    #[serde(rename = "expect", default)]
    pub decoded: Option<Decoded>,
    #[serde(rename = "expect_error", default)]
    pub fault: Option<Fault>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "encoding", content = "data", rename_all = "lowercase")]
pub enum Input {
    Hex(String),
    Utf8(String),
}

#[derive(Debug, Deserialize)]
pub struct Decoded {
    pub path: String,
    #[serde(default)]
    pub seq: Option<u32>,
    pub payload_len: usize,
}

#[derive(Debug, Deserialize)]
pub struct Fault {
    pub code: String,
}

impl Vector {
    pub fn bytes(&self) -> Vec<u8> {
        match &self.input {
            Input::Hex(h) => hex::decode(h).unwrap_or_else(|e| panic!("{}: bad hex: {e}", self.name)),
            Input::Utf8(s) => s.clone().into_bytes(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).expect("vector is not utf-8")
    }
}

pub fn load(file: &str) -> Vector {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "vectors", file].iter().collect();
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("parse {file}: {e}"))
}
