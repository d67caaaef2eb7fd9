//! Loading compiled contracts from disk

use anyhow::{anyhow, Context};
use pallas_codec::minicbor::{Decoder, Encoder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::types::{Address, Credential, Network, PlutusVersion, Script};

/// Text envelope written by contract toolchains (`script.plutus`)
#[derive(Debug, Deserialize)]
struct TextEnvelope {
    #[serde(rename = "cborHex")]
    cbor_hex: String,
}

/// Strip every complete CBOR byte-string wrapper
fn unwrap_cbor(mut bytes: Vec<u8>) -> Vec<u8> {
    loop {
        let mut decoder = Decoder::new(&bytes);
        let inner = match decoder.bytes() {
            Ok(inner) if decoder.position() == bytes.len() => inner.to_vec(),
            _ => return bytes,
        };
        bytes = inner;
    }
}

/// Script bytes as hashed on chain: the flat program wrapped in exactly one
/// CBOR byte string
fn normalize_script_bytes(raw: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let program = unwrap_cbor(raw);
    let mut encoder = Encoder::new(Vec::new());
    encoder
        .bytes(&program)
        .map_err(|e| anyhow!("encoding script bytes: {}", e))?;
    Ok(encoder.into_writer())
}

fn read_cbor_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    // Hex text or raw bytes
    match std::str::from_utf8(&raw).ok().map(str::trim) {
        Some(text) => match hex::decode(text) {
            Ok(bytes) => Ok(bytes),
            Err(_) => Ok(raw),
        },
        None => Ok(raw),
    }
}

fn read_envelope(path: &Path) -> anyhow::Result<Vec<u8>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let envelope: TextEnvelope =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    hex::decode(envelope.cbor_hex.trim()).with_context(|| format!("decoding cborHex in {}", path.display()))
}

/// Load a compiled contract
///
/// `path` is a `script.plutus` text envelope, a `script.cbor` file holding
/// hex text or raw bytes, or a directory containing either (the envelope
/// takes precedence).
pub fn load_contract(path: impl AsRef<Path>, version: PlutusVersion) -> anyhow::Result<Script> {
    let path = path.as_ref();
    let raw = if path.is_dir() {
        let envelope = path.join("script.plutus");
        let cbor = path.join("script.cbor");
        if envelope.exists() {
            read_envelope(&envelope)?
        } else if cbor.exists() {
            read_cbor_file(&cbor)?
        } else {
            return Err(anyhow!("no script.plutus or script.cbor in {}", path.display()));
        }
    } else if path.extension().map_or(false, |ext| ext == "plutus") {
        read_envelope(path)?
    } else {
        read_cbor_file(path)?
    };
    if raw.is_empty() {
        return Err(anyhow!("empty script in {}", path.display()));
    }
    Ok(Script::new(version, normalize_script_bytes(raw)?))
}

/// Enterprise address locked by `script`
pub fn address_from_script(script: &Script, network: Network) -> Address {
    Address::enterprise(network, Credential::Script(script.hash()))
}
