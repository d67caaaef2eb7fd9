//! Ledger hash functions: blake2b-224 and blake2b-256, as computed by the
//! ledger library's hasher

use pallas_crypto::hash::{Hash, Hasher};

use crate::constants::*;
use crate::plutus_data::PlutusData;
use crate::types::*;

fn to_array<const N: usize>(hash: Hash<N>) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(hash.as_ref());
    out
}

/// blake2b with a 224-bit digest
pub fn blake2b_224(data: &[u8]) -> Hash28 {
    to_array(Hasher::<224>::hash(data))
}

/// blake2b with a 256-bit digest
pub fn blake2b_256(data: &[u8]) -> Hash32 {
    to_array(Hasher::<256>::hash(data))
}

/// ScriptHash = blake2b_224(tag ‖ bytes), tag selected by language version
pub fn script_hash(version: PlutusVersion, bytes: &[u8]) -> ScriptHash {
    let tag = match version {
        PlutusVersion::V1 => PLUTUS_V1_SCRIPT_TAG,
        PlutusVersion::V2 => PLUTUS_V2_SCRIPT_TAG,
    };
    to_array(Hasher::<224>::hash_tagged(bytes, tag))
}

/// DatumHash = blake2b_256(cbor(datum))
pub fn datum_hash(datum: &PlutusData) -> DatumHash {
    blake2b_256(&datum.to_cbor())
}

/// KeyHash = blake2b_224(verification key)
pub fn key_hash(vkey: &[u8]) -> KeyHash {
    blake2b_224(vkey)
}
