//! Generic structured data passed to on-chain validators
//!
//! `PlutusData` is the value model validators receive. Its canonical CBOR
//! encoding, which datum hashes and script arguments are derived from, is
//! the ledger library's: values convert into `pallas_primitives::PlutusData`
//! and are encoded by it. Non-empty lists and constructor fields are written
//! as indefinite-length arrays, empty ones as `0x80`; maps are definite.

use pallas_codec::minicbor;
use pallas_codec::utils::{Int, KeyValuePairs, MaybeIndefArray};
use pallas_primitives::{BigInt, BoundedBytes, Constr, PlutusData as LedgerData};
use serde::{Deserialize, Serialize};

use crate::types::ByteString;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i128),
    Bytes(ByteString),
}

/// Conversion into the data representation validators receive
pub trait ToPlutusData {
    fn to_plutus_data(&self) -> PlutusData;
}

impl PlutusData {
    pub fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr { tag, fields }
    }

    pub fn unit() -> Self {
        PlutusData::constr(0, vec![])
    }

    pub fn int(i: impl Into<i128>) -> Self {
        PlutusData::Integer(i.into())
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        PlutusData::Bytes(b.as_ref().to_vec())
    }

    pub fn list(items: Vec<PlutusData>) -> Self {
        PlutusData::List(items)
    }

    pub fn map(entries: Vec<(PlutusData, PlutusData)>) -> Self {
        PlutusData::Map(entries)
    }

    /// `False` is constructor 0, `True` constructor 1
    pub fn bool(b: bool) -> Self {
        PlutusData::constr(b as u64, vec![])
    }

    /// `Just x`
    pub fn some(x: PlutusData) -> Self {
        PlutusData::constr(0, vec![x])
    }

    /// `Nothing`
    pub fn none() -> Self {
        PlutusData::constr(1, vec![])
    }

    pub fn optional<T: ToPlutusData>(x: Option<&T>) -> Self {
        match x {
            Some(v) => PlutusData::some(v.to_plutus_data()),
            None => PlutusData::none(),
        }
    }

    pub fn as_constr(&self) -> Option<(u64, &[PlutusData])> {
        match self {
            PlutusData::Constr { tag, fields } => Some((*tag, fields)),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            PlutusData::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlutusData::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PlutusData]> {
        match self {
            PlutusData::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(PlutusData, PlutusData)]> {
        match self {
            PlutusData::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Field `i` of a constructor value
    pub fn field(&self, i: usize) -> Option<&PlutusData> {
        self.as_constr().and_then(|(_, fields)| fields.get(i))
    }

    /// Canonical CBOR bytes
    pub fn to_cbor(&self) -> Vec<u8> {
        // Encoding into a Vec can not fail
        minicbor::to_vec(LedgerData::from(self)).unwrap_or_default()
    }
}

impl ToPlutusData for PlutusData {
    fn to_plutus_data(&self) -> PlutusData {
        self.clone()
    }
}

impl ToPlutusData for i128 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::Integer(*self)
    }
}

impl ToPlutusData for [u8; 28] {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::bytes(self)
    }
}

impl ToPlutusData for [u8; 32] {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::bytes(self)
    }
}

impl<T: ToPlutusData> ToPlutusData for Vec<T> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(self.iter().map(ToPlutusData::to_plutus_data).collect())
    }
}

/// CBOR tag of constructor `alternative`; `None` for the general form
/// (tag 102 wrapping `[alternative, fields]`)
fn constr_cbor_tag(alternative: u64) -> Option<u64> {
    match alternative {
        0..=6 => Some(121 + alternative),
        7..=127 => Some(1280 + (alternative - 7)),
        _ => None,
    }
}

fn ledger_array(items: &[PlutusData]) -> MaybeIndefArray<LedgerData> {
    if items.is_empty() {
        MaybeIndefArray::Def(vec![])
    } else {
        MaybeIndefArray::Indef(items.iter().map(LedgerData::from).collect())
    }
}

fn ledger_integer(i: i128) -> BigInt {
    if let Ok(n) = minicbor::data::Int::try_from(i) {
        return BigInt::Int(Int(n));
    }
    // Bignum magnitude: n for positive values, -1 - n for negative ones
    let (negative, magnitude) = if i >= 0 {
        (false, i as u128)
    } else {
        (true, (-1 - i) as u128)
    };
    let be = magnitude.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    let bytes = BoundedBytes::from(be[first..].to_vec());
    if negative {
        BigInt::BigNInt(bytes)
    } else {
        BigInt::BigUInt(bytes)
    }
}

impl From<&PlutusData> for LedgerData {
    fn from(data: &PlutusData) -> Self {
        match data {
            PlutusData::Constr { tag, fields } => {
                let (tag, any_constructor) = match constr_cbor_tag(*tag) {
                    Some(cbor_tag) => (cbor_tag, None),
                    None => (102, Some(*tag)),
                };
                LedgerData::Constr(Constr {
                    tag,
                    any_constructor,
                    fields: ledger_array(fields),
                })
            }
            PlutusData::Map(entries) => LedgerData::Map(KeyValuePairs::from(
                entries
                    .iter()
                    .map(|(k, v)| (LedgerData::from(k), LedgerData::from(v)))
                    .collect::<Vec<_>>(),
            )),
            PlutusData::List(items) => LedgerData::Array(ledger_array(items)),
            PlutusData::Integer(i) => LedgerData::BigInt(ledger_integer(*i)),
            PlutusData::Bytes(b) => LedgerData::BoundedBytes(BoundedBytes::from(b.clone())),
        }
    }
}
