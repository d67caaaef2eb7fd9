//! Ledger value and identity types shared by the store, registry and resolver

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::plutus_data::PlutusData;

/// 224-bit hash: key hashes, script hashes, policy ids, pool ids
pub type Hash28 = [u8; 28];

/// 256-bit hash: transaction ids, datum hashes
pub type Hash32 = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

pub type KeyHash = Hash28;
pub type ScriptHash = Hash28;
pub type PolicyId = ScriptHash;
pub type PoolId = KeyHash;
pub type DatumHash = Hash32;
pub type TxId = Hash32;
pub type AssetName = ByteString;

/// Base-currency amount
pub type Coin = u64;

/// Slot number on the simulated chain
pub type Slot = u64;

/// POSIX time in milliseconds, as seen by on-chain validators
pub type PosixTime = i64;

/// Policy id → asset name → signed quantity
pub type MultiAsset = BTreeMap<PolicyId, BTreeMap<AssetName, i64>>;

/// Network discriminant carried in address headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

/// Credential: who or what must authorize an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Credential {
    Key(KeyHash),
    Script(ScriptHash),
}

impl Credential {
    pub fn hash(&self) -> &Hash28 {
        match self {
            Credential::Key(h) | Credential::Script(h) => h,
        }
    }

    pub fn script_hash(&self) -> Option<&ScriptHash> {
        match self {
            Credential::Script(h) => Some(h),
            Credential::Key(_) => None,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Key(h) => write!(f, "key:{}", hex::encode(h)),
            Credential::Script(h) => write!(f, "script:{}", hex::encode(h)),
        }
    }
}

/// Staking part of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StakingCredential {
    Hash(Credential),
    /// Pointer into chain history: (slot, transaction index, certificate index)
    Pointer {
        slot: u64,
        tx_index: u64,
        cert_index: u64,
    },
}

/// Payment address: payment credential plus optional staking credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub network: Network,
    pub payment: Credential,
    pub staking: Option<StakingCredential>,
}

impl Address {
    /// Address without a staking part
    pub fn enterprise(network: Network, payment: Credential) -> Self {
        Self { network, payment, staking: None }
    }

    /// Address delegating its stake rights to `staking`
    pub fn base(network: Network, payment: Credential, staking: Credential) -> Self {
        Self {
            network,
            payment,
            staking: Some(StakingCredential::Hash(staking)),
        }
    }

    pub fn script_hash(&self) -> Option<&ScriptHash> {
        self.payment.script_hash()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(crate::codec::address_bytes(self)))
    }
}

/// Reward (stake) address: keys the stake account registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardAddress {
    pub network: Network,
    pub credential: Credential,
}

impl RewardAddress {
    pub fn new(network: Network, credential: Credential) -> Self {
        Self { network, credential }
    }

    pub fn staking_credential(&self) -> StakingCredential {
        StakingCredential::Hash(self.credential)
    }
}

impl fmt::Display for RewardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(crate::codec::reward_address_bytes(self)))
    }
}

/// Value: base currency plus multi-asset bundle
///
/// Combining values is additive per (policy, asset); entries whose quantity
/// reaches zero are pruned, nothing else is ever dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub coin: Coin,
    pub multi_asset: MultiAsset,
}

impl Value {
    pub fn new(coin: Coin, multi_asset: MultiAsset) -> Self {
        let mut value = Self { coin, multi_asset };
        value.prune();
        value
    }

    pub fn lovelace(coin: Coin) -> Self {
        Self { coin, multi_asset: MultiAsset::new() }
    }

    /// Add `quantity` of one asset
    pub fn with_asset(mut self, policy: PolicyId, name: impl Into<AssetName>, quantity: i64) -> Self {
        let held = self.multi_asset.entry(policy).or_default().entry(name.into()).or_default();
        *held = held.saturating_add(quantity);
        self.prune();
        self
    }

    pub fn quantity(&self, policy: &PolicyId, name: &[u8]) -> i64 {
        self.multi_asset
            .get(policy)
            .and_then(|assets| assets.get(name))
            .copied()
            .unwrap_or(0)
    }

    pub fn has_negative_quantity(&self) -> bool {
        self.multi_asset.values().flat_map(|a| a.values()).any(|q| *q < 0)
    }

    fn prune(&mut self) {
        for assets in self.multi_asset.values_mut() {
            assets.retain(|_, q| *q != 0);
        }
        self.multi_asset.retain(|_, assets| !assets.is_empty());
    }
}

impl AddAssign<&Value> for Value {
    fn add_assign(&mut self, rhs: &Value) {
        self.coin = self.coin.saturating_add(rhs.coin);
        for (policy, assets) in &rhs.multi_asset {
            let entry = self.multi_asset.entry(*policy).or_default();
            for (name, quantity) in assets {
                let held = entry.entry(name.clone()).or_default();
                *held = held.saturating_add(*quantity);
            }
        }
        self.prune();
    }
}

impl Add for Value {
    type Output = Value;

    fn add(mut self, rhs: Value) -> Value {
        self += &rhs;
        self
    }
}

impl<'a> Sum<&'a Value> for Value {
    fn sum<I: Iterator<Item = &'a Value>>(iter: I) -> Self {
        iter.fold(Value::default(), |mut acc, v| {
            acc += v;
            acc
        })
    }
}

/// Output reference: (transaction id, output index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_id: TxId,
    pub index: u32,
}

impl OutputRef {
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", hex::encode(self.tx_id), self.index)
    }
}

/// On-chain script language version; selects the script-context shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlutusVersion {
    V1,
    V2,
}

/// Compiled validator bytes tagged with their language version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    pub version: PlutusVersion,
    pub bytes: ByteString,
}

impl Script {
    pub fn new(version: PlutusVersion, bytes: impl Into<ByteString>) -> Self {
        Self { version, bytes: bytes.into() }
    }

    pub fn hash(&self) -> ScriptHash {
        crate::hash::script_hash(self.version, &self.bytes)
    }
}

/// Datum attached to an output: either by hash or inline, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatumOption {
    Hash(DatumHash),
    Inline(PlutusData),
}

/// Transaction Output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub address: Address,
    pub amount: Value,
    pub datum: Option<DatumOption>,
    pub script_ref: Option<Script>,
}

impl TransactionOutput {
    pub fn new(address: Address, amount: Value) -> Self {
        Self { address, amount, datum: None, script_ref: None }
    }

    pub fn with_datum_hash(mut self, hash: DatumHash) -> Self {
        self.datum = Some(DatumOption::Hash(hash));
        self
    }

    pub fn with_inline_datum(mut self, datum: PlutusData) -> Self {
        self.datum = Some(DatumOption::Inline(datum));
        self
    }

    pub fn with_script_ref(mut self, script: Script) -> Self {
        self.script_ref = Some(script);
        self
    }

    pub fn inline_datum(&self) -> Option<&PlutusData> {
        match &self.datum {
            Some(DatumOption::Inline(d)) => Some(d),
            _ => None,
        }
    }
}

/// UTxO: an output reference paired with the output it names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub input: OutputRef,
    pub output: TransactionOutput,
}

impl Utxo {
    pub fn new(input: OutputRef, output: TransactionOutput) -> Self {
        Self { input, output }
    }
}

/// Stake certificates understood by the simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Certificate {
    StakeRegistration(Credential),
    StakeDeregistration(Credential),
    StakeDelegation { credential: Credential, pool: PoolId },
}

impl Certificate {
    pub fn credential(&self) -> &Credential {
        match self {
            Certificate::StakeRegistration(c)
            | Certificate::StakeDeregistration(c)
            | Certificate::StakeDelegation { credential: c, .. } => c,
        }
    }
}

/// Redeemer purpose tag; the derived order is the ledger's tag order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
}

impl fmt::Display for RedeemerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RedeemerTag::Spend => "spend",
            RedeemerTag::Mint => "mint",
            RedeemerTag::Cert => "certificate",
            RedeemerTag::Reward => "withdrawal",
        };
        f.write_str(name)
    }
}

/// (purpose tag, index): selects the script-triggering event a redeemer authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RedeemerKey {
    pub tag: RedeemerTag,
    pub index: u32,
}

impl RedeemerKey {
    pub fn new(tag: RedeemerTag, index: u32) -> Self {
        Self { tag, index }
    }
}

impl fmt::Display for RedeemerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.index)
    }
}

/// Execution units: (memory, CPU steps)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExUnits {
    pub mem: i64,
    pub steps: i64,
}

impl ExUnits {
    pub fn new(mem: i64, steps: i64) -> Self {
        Self { mem, steps }
    }

    /// True when either dimension of `self` is above `budget`
    pub fn exceeds(&self, budget: &ExUnits) -> bool {
        self.mem > budget.mem || self.steps > budget.steps
    }
}

/// Redeemer: data and budget for one script-triggering event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub data: PlutusData,
    pub ex_units: ExUnits,
}

impl Redeemer {
    pub fn new(tag: RedeemerTag, index: u32, data: PlutusData) -> Self {
        Self { tag, index, data, ex_units: ExUnits::default() }
    }

    pub fn with_ex_units(mut self, ex_units: ExUnits) -> Self {
        self.ex_units = ex_units;
        self
    }

    pub fn key(&self) -> RedeemerKey {
        RedeemerKey::new(self.tag, self.index)
    }
}

/// Verification-key witness. Signatures are checked by the ledger client
/// library before a transaction reaches the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VKeyWitness {
    pub vkey: ByteString,
    pub signature: ByteString,
}

impl VKeyWitness {
    pub fn key_hash(&self) -> KeyHash {
        crate::hash::key_hash(&self.vkey)
    }
}

/// Transaction body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub inputs: Vec<OutputRef>,
    pub reference_inputs: Vec<OutputRef>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Coin,
    pub mint: MultiAsset,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Vec<(RewardAddress, Coin)>,
    pub validity_start: Option<Slot>,
    pub ttl: Option<Slot>,
    pub required_signers: Vec<KeyHash>,
}

impl TransactionBody {
    pub fn id(&self) -> TxId {
        crate::codec::tx_id(self)
    }
}

/// Transaction witness set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VKeyWitness>,
    pub plutus_v1_scripts: Vec<ByteString>,
    pub plutus_v2_scripts: Vec<ByteString>,
    pub redeemers: Vec<Redeemer>,
    pub plutus_data: Vec<PlutusData>,
}

impl WitnessSet {
    pub fn redeemer(&self, key: RedeemerKey) -> Option<&Redeemer> {
        self.redeemers.iter().find(|r| r.key() == key)
    }
}

/// Transaction: body plus witnesses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub body: TransactionBody,
    pub witness_set: WitnessSet,
}

impl Transaction {
    pub fn new(body: TransactionBody, witness_set: WitnessSet) -> Self {
        Self { body, witness_set }
    }

    pub fn id(&self) -> TxId {
        self.body.id()
    }
}
