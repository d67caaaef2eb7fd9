//! Script context model for Plutus V1 and V2 and its encoding as `PlutusData`
//!
//! The layouts follow the ledger's on-chain types field by field:
//!
//! ```text
//! ScriptContext = Constr 0 [TxInfo, ScriptPurpose]
//! ScriptPurpose = Minting pid | Spending TxOutRef | Rewarding StakingCredential | Certifying DCert
//! TxInfo V1     = Constr 0 [inputs, outputs, fee, mint, dcert, wdrl, validRange,
//!                           signatories, data, id]
//! TxInfo V2     = Constr 0 [inputs, referenceInputs, outputs, fee, mint, dcert, wdrl,
//!                           validRange, signatories, redeemers, data, id]
//! ```

use std::sync::Arc;

use crate::codec::sorted_withdrawals;
use crate::error::{LedgerError, Result};
use crate::plutus_data::{PlutusData, ToPlutusData};
use crate::types::*;

/// Why a script is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPurpose {
    Minting(PolicyId),
    Spending(OutputRef),
    Rewarding(StakingCredential),
    Certifying(Certificate),
}

impl ScriptPurpose {
    /// The purpose a redeemer key points at in `body`, if any
    pub fn from_key(key: RedeemerKey, body: &TransactionBody) -> Option<Self> {
        let index = key.index as usize;
        match key.tag {
            RedeemerTag::Spend => body.inputs.get(index).map(|i| ScriptPurpose::Spending(*i)),
            RedeemerTag::Mint => body.mint.keys().nth(index).map(|p| ScriptPurpose::Minting(*p)),
            RedeemerTag::Cert => body
                .certificates
                .get(index)
                .map(|c| ScriptPurpose::Certifying(c.clone())),
            RedeemerTag::Reward => sorted_withdrawals(&body.withdrawals)
                .get(index)
                .map(|(addr, _)| ScriptPurpose::Rewarding(addr.staking_credential())),
        }
    }
}

/// Slot to POSIX-millisecond conversion; fails for bounds past the clock's range
pub type SlotClock<'a> = &'a dyn Fn(Slot) -> Result<PosixTime>;

/// Validity interval as POSIX milliseconds; `None` is an unbounded side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub lower_bound: Option<PosixTime>,
    pub upper_bound: Option<PosixTime>,
}

impl TimeRange {
    /// Convert a slot interval with `to_millis`
    pub fn from_slots(
        validity_start: Option<Slot>,
        ttl: Option<Slot>,
        to_millis: SlotClock<'_>,
    ) -> Result<Self> {
        Ok(Self {
            lower_bound: validity_start.map(to_millis).transpose()?,
            upper_bound: ttl.map(to_millis).transpose()?,
        })
    }
}

/// Output as seen by a V1 validator: no inline datums, no reference scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutV1 {
    pub address: Address,
    pub value: Value,
    pub datum_hash: Option<DatumHash>,
}

impl TxOutV1 {
    /// Fails with `InlineDatumInV1` when `output` carries an inline datum;
    /// `origin` names the output in the error
    pub fn from_output(output: &TransactionOutput, origin: impl FnOnce() -> String) -> Result<Self> {
        let datum_hash = match &output.datum {
            None => None,
            Some(DatumOption::Hash(h)) => Some(*h),
            Some(DatumOption::Inline(_)) => return Err(LedgerError::InlineDatumInV1(origin())),
        };
        Ok(Self {
            address: output.address,
            value: output.amount.clone(),
            datum_hash,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInInfoV1 {
    pub out_ref: OutputRef,
    pub resolved: TxOutV1,
}

/// Resolved input as seen by a V2 validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInInfo {
    pub out_ref: OutputRef,
    pub resolved: TransactionOutput,
}

impl From<&Utxo> for TxInInfo {
    fn from(utxo: &Utxo) -> Self {
        Self { out_ref: utxo.input, resolved: utxo.output.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfoV1 {
    pub inputs: Vec<TxInInfoV1>,
    pub outputs: Vec<TxOutV1>,
    pub fee: Coin,
    pub mint: MultiAsset,
    pub dcert: Vec<Certificate>,
    pub wdrl: Vec<(StakingCredential, Coin)>,
    pub valid_range: TimeRange,
    pub signatories: Vec<KeyHash>,
    pub data: Vec<(DatumHash, PlutusData)>,
    pub id: TxId,
}

impl TxInfoV1 {
    /// Build the V1 view of `tx`. Reference inputs are not part of it.
    pub fn build(
        tx: &Transaction,
        inputs: &[Utxo],
        to_millis: SlotClock<'_>,
    ) -> Result<Self> {
        let body = &tx.body;
        let inputs = inputs
            .iter()
            .map(|utxo| {
                Ok(TxInInfoV1 {
                    out_ref: utxo.input,
                    resolved: TxOutV1::from_output(&utxo.output, || format!("input {}", utxo.input))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let outputs = body
            .outputs
            .iter()
            .enumerate()
            .map(|(i, o)| TxOutV1::from_output(o, || format!("output {}", i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inputs,
            outputs,
            fee: body.fee,
            mint: body.mint.clone(),
            dcert: body.certificates.clone(),
            wdrl: withdrawal_pairs(body),
            valid_range: TimeRange::from_slots(body.validity_start, body.ttl, to_millis)?,
            signatories: body.required_signers.clone(),
            data: datum_table(&tx.witness_set),
            id: body.id(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfoV2 {
    pub inputs: Vec<TxInInfo>,
    pub reference_inputs: Vec<TxInInfo>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Coin,
    pub mint: MultiAsset,
    pub dcert: Vec<Certificate>,
    pub wdrl: Vec<(StakingCredential, Coin)>,
    pub valid_range: TimeRange,
    pub signatories: Vec<KeyHash>,
    pub redeemers: Vec<(ScriptPurpose, PlutusData)>,
    pub data: Vec<(DatumHash, PlutusData)>,
    pub id: TxId,
}

impl TxInfoV2 {
    /// Build the V2 view of `tx`. Every redeemer must point at a purpose in
    /// the body, otherwise `DanglingRedeemer`.
    pub fn build(
        tx: &Transaction,
        inputs: &[Utxo],
        reference_inputs: &[Utxo],
        to_millis: SlotClock<'_>,
    ) -> Result<Self> {
        let body = &tx.body;
        let mut redeemers: Vec<&Redeemer> = tx.witness_set.redeemers.iter().collect();
        redeemers.sort_by_key(|r| r.key());
        let redeemers = redeemers
            .into_iter()
            .map(|r| {
                let purpose = ScriptPurpose::from_key(r.key(), body)
                    .ok_or(LedgerError::DanglingRedeemer(r.key()))?;
                Ok((purpose, r.data.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inputs: inputs.iter().map(TxInInfo::from).collect(),
            reference_inputs: reference_inputs.iter().map(TxInInfo::from).collect(),
            outputs: body.outputs.clone(),
            fee: body.fee,
            mint: body.mint.clone(),
            dcert: body.certificates.clone(),
            wdrl: withdrawal_pairs(body),
            valid_range: TimeRange::from_slots(body.validity_start, body.ttl, to_millis)?,
            signatories: body.required_signers.clone(),
            redeemers,
            data: datum_table(&tx.witness_set),
            id: body.id(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxInfo {
    V1(TxInfoV1),
    V2(TxInfoV2),
}

impl TxInfo {
    pub fn version(&self) -> PlutusVersion {
        match self {
            TxInfo::V1(_) => PlutusVersion::V1,
            TxInfo::V2(_) => PlutusVersion::V2,
        }
    }

    pub fn id(&self) -> &TxId {
        match self {
            TxInfo::V1(info) => &info.id,
            TxInfo::V2(info) => &info.id,
        }
    }

    pub fn signatories(&self) -> &[KeyHash] {
        match self {
            TxInfo::V1(info) => &info.signatories,
            TxInfo::V2(info) => &info.signatories,
        }
    }

    pub fn valid_range(&self) -> &TimeRange {
        match self {
            TxInfo::V1(info) => &info.valid_range,
            TxInfo::V2(info) => &info.valid_range,
        }
    }
}

/// Transaction info shared by every invocation of one transaction, plus the
/// purpose of this invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContext {
    pub tx_info: Arc<TxInfo>,
    pub purpose: ScriptPurpose,
}

impl ScriptContext {
    pub fn new(tx_info: Arc<TxInfo>, purpose: ScriptPurpose) -> Self {
        Self { tx_info, purpose }
    }

    pub fn version(&self) -> PlutusVersion {
        self.tx_info.version()
    }
}

/// Withdrawals as (staking credential, amount), in reward-address order
fn withdrawal_pairs(body: &TransactionBody) -> Vec<(StakingCredential, Coin)> {
    sorted_withdrawals(&body.withdrawals)
        .into_iter()
        .map(|(addr, coin)| (addr.staking_credential(), coin))
        .collect()
}

/// Witness datums keyed by hash, ascending
fn datum_table(witness_set: &WitnessSet) -> Vec<(DatumHash, PlutusData)> {
    let mut data: Vec<(DatumHash, PlutusData)> = witness_set
        .plutus_data
        .iter()
        .map(|d| (crate::hash::datum_hash(d), d.clone()))
        .collect();
    data.sort_by(|a, b| a.0.cmp(&b.0));
    data.dedup_by(|a, b| a.0 == b.0);
    data
}

// Encoding

fn pair(a: PlutusData, b: PlutusData) -> PlutusData {
    PlutusData::constr(0, vec![a, b])
}

fn asset_map(coin: Option<Coin>, multi_asset: &MultiAsset) -> PlutusData {
    let mut entries = Vec::with_capacity(multi_asset.len() + 1);
    if let Some(coin) = coin {
        entries.push((
            PlutusData::bytes(b""),
            PlutusData::map(vec![(PlutusData::bytes(b""), PlutusData::int(coin))]),
        ));
    }
    for (policy, assets) in multi_asset {
        let inner = assets
            .iter()
            .map(|(name, quantity)| (PlutusData::bytes(name), PlutusData::int(*quantity)))
            .collect();
        entries.push((PlutusData::bytes(policy), PlutusData::map(inner)));
    }
    PlutusData::map(entries)
}

/// Value: base currency entry first, then policies ascending
pub fn value_data(value: &Value) -> PlutusData {
    asset_map(Some(value.coin), &value.multi_asset)
}

/// Minted value always carries a zero base-currency entry
pub fn mint_data(mint: &MultiAsset) -> PlutusData {
    asset_map(Some(0), mint)
}

/// Fee as a value holding only base currency
pub fn fee_data(fee: Coin) -> PlutusData {
    asset_map(Some(fee), &MultiAsset::new())
}

impl ToPlutusData for Credential {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Credential::Key(h) => PlutusData::constr(0, vec![PlutusData::bytes(h)]),
            Credential::Script(h) => PlutusData::constr(1, vec![PlutusData::bytes(h)]),
        }
    }
}

impl ToPlutusData for StakingCredential {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            StakingCredential::Hash(cred) => PlutusData::constr(0, vec![cred.to_plutus_data()]),
            StakingCredential::Pointer { slot, tx_index, cert_index } => PlutusData::constr(
                1,
                vec![
                    PlutusData::int(*slot),
                    PlutusData::int(*tx_index),
                    PlutusData::int(*cert_index),
                ],
            ),
        }
    }
}

impl ToPlutusData for Address {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![self.payment.to_plutus_data(), PlutusData::optional(self.staking.as_ref())],
        )
    }
}

impl ToPlutusData for OutputRef {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::constr(0, vec![PlutusData::bytes(self.tx_id)]),
                PlutusData::int(self.index),
            ],
        )
    }
}

impl ToPlutusData for Certificate {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Certificate::StakeRegistration(cred) => {
                PlutusData::constr(0, vec![StakingCredential::Hash(*cred).to_plutus_data()])
            }
            Certificate::StakeDeregistration(cred) => {
                PlutusData::constr(1, vec![StakingCredential::Hash(*cred).to_plutus_data()])
            }
            Certificate::StakeDelegation { credential, pool } => PlutusData::constr(
                2,
                vec![
                    StakingCredential::Hash(*credential).to_plutus_data(),
                    PlutusData::bytes(pool),
                ],
            ),
        }
    }
}

impl ToPlutusData for ScriptPurpose {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            ScriptPurpose::Minting(policy) => PlutusData::constr(0, vec![PlutusData::bytes(policy)]),
            ScriptPurpose::Spending(out_ref) => PlutusData::constr(1, vec![out_ref.to_plutus_data()]),
            ScriptPurpose::Rewarding(cred) => PlutusData::constr(2, vec![cred.to_plutus_data()]),
            ScriptPurpose::Certifying(cert) => PlutusData::constr(3, vec![cert.to_plutus_data()]),
        }
    }
}

/// Finite lower bounds are inclusive, finite upper bounds exclusive,
/// infinite bounds inclusive
impl ToPlutusData for TimeRange {
    fn to_plutus_data(&self) -> PlutusData {
        let lower = match self.lower_bound {
            Some(t) => (PlutusData::constr(1, vec![PlutusData::int(t)]), true),
            None => (PlutusData::constr(0, vec![]), true),
        };
        let upper = match self.upper_bound {
            Some(t) => (PlutusData::constr(1, vec![PlutusData::int(t)]), false),
            None => (PlutusData::constr(2, vec![]), true),
        };
        PlutusData::constr(
            0,
            vec![
                PlutusData::constr(0, vec![lower.0, PlutusData::bool(lower.1)]),
                PlutusData::constr(0, vec![upper.0, PlutusData::bool(upper.1)]),
            ],
        )
    }
}

impl ToPlutusData for TxOutV1 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                self.address.to_plutus_data(),
                value_data(&self.value),
                PlutusData::optional(self.datum_hash.as_ref()),
            ],
        )
    }
}

/// V2 output: address, value, output datum, optional reference script hash
impl ToPlutusData for TransactionOutput {
    fn to_plutus_data(&self) -> PlutusData {
        let datum = match &self.datum {
            None => PlutusData::constr(0, vec![]),
            Some(DatumOption::Hash(h)) => PlutusData::constr(1, vec![PlutusData::bytes(h)]),
            Some(DatumOption::Inline(d)) => PlutusData::constr(2, vec![d.clone()]),
        };
        let script_hash = self.script_ref.as_ref().map(Script::hash);
        PlutusData::constr(
            0,
            vec![
                self.address.to_plutus_data(),
                value_data(&self.amount),
                datum,
                PlutusData::optional(script_hash.as_ref()),
            ],
        )
    }
}

impl ToPlutusData for TxInInfoV1 {
    fn to_plutus_data(&self) -> PlutusData {
        pair(self.out_ref.to_plutus_data(), self.resolved.to_plutus_data())
    }
}

impl ToPlutusData for TxInInfo {
    fn to_plutus_data(&self) -> PlutusData {
        pair(self.out_ref.to_plutus_data(), self.resolved.to_plutus_data())
    }
}

fn id_data(id: &TxId) -> PlutusData {
    PlutusData::constr(0, vec![PlutusData::bytes(id)])
}

impl ToPlutusData for TxInfoV1 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                self.inputs.to_plutus_data(),
                self.outputs.to_plutus_data(),
                fee_data(self.fee),
                mint_data(&self.mint),
                self.dcert.to_plutus_data(),
                PlutusData::list(
                    self.wdrl
                        .iter()
                        .map(|(cred, coin)| pair(cred.to_plutus_data(), PlutusData::int(*coin)))
                        .collect(),
                ),
                self.valid_range.to_plutus_data(),
                self.signatories.to_plutus_data(),
                PlutusData::list(
                    self.data
                        .iter()
                        .map(|(hash, datum)| pair(PlutusData::bytes(hash), datum.clone()))
                        .collect(),
                ),
                id_data(&self.id),
            ],
        )
    }
}

impl ToPlutusData for TxInfoV2 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                self.inputs.to_plutus_data(),
                self.reference_inputs.to_plutus_data(),
                self.outputs.to_plutus_data(),
                fee_data(self.fee),
                mint_data(&self.mint),
                self.dcert.to_plutus_data(),
                PlutusData::map(
                    self.wdrl
                        .iter()
                        .map(|(cred, coin)| (cred.to_plutus_data(), PlutusData::int(*coin)))
                        .collect(),
                ),
                self.valid_range.to_plutus_data(),
                self.signatories.to_plutus_data(),
                PlutusData::map(
                    self.redeemers
                        .iter()
                        .map(|(purpose, data)| (purpose.to_plutus_data(), data.clone()))
                        .collect(),
                ),
                PlutusData::map(
                    self.data
                        .iter()
                        .map(|(hash, datum)| (PlutusData::bytes(hash), datum.clone()))
                        .collect(),
                ),
                id_data(&self.id),
            ],
        )
    }
}

impl ToPlutusData for TxInfo {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            TxInfo::V1(info) => info.to_plutus_data(),
            TxInfo::V2(info) => info.to_plutus_data(),
        }
    }
}

impl ToPlutusData for ScriptContext {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(0, vec![self.tx_info.to_plutus_data(), self.purpose.to_plutus_data()])
    }
}
