//! Script-context resolver: turns a transaction and its resolved inputs into
//! the ordered list of script invocations it triggers

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::sorted_withdrawals;
use crate::context::{ScriptContext, ScriptPurpose, SlotClock, TxInfo, TxInfoV1, TxInfoV2};
use crate::error::{LedgerError, Result};
use crate::hash::{datum_hash, script_hash};
use crate::plutus_data::{PlutusData, ToPlutusData};
use crate::types::*;

/// One script run: script, optional datum, redeemer and context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub script: Script,
    pub datum: Option<PlutusData>,
    pub redeemer: Redeemer,
    pub context: ScriptContext,
}

impl ScriptInvocation {
    pub fn key(&self) -> RedeemerKey {
        self.redeemer.key()
    }

    /// Interpreter arguments: datum (spending only), redeemer, context
    pub fn arguments(&self) -> Vec<PlutusData> {
        let mut args = Vec::with_capacity(3);
        if let Some(datum) = &self.datum {
            args.push(datum.clone());
        }
        args.push(self.redeemer.data.clone());
        args.push(self.context.to_plutus_data());
        args
    }
}

/// Scripts available to a transaction, by hash
struct ScriptTable {
    witness_v2: HashMap<ScriptHash, Script>,
    witness_v1: HashMap<ScriptHash, Script>,
    reference: Vec<Script>,
}

impl ScriptTable {
    fn new(tx: &Transaction, inputs: &[Utxo], reference_inputs: &[Utxo]) -> Self {
        let table = |version: PlutusVersion, scripts: &[ByteString]| -> HashMap<ScriptHash, Script> {
            scripts
                .iter()
                .map(|bytes| (script_hash(version, bytes), Script::new(version, bytes.clone())))
                .collect()
        };
        let reference = reference_inputs
            .iter()
            .chain(inputs)
            .filter_map(|utxo| utxo.output.script_ref.clone())
            .collect();
        Self {
            witness_v2: table(PlutusVersion::V2, &tx.witness_set.plutus_v2_scripts),
            witness_v1: table(PlutusVersion::V1, &tx.witness_set.plutus_v1_scripts),
            reference,
        }
    }

    /// Witness V2 first, then witness V1, then reference scripts
    fn find(&self, hash: &ScriptHash) -> Result<Script> {
        self.witness_v2
            .get(hash)
            .or_else(|| self.witness_v1.get(hash))
            .cloned()
            .or_else(|| self.reference.iter().find(|s| &s.hash() == hash).cloned())
            .ok_or(LedgerError::MissingScript(*hash))
    }
}

/// Transaction info per context version, built at most once each
struct TxInfoCache<'a> {
    tx: &'a Transaction,
    inputs: &'a [Utxo],
    reference_inputs: &'a [Utxo],
    to_millis: SlotClock<'a>,
    v1: Option<Arc<TxInfo>>,
    v2: Option<Arc<TxInfo>>,
}

impl<'a> TxInfoCache<'a> {
    fn get(&mut self, version: PlutusVersion) -> Result<Arc<TxInfo>> {
        let slot = match version {
            PlutusVersion::V1 => &mut self.v1,
            PlutusVersion::V2 => &mut self.v2,
        };
        if let Some(info) = slot {
            return Ok(Arc::clone(info));
        }
        let info = match version {
            PlutusVersion::V1 => TxInfo::V1(TxInfoV1::build(self.tx, self.inputs, self.to_millis)?),
            PlutusVersion::V2 => TxInfo::V2(TxInfoV2::build(
                self.tx,
                self.inputs,
                self.reference_inputs,
                self.to_millis,
            )?),
        };
        let info = Arc::new(info);
        *slot = Some(Arc::clone(&info));
        Ok(info)
    }
}

fn find_redeemer(tx: &Transaction, tag: RedeemerTag, index: usize) -> Option<&Redeemer> {
    tx.witness_set.redeemer(RedeemerKey::new(tag, index as u32))
}

fn require_redeemer(tx: &Transaction, tag: RedeemerTag, index: usize) -> Result<Redeemer> {
    find_redeemer(tx, tag, index)
        .cloned()
        .ok_or(LedgerError::MissingRedeemer(RedeemerKey::new(tag, index as u32)))
}

/// Datum for a spent script output: inline, or by hash among witness datums
fn resolve_datum(tx: &Transaction, utxo: &Utxo) -> Result<PlutusData> {
    match &utxo.output.datum {
        Some(DatumOption::Inline(datum)) => Ok(datum.clone()),
        Some(DatumOption::Hash(hash)) => tx
            .witness_set
            .plutus_data
            .iter()
            .find(|d| &datum_hash(d) == hash)
            .cloned()
            .ok_or(LedgerError::MissingDatum(*hash)),
        None => Err(LedgerError::NoDatum(utxo.input)),
    }
}

fn invoke(
    infos: &mut TxInfoCache<'_>,
    script: Script,
    datum: Option<PlutusData>,
    redeemer: Redeemer,
    purpose: ScriptPurpose,
) -> Result<ScriptInvocation> {
    let tx_info = infos.get(script.version)?;
    debug!(
        target: "resolver",
        "invocation [key={}, script={}, version={:?}]",
        redeemer.key(),
        hex::encode(script.hash()),
        script.version
    );
    Ok(ScriptInvocation {
        script,
        datum,
        redeemer,
        context: ScriptContext::new(tx_info, purpose),
    })
}

/// Resolve: (transaction, resolved inputs, resolved reference inputs) →
/// script invocations
///
/// `inputs` and `reference_inputs` are in body order. `to_millis` converts
/// a slot to the POSIX millisecond time validators see and fails for bounds
/// the clock can not represent.
///
/// Invocations are produced purpose by purpose:
/// 1. Spending: inputs in body order whose payment credential is a script
/// 2. Minting: policies in ascending policy-id order
/// 3. Certifying: script-credential certificates in body order; a
///    registration certificate without a redeemer is skipped
/// 4. Rewarding: script-credential withdrawals in reward-address order
///
/// Any unresolved redeemer, script or datum fails the whole transaction
/// before anything is returned.
pub fn resolve(
    tx: &Transaction,
    inputs: &[Utxo],
    reference_inputs: &[Utxo],
    to_millis: SlotClock<'_>,
) -> Result<Vec<ScriptInvocation>> {
    let body = &tx.body;
    for r in &tx.witness_set.redeemers {
        if ScriptPurpose::from_key(r.key(), body).is_none() {
            return Err(LedgerError::DanglingRedeemer(r.key()));
        }
    }

    let scripts = ScriptTable::new(tx, inputs, reference_inputs);
    let mut infos = TxInfoCache {
        tx,
        inputs,
        reference_inputs,
        to_millis,
        v1: None,
        v2: None,
    };
    let mut invocations = Vec::new();

    // 1. Spending
    for (i, utxo) in inputs.iter().enumerate() {
        let Some(hash) = utxo.output.address.script_hash() else {
            continue;
        };
        let redeemer = require_redeemer(tx, RedeemerTag::Spend, i)?;
        let script = scripts.find(hash)?;
        let datum = resolve_datum(tx, utxo)?;
        let purpose = ScriptPurpose::Spending(utxo.input);
        invocations.push(invoke(&mut infos, script, Some(datum), redeemer, purpose)?);
    }

    // 2. Minting
    for (i, policy) in body.mint.keys().enumerate() {
        let redeemer = require_redeemer(tx, RedeemerTag::Mint, i)?;
        let script = scripts.find(policy)?;
        let purpose = ScriptPurpose::Minting(*policy);
        invocations.push(invoke(&mut infos, script, None, redeemer, purpose)?);
    }

    // 3. Certifying
    for (i, certificate) in body.certificates.iter().enumerate() {
        let Some(hash) = certificate.credential().script_hash() else {
            continue;
        };
        let redeemer = match find_redeemer(tx, RedeemerTag::Cert, i) {
            Some(r) => r.clone(),
            None if matches!(certificate, Certificate::StakeRegistration(_)) => continue,
            None => {
                return Err(LedgerError::MissingRedeemer(RedeemerKey::new(RedeemerTag::Cert, i as u32)))
            }
        };
        let script = scripts.find(hash)?;
        invocations.push(invoke(
            &mut infos,
            script,
            None,
            redeemer,
            ScriptPurpose::Certifying(certificate.clone()),
        )?);
    }

    // 4. Rewarding
    for (i, (address, _)) in sorted_withdrawals(&body.withdrawals).iter().enumerate() {
        let Some(hash) = address.credential.script_hash() else {
            continue;
        };
        let redeemer = require_redeemer(tx, RedeemerTag::Reward, i)?;
        let script = scripts.find(hash)?;
        invocations.push(invoke(
            &mut infos,
            script,
            None,
            redeemer,
            ScriptPurpose::Rewarding(address.staking_credential()),
        )?);
    }

    Ok(invocations)
}

/// Hashes of reference scripts attached to resolved inputs and reference inputs
pub fn reference_script_hashes<'a>(utxos: impl IntoIterator<Item = &'a Utxo>) -> Vec<ScriptHash> {
    utxos
        .into_iter()
        .filter_map(|u| u.output.script_ref.as_ref().map(Script::hash))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2_SCRIPT: &[u8] = &[0x49, 0x01, 0x02];
    const V1_SCRIPT: &[u8] = &[0x4a, 0x03, 0x04];

    fn millis(slot: Slot) -> Result<PosixTime> {
        Ok(slot as i64 * 1000)
    }

    fn v2_hash() -> ScriptHash {
        script_hash(PlutusVersion::V2, V2_SCRIPT)
    }

    fn script_utxo(tx: u8, hash: ScriptHash, datum: Option<DatumOption>) -> Utxo {
        let mut output = TransactionOutput::new(
            Address::enterprise(Network::Testnet, Credential::Script(hash)),
            Value::lovelace(100),
        );
        output.datum = datum;
        Utxo::new(OutputRef::new([tx; 32], 0), output)
    }

    fn key_utxo(tx: u8) -> Utxo {
        Utxo::new(
            OutputRef::new([tx; 32], 0),
            TransactionOutput::new(
                Address::enterprise(Network::Testnet, Credential::Key([tx; 28])),
                Value::lovelace(100),
            ),
        )
    }

    fn spend_tx(inputs: &[&Utxo]) -> Transaction {
        Transaction::new(
            TransactionBody {
                inputs: inputs.iter().map(|u| u.input).collect(),
                ..Default::default()
            },
            WitnessSet {
                plutus_v2_scripts: vec![V2_SCRIPT.to_vec()],
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_key_inputs_produce_no_invocation() {
        let utxo = key_utxo(1);
        let tx = spend_tx(&[&utxo]);
        assert!(resolve(&tx, &[utxo], &[], &millis).unwrap().is_empty());
    }

    #[test]
    fn test_spend_with_inline_datum() {
        let utxo = script_utxo(1, v2_hash(), Some(DatumOption::Inline(PlutusData::int(42))));
        let mut tx = spend_tx(&[&utxo]);
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit()));
        let invocations = resolve(&tx, &[utxo.clone()], &[], &millis).unwrap();
        assert_eq!(invocations.len(), 1);
        let inv = &invocations[0];
        assert_eq!(inv.datum, Some(PlutusData::int(42)));
        assert_eq!(inv.context.purpose, ScriptPurpose::Spending(utxo.input));
        assert_eq!(inv.context.version(), PlutusVersion::V2);
        assert_eq!(inv.arguments().len(), 3);
    }

    #[test]
    fn test_spend_missing_redeemer() {
        let utxo = script_utxo(1, v2_hash(), Some(DatumOption::Inline(PlutusData::int(1))));
        let tx = spend_tx(&[&utxo]);
        let result = resolve(&tx, &[utxo], &[], &millis);
        assert_eq!(
            result,
            Err(LedgerError::MissingRedeemer(RedeemerKey::new(RedeemerTag::Spend, 0)))
        );
    }

    #[test]
    fn test_redeemer_index_follows_input_position() {
        let key = key_utxo(1);
        let script = script_utxo(2, v2_hash(), Some(DatumOption::Inline(PlutusData::int(1))));
        let mut tx = spend_tx(&[&key, &script]);
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 1, PlutusData::unit()));
        let invocations = resolve(&tx, &[key, script], &[], &millis).unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].key(), RedeemerKey::new(RedeemerTag::Spend, 1));
    }

    #[test]
    fn test_spend_missing_script() {
        let utxo = script_utxo(1, [0xee; 28], Some(DatumOption::Inline(PlutusData::int(1))));
        let mut tx = spend_tx(&[&utxo]);
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit()));
        assert_eq!(
            resolve(&tx, &[utxo], &[], &millis),
            Err(LedgerError::MissingScript([0xee; 28]))
        );
    }

    #[test]
    fn test_spend_datum_by_hash() {
        let datum = PlutusData::bytes(b"secret");
        let utxo = script_utxo(1, v2_hash(), Some(DatumOption::Hash(datum_hash(&datum))));
        let mut tx = spend_tx(&[&utxo]);
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit()));
        assert_eq!(
            resolve(&tx, &[utxo.clone()], &[], &millis),
            Err(LedgerError::MissingDatum(datum_hash(&datum)))
        );
        tx.witness_set.plutus_data.push(datum.clone());
        let invocations = resolve(&tx, &[utxo], &[], &millis).unwrap();
        assert_eq!(invocations[0].datum, Some(datum));
    }

    #[test]
    fn test_spend_without_datum_fails() {
        let utxo = script_utxo(1, v2_hash(), None);
        let mut tx = spend_tx(&[&utxo]);
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit()));
        assert_eq!(resolve(&tx, &[utxo.clone()], &[], &millis), Err(LedgerError::NoDatum(utxo.input)));
    }

    #[test]
    fn test_v1_script_rejects_inline_datum() {
        let hash = script_hash(PlutusVersion::V1, V1_SCRIPT);
        let utxo = script_utxo(1, hash, Some(DatumOption::Inline(PlutusData::int(1))));
        let tx = Transaction::new(
            TransactionBody { inputs: vec![utxo.input], ..Default::default() },
            WitnessSet {
                plutus_v1_scripts: vec![V1_SCRIPT.to_vec()],
                redeemers: vec![Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit())],
                ..Default::default()
            },
        );
        let result = resolve(&tx, &[utxo], &[], &millis);
        assert!(matches!(result, Err(LedgerError::InlineDatumInV1(_))));
    }

    #[test]
    fn test_reference_script_resolves_spend() {
        let script = Script::new(PlutusVersion::V2, V2_SCRIPT.to_vec());
        let holder = Utxo::new(
            OutputRef::new([9; 32], 0),
            TransactionOutput::new(
                Address::enterprise(Network::Testnet, Credential::Key([9; 28])),
                Value::lovelace(10),
            )
            .with_script_ref(script.clone()),
        );
        let utxo = script_utxo(1, script.hash(), Some(DatumOption::Inline(PlutusData::int(1))));
        let tx = Transaction::new(
            TransactionBody {
                inputs: vec![utxo.input],
                reference_inputs: vec![holder.input],
                ..Default::default()
            },
            WitnessSet {
                redeemers: vec![Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit())],
                ..Default::default()
            },
        );
        let invocations = resolve(&tx, &[utxo], &[holder], &millis).unwrap();
        assert_eq!(invocations[0].script, script);
    }

    #[test]
    fn test_minting_in_ascending_policy_order() {
        let p1 = script_hash(PlutusVersion::V2, &[1]);
        let p2 = script_hash(PlutusVersion::V2, &[2]);
        let (low, high) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
        let mut body = TransactionBody { inputs: vec![OutputRef::new([1; 32], 0)], ..Default::default() };
        body.mint.entry(high).or_default().insert(b"a".to_vec(), 1);
        body.mint.entry(low).or_default().insert(b"a".to_vec(), 1);
        let tx = Transaction::new(
            body,
            WitnessSet {
                plutus_v2_scripts: vec![vec![2], vec![1]],
                redeemers: vec![
                    Redeemer::new(RedeemerTag::Mint, 1, PlutusData::int(1)),
                    Redeemer::new(RedeemerTag::Mint, 0, PlutusData::int(0)),
                ],
                ..Default::default()
            },
        );
        let invocations = resolve(&tx, &[key_utxo(1)], &[], &millis).unwrap();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].context.purpose, ScriptPurpose::Minting(low));
        assert_eq!(invocations[1].context.purpose, ScriptPurpose::Minting(high));
        assert!(invocations.iter().all(|i| i.datum.is_none()));
        assert_eq!(invocations[0].arguments().len(), 2);
    }

    #[test]
    fn test_registration_without_redeemer_skipped() {
        let cred = Credential::Script(v2_hash());
        let tx = Transaction::new(
            TransactionBody {
                inputs: vec![OutputRef::new([1; 32], 0)],
                certificates: vec![
                    Certificate::StakeRegistration(cred),
                    Certificate::StakeDelegation { credential: cred, pool: [7; 28] },
                ],
                ..Default::default()
            },
            WitnessSet {
                plutus_v2_scripts: vec![V2_SCRIPT.to_vec()],
                ..Default::default()
            },
        );
        assert_eq!(
            resolve(&tx, &[key_utxo(1)], &[], &millis),
            Err(LedgerError::MissingRedeemer(RedeemerKey::new(RedeemerTag::Cert, 1)))
        );

        let mut tx = tx;
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Cert, 1, PlutusData::unit()));
        let invocations = resolve(&tx, &[key_utxo(1)], &[], &millis).unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].key(), RedeemerKey::new(RedeemerTag::Cert, 1));
    }

    #[test]
    fn test_withdrawal_redeemer_index_uses_address_order() {
        let script_reward = RewardAddress::new(Network::Testnet, Credential::Script(v2_hash()));
        let key_reward = RewardAddress::new(Network::Testnet, Credential::Key([0xff; 28]));
        let tx = Transaction::new(
            TransactionBody {
                inputs: vec![OutputRef::new([1; 32], 0)],
                withdrawals: vec![(script_reward, 0), (key_reward, 0)],
                ..Default::default()
            },
            WitnessSet {
                plutus_v2_scripts: vec![V2_SCRIPT.to_vec()],
                redeemers: vec![Redeemer::new(RedeemerTag::Reward, 1, PlutusData::unit())],
                ..Default::default()
            },
        );
        let invocations = resolve(&tx, &[key_utxo(1)], &[], &millis).unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(
            invocations[0].context.purpose,
            ScriptPurpose::Rewarding(script_reward.staking_credential())
        );
    }

    #[test]
    fn test_dangling_redeemer_rejected() {
        let utxo = key_utxo(1);
        let mut tx = spend_tx(&[&utxo]);
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 4, PlutusData::unit()));
        assert_eq!(
            resolve(&tx, &[utxo], &[], &millis),
            Err(LedgerError::DanglingRedeemer(RedeemerKey::new(RedeemerTag::Spend, 4)))
        );
    }

    #[test]
    fn test_invocations_share_tx_info() {
        let a = script_utxo(1, v2_hash(), Some(DatumOption::Inline(PlutusData::int(1))));
        let b = script_utxo(2, v2_hash(), Some(DatumOption::Inline(PlutusData::int(2))));
        let mut tx = spend_tx(&[&a, &b]);
        tx.witness_set.redeemers = vec![
            Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit()),
            Redeemer::new(RedeemerTag::Spend, 1, PlutusData::unit()),
        ];
        let invocations = resolve(&tx, &[a, b], &[], &millis).unwrap();
        assert!(Arc::ptr_eq(&invocations[0].context.tx_info, &invocations[1].context.tx_info));
    }
}
