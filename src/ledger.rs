//! Mock ledger: the validation and submission pipeline over one UTxO store
//! and one stake registry
//!
//! A ledger instance is single-threaded. `submit_tx` resolves, dispatches and
//! applies a transaction within one call; state changes are staged on copies
//! and committed only after every script and every ledger rule has passed.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::budget::{normalize_budget, EvaluationReport};
use crate::config::{GenesisParameters, LedgerConfig, ProtocolParameters};
use crate::error::{LedgerError, Result};
use crate::interpreter::{EvalOutcome, EvalRequest, ScriptInterpreter};
use crate::resolver::{reference_script_hashes, resolve};
use crate::stake::{Authorization, StakeAccount, StakeRegistry};
use crate::transaction::{apply_transaction, check_transaction, check_validity_interval, resolve_inputs};
use crate::types::*;
use crate::utxo::UtxoStore;

pub type SharedInterpreter = Arc<dyn ScriptInterpreter + Send + Sync>;

/// Position of the chain tip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub slot: Slot,
    pub epoch: u64,
    pub epoch_slot: u64,
    /// POSIX seconds of the tip slot
    pub time: i64,
    /// POSIX seconds of the first slot of the epoch
    pub epoch_start_time: i64,
    /// POSIX seconds of the first slot of the next epoch
    pub epoch_end_time: i64,
}

pub struct MockLedger {
    config: LedgerConfig,
    utxos: UtxoStore,
    stake: StakeRegistry,
    scripts: HashMap<ScriptHash, Script>,
    interpreter: SharedInterpreter,
    last_block_slot: Slot,
    rng: StdRng,
}

impl fmt::Debug for MockLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockLedger")
            .field("network", &self.config.network)
            .field("utxos", &self.utxos.len())
            .field("scripts", &self.scripts.len())
            .field("last_block_slot", &self.last_block_slot)
            .finish()
    }
}

impl MockLedger {
    /// Ledger over `config`, rejected with `Config` if the parameters are unusable
    pub fn new(config: LedgerConfig, interpreter: SharedInterpreter) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config, interpreter))
    }

    /// Ledger with default preview-network parameters
    pub fn with_interpreter(interpreter: impl ScriptInterpreter + Send + Sync + 'static) -> Self {
        Self::with_valid_config(LedgerConfig::default(), Arc::new(interpreter))
    }

    fn with_valid_config(config: LedgerConfig, interpreter: SharedInterpreter) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            utxos: UtxoStore::new(),
            stake: StakeRegistry::new(),
            scripts: HashMap::new(),
            interpreter,
            last_block_slot: 0,
            rng,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn protocol_parameters(&self) -> &ProtocolParameters {
        &self.config.protocol
    }

    pub fn genesis_parameters(&self) -> &GenesisParameters {
        &self.config.genesis
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    // Clock

    pub fn last_block_slot(&self) -> Slot {
        self.last_block_slot
    }

    pub fn epoch(&self) -> u64 {
        self.last_block_slot / self.epoch_length()
    }

    pub fn set_block_slot(&mut self, slot: Slot) {
        self.last_block_slot = slot;
    }

    /// Advance the tip by `slots`, stopping at the last representable slot
    pub fn wait(&mut self, slots: u64) {
        self.last_block_slot = self.last_block_slot.saturating_add(slots);
    }

    /// POSIX seconds at the start of `slot`
    pub fn posix_from_slot(&self, slot: Slot) -> i64 {
        self.config.genesis.posix_from_slot(slot)
    }

    /// Last slot starting at or before POSIX second `posix`
    pub fn slot_from_posix(&self, posix: i64) -> Slot {
        self.config.genesis.slot_from_posix(posix)
    }

    pub fn tip(&self) -> Tip {
        let epoch_length = self.epoch_length();
        let epoch = self.epoch();
        let epoch_start = epoch * epoch_length;
        Tip {
            slot: self.last_block_slot,
            epoch,
            epoch_slot: self.last_block_slot % epoch_length,
            time: self.posix_from_slot(self.last_block_slot),
            epoch_start_time: self.posix_from_slot(epoch_start),
            epoch_end_time: self.posix_from_slot(epoch_start.saturating_add(epoch_length)),
        }
    }

    // Validated non-zero in `new`
    fn epoch_length(&self) -> u64 {
        self.config.genesis.epoch_length.max(1)
    }

    // State seeding and lookup

    /// Add a UTxO, overwriting any output stored under the same reference
    pub fn add_utxo(&mut self, utxo: Utxo) {
        self.register_script_ref(&utxo.output);
        self.utxos.put(utxo);
    }

    /// Add a UTxO, failing if the reference already exists
    pub fn insert_utxo(&mut self, utxo: Utxo) -> Result<()> {
        self.register_script_ref(&utxo.output);
        self.utxos.insert(utxo)
    }

    /// Add an output under a fresh transaction id, index 0
    pub fn add_txout(&mut self, output: TransactionOutput) -> OutputRef {
        let mut tx_id = [0u8; 32];
        self.rng.fill_bytes(&mut tx_id);
        let input = OutputRef::new(tx_id, 0);
        self.add_utxo(Utxo::new(input, output));
        input
    }

    pub fn remove_utxo(&mut self, input: &OutputRef) -> Result<TransactionOutput> {
        self.utxos.remove(input)
    }

    pub fn utxo(&self, input: &OutputRef) -> Result<Utxo> {
        self.utxos.lookup(input)
    }

    pub fn utxos_at(&self, address: &Address) -> Vec<Utxo> {
        self.utxos.by_address(address)
    }

    pub fn utxo_store(&self) -> &UtxoStore {
        &self.utxos
    }

    /// Script published as a reference script on some output
    pub fn script(&self, hash: &ScriptHash) -> Result<&Script> {
        self.scripts.get(hash).ok_or(LedgerError::ScriptNotFound(*hash))
    }

    /// Random bytes from the ledger's seeded generator
    pub fn random_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.rng.fill_bytes(&mut bytes);
        bytes
    }

    // Stake

    pub fn add_pool(&mut self, pool: PoolId) {
        self.stake.add_pool(pool);
    }

    pub fn pools(&self) -> Vec<PoolId> {
        self.stake.pools().copied().collect()
    }

    /// Credit `total` to every registered and delegated account
    pub fn distribute_rewards(&mut self, total: Coin) -> usize {
        self.stake.distribute(total)
    }

    pub fn account(&self, address: &RewardAddress) -> Result<&StakeAccount> {
        self.stake.account(address)
    }

    pub fn stake_registry(&self) -> &StakeRegistry {
        &self.stake
    }

    // Pipeline

    /// Evaluate every script `tx` triggers without changing any state.
    /// Returns the consumed execution units per redeemer.
    pub fn evaluate_tx(&self, tx: &Transaction) -> Result<EvaluationReport> {
        let inputs = resolve_inputs(&tx.body.inputs, &self.utxos)?;
        let reference_inputs = resolve_inputs(&tx.body.reference_inputs, &self.utxos)?;
        self.run_scripts(tx, &inputs, &reference_inputs)
    }

    /// Validate `tx` and apply its effects
    ///
    /// 1. Structural checks
    /// 2. Validity interval contains the current slot
    /// 3. Resolve inputs and reference inputs
    /// 4. Build script contexts and run every invocation
    /// 5. Stage UTxO effects: spent inputs removed, outputs added
    /// 6. Stage certificate effects in body order, then withdrawals
    /// 7. Commit
    ///
    /// Any failure leaves the ledger unchanged.
    pub fn submit_tx(&mut self, tx: &Transaction) -> Result<TxId> {
        let tx_id = tx.id();
        match self.try_submit(tx) {
            Ok((utxos, stake)) => {
                self.utxos = utxos;
                self.stake = stake;
                for output in &tx.body.outputs {
                    self.register_script_ref(output);
                }
                info!(
                    target: "ledger::submit",
                    "accepted [tx={}, inputs={}, outputs={}]",
                    hex::encode(tx_id),
                    tx.body.inputs.len(),
                    tx.body.outputs.len()
                );
                Ok(tx_id)
            }
            Err(e) => {
                warn!(target: "ledger::submit", "rejected [tx={}]: {}", hex::encode(tx_id), e);
                Err(e)
            }
        }
    }

    fn try_submit(&self, tx: &Transaction) -> Result<(UtxoStore, StakeRegistry)> {
        // 1. Structure
        check_transaction(tx)?;

        // 2. Validity interval
        check_validity_interval(&tx.body, self.last_block_slot)?;

        // 3. Resolution
        let inputs = resolve_inputs(&tx.body.inputs, &self.utxos)?;
        let reference_inputs = resolve_inputs(&tx.body.reference_inputs, &self.utxos)?;

        // 4. Scripts
        let report = self.run_scripts(tx, &inputs, &reference_inputs)?;
        debug!(
            target: "ledger::submit",
            "scripts passed [invocations={}, total={:?}]",
            report.len(),
            report.total()
        );

        // 5. UTxO effects
        let utxos = apply_transaction(tx, self.utxos.clone())?;

        // 6. Stake effects
        let auth = Authorization::from_transaction(
            tx,
            reference_script_hashes(inputs.iter().chain(&reference_inputs)),
        );
        let mut stake = self.stake.clone();
        for certificate in &tx.body.certificates {
            stake.apply_certificate(certificate, self.config.network, &auth)?;
        }
        for (address, amount) in &tx.body.withdrawals {
            if address.network != self.config.network {
                return Err(LedgerError::WrongNetwork {
                    address: *address,
                    expected: self.config.network,
                });
            }
            stake.withdraw(*address, *amount, &auth)?;
        }

        Ok((utxos, stake))
    }

    fn run_scripts(
        &self,
        tx: &Transaction,
        inputs: &[Utxo],
        reference_inputs: &[Utxo],
    ) -> Result<EvaluationReport> {
        let genesis = &self.config.genesis;
        let to_millis = |slot: Slot| genesis.posix_millis_from_slot(slot);
        let invocations = resolve(tx, inputs, reference_inputs, &to_millis)?;

        let mut report = EvaluationReport::new();
        for invocation in &invocations {
            let key = invocation.key();
            let budget = normalize_budget(invocation.redeemer.ex_units, &self.config.protocol);
            let request = EvalRequest::new(invocation, budget);
            match self.interpreter.evaluate(&request) {
                EvalOutcome::Success { consumed, logs } => {
                    debug!(
                        target: "ledger::submit",
                        "script succeeded [key={}, mem={}, steps={}, logs={:?}]",
                        key,
                        consumed.mem,
                        consumed.steps,
                        logs
                    );
                    report.record(key, consumed);
                }
                EvalOutcome::Failure { consumed, reason, logs } => {
                    warn!(target: "ledger::submit", "script failed [key={}]: {}", key, reason);
                    return Err(LedgerError::ScriptFailure { key, reason, consumed, logs });
                }
            }
        }
        Ok(report)
    }

    fn register_script_ref(&mut self, output: &TransactionOutput) {
        if let Some(script) = &output.script_ref {
            self.scripts.insert(script.hash(), script.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::NativeValidators;
    use crate::plutus_data::PlutusData;

    fn key_address(seed: u8) -> Address {
        Address::enterprise(Network::Testnet, Credential::Key([seed; 28]))
    }

    fn ledger() -> MockLedger {
        MockLedger::with_interpreter(NativeValidators::new())
    }

    fn transfer(input: OutputRef, to: Address, coin: Coin) -> Transaction {
        Transaction::new(
            TransactionBody {
                inputs: vec![input],
                outputs: vec![TransactionOutput::new(to, Value::lovelace(coin))],
                ..Default::default()
            },
            WitnessSet::default(),
        )
    }

    #[test]
    fn test_add_txout_uses_seeded_ids() {
        let mut a = ledger();
        let mut b = ledger();
        let out = TransactionOutput::new(key_address(1), Value::lovelace(5));
        assert_eq!(a.add_txout(out.clone()), b.add_txout(out.clone()));
        let first = a.add_txout(out.clone());
        let second = a.add_txout(out);
        assert_ne!(first, second);
        assert_eq!(first.index, 0);
    }

    #[test]
    fn test_submit_key_transfer() {
        let mut ledger = ledger();
        let input = ledger.add_txout(TransactionOutput::new(key_address(1), Value::lovelace(100)));
        let tx = transfer(input, key_address(2), 100);
        let tx_id = ledger.submit_tx(&tx).unwrap();
        assert_eq!(tx_id, tx.id());
        assert!(ledger.utxo(&input).is_err());
        assert_eq!(ledger.utxos_at(&key_address(2)).len(), 1);
        assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::UtxoNotFound(input)));
    }

    #[test]
    fn test_submit_rejects_outside_validity_interval() {
        let mut ledger = ledger();
        let input = ledger.add_txout(TransactionOutput::new(key_address(1), Value::lovelace(100)));
        let mut tx = transfer(input, key_address(2), 100);
        tx.body.validity_start = Some(10);
        assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::OutsideValidityInterval { slot: 0 }));
        ledger.wait(10);
        assert!(ledger.submit_tx(&tx).is_ok());
    }

    #[test]
    fn test_evaluate_does_not_mutate() {
        let mut ledger = ledger();
        let input = ledger.add_txout(TransactionOutput::new(key_address(1), Value::lovelace(100)));
        let tx = transfer(input, key_address(2), 100);
        let report = ledger.evaluate_tx(&tx).unwrap();
        assert!(report.is_empty());
        assert!(ledger.utxo(&input).is_ok());
    }

    #[test]
    fn test_insert_utxo_rejects_duplicates_add_utxo_overwrites() {
        let mut ledger = ledger();
        let utxo = Utxo::new(OutputRef::new([1; 32], 0), TransactionOutput::new(key_address(1), Value::lovelace(1)));
        ledger.insert_utxo(utxo.clone()).unwrap();
        assert_eq!(ledger.insert_utxo(utxo.clone()), Err(LedgerError::UtxoExists(utxo.input)));
        let replaced = Utxo::new(utxo.input, TransactionOutput::new(key_address(2), Value::lovelace(2)));
        ledger.add_utxo(replaced.clone());
        assert_eq!(ledger.utxo(&utxo.input).unwrap(), replaced);
    }

    #[test]
    fn test_reference_scripts_are_published() {
        let mut ledger = ledger();
        let script = Script::new(PlutusVersion::V2, vec![7, 7]);
        let out = TransactionOutput::new(key_address(1), Value::lovelace(10)).with_script_ref(script.clone());
        ledger.add_txout(out);
        assert_eq!(ledger.script(&script.hash()).unwrap(), &script);
        assert_eq!(ledger.script(&[0; 28]), Err(LedgerError::ScriptNotFound([0; 28])));
    }

    #[test]
    fn test_clock_and_tip() {
        let mut ledger = ledger();
        let epoch_length = ledger.genesis_parameters().epoch_length;
        ledger.set_block_slot(epoch_length + 5);
        let tip = ledger.tip();
        assert_eq!(tip.epoch, 1);
        assert_eq!(tip.epoch_slot, 5);
        assert_eq!(tip.time, ledger.posix_from_slot(epoch_length + 5));
        assert_eq!(ledger.slot_from_posix(tip.time), epoch_length + 5);
        assert_eq!(tip.epoch_end_time - tip.epoch_start_time, epoch_length as i64);
    }

    #[test]
    fn test_new_validates_config() {
        let mut config = LedgerConfig::default();
        config.genesis.epoch_length = 0;
        let interpreter: SharedInterpreter = Arc::new(NativeValidators::new());
        assert!(matches!(
            MockLedger::new(config, interpreter.clone()),
            Err(LedgerError::Config(_))
        ));
        let ledger = MockLedger::new(LedgerConfig::default(), interpreter).unwrap();
        assert_eq!(ledger.tip().epoch, 0);
    }

    #[test]
    fn test_clock_saturates_at_last_slot() {
        let mut ledger = ledger();
        ledger.set_block_slot(u64::MAX - 1);
        ledger.wait(10);
        assert_eq!(ledger.last_block_slot(), u64::MAX);
        let tip = ledger.tip();
        assert_eq!(tip.time, i64::MAX);
        assert!(tip.epoch_end_time >= tip.epoch_start_time);
    }

    #[test]
    fn test_script_failure_surfaces_logs() {
        let script = Script::new(PlutusVersion::V2, vec![1]);
        let validators = NativeValidators::new().with(&script, |args| {
            args.trace("about to fail");
            Err("nope".to_string())
        });
        let mut ledger = MockLedger::with_interpreter(validators);
        let script_addr = Address::enterprise(Network::Testnet, Credential::Script(script.hash()));
        let input = ledger.add_txout(
            TransactionOutput::new(script_addr, Value::lovelace(10)).with_inline_datum(PlutusData::unit()),
        );
        let mut tx = transfer(input, key_address(2), 10);
        tx.witness_set.plutus_v2_scripts.push(script.bytes.clone());
        tx.witness_set
            .redeemers
            .push(Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit()));

        match ledger.submit_tx(&tx) {
            Err(LedgerError::ScriptFailure { key, reason, logs, .. }) => {
                assert_eq!(key, RedeemerKey::new(RedeemerTag::Spend, 0));
                assert_eq!(reason, "nope");
                assert_eq!(logs, vec!["about to fail".to_string()]);
            }
            other => panic!("expected script failure, got {:?}", other),
        }
        assert!(ledger.utxo(&input).is_ok());
    }
}
