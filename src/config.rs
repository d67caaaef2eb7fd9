//! Protocol and genesis parameters, and the configuration of one ledger instance

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::types::{ExUnits, Network, PosixTime, Slot};

/// Protocol parameters exposed by the simulated chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParameters {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub max_block_size: u64,
    pub max_tx_size: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub protocol_major_version: u64,
    pub protocol_minor_version: u64,
    pub price_mem: f64,
    pub price_step: f64,
    pub max_tx_ex_mem: i64,
    pub max_tx_ex_steps: i64,
    pub max_block_ex_mem: i64,
    pub max_block_ex_steps: i64,
    pub max_val_size: u64,
    pub collateral_percent: u64,
    pub max_collateral_inputs: u64,
    pub coins_per_utxo_byte: u64,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            min_fee_a: DEFAULT_MIN_FEE_A,
            min_fee_b: DEFAULT_MIN_FEE_B,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            max_tx_size: DEFAULT_MAX_TX_SIZE,
            key_deposit: DEFAULT_KEY_DEPOSIT,
            pool_deposit: DEFAULT_POOL_DEPOSIT,
            protocol_major_version: DEFAULT_PROTOCOL_MAJOR_VERSION,
            protocol_minor_version: DEFAULT_PROTOCOL_MINOR_VERSION,
            price_mem: DEFAULT_PRICE_MEM,
            price_step: DEFAULT_PRICE_STEP,
            max_tx_ex_mem: DEFAULT_MAX_TX_EX_MEM,
            max_tx_ex_steps: DEFAULT_MAX_TX_EX_STEPS,
            max_block_ex_mem: DEFAULT_MAX_BLOCK_EX_MEM,
            max_block_ex_steps: DEFAULT_MAX_BLOCK_EX_STEPS,
            max_val_size: DEFAULT_MAX_VAL_SIZE,
            collateral_percent: DEFAULT_COLLATERAL_PERCENT,
            max_collateral_inputs: DEFAULT_MAX_COLLATERAL_INPUTS,
            coins_per_utxo_byte: DEFAULT_COINS_PER_UTXO_BYTE,
        }
    }
}

impl ProtocolParameters {
    /// Per-transaction execution-unit maxima
    pub fn max_tx_ex_units(&self) -> ExUnits {
        ExUnits::new(self.max_tx_ex_mem, self.max_tx_ex_steps)
    }
}

/// Genesis parameters; slot length and system start drive the slot clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisParameters {
    pub active_slots_coefficient: f64,
    pub update_quorum: u64,
    pub max_lovelace_supply: u64,
    pub network_magic: u64,
    pub epoch_length: u64,
    /// POSIX seconds of slot 0
    pub system_start: i64,
    pub slots_per_kes_period: u64,
    /// Seconds per slot
    pub slot_length: i64,
    pub max_kes_evolutions: u64,
    pub security_param: u64,
}

impl Default for GenesisParameters {
    fn default() -> Self {
        Self {
            active_slots_coefficient: DEFAULT_ACTIVE_SLOTS_COEFFICIENT,
            update_quorum: DEFAULT_UPDATE_QUORUM,
            max_lovelace_supply: DEFAULT_MAX_LOVELACE_SUPPLY,
            network_magic: DEFAULT_NETWORK_MAGIC,
            epoch_length: DEFAULT_EPOCH_LENGTH,
            system_start: DEFAULT_SYSTEM_START,
            slots_per_kes_period: DEFAULT_SLOTS_PER_KES_PERIOD,
            slot_length: DEFAULT_SLOT_LENGTH,
            max_kes_evolutions: DEFAULT_MAX_KES_EVOLUTIONS,
            security_param: DEFAULT_SECURITY_PARAM,
        }
    }
}

impl GenesisParameters {
    /// POSIX seconds at the start of `slot`, `None` past the `i64` range
    pub fn checked_posix_from_slot(&self, slot: Slot) -> Option<i64> {
        i64::try_from(slot)
            .ok()
            .and_then(|slot| self.slot_length.checked_mul(slot))
            .and_then(|offset| self.system_start.checked_add(offset))
    }

    /// POSIX seconds at the start of `slot`, saturating at the `i64` range
    pub fn posix_from_slot(&self, slot: Slot) -> i64 {
        self.checked_posix_from_slot(slot).unwrap_or(i64::MAX)
    }

    /// Last slot starting at or before POSIX second `posix`
    pub fn slot_from_posix(&self, posix: i64) -> Slot {
        if self.slot_length <= 0 {
            return 0;
        }
        (posix.saturating_sub(self.system_start) / self.slot_length).max(0) as Slot
    }

    /// Millisecond timestamp handed to validators for `slot`
    pub fn posix_millis_from_slot(&self, slot: Slot) -> Result<PosixTime> {
        self.checked_posix_from_slot(slot)
            .and_then(|seconds| seconds.checked_mul(1000))
            .ok_or_else(|| {
                LedgerError::InvalidTransaction(format!("validity bound out of range: slot {}", slot))
            })
    }
}

/// Configuration of one ledger instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub protocol: ProtocolParameters,
    pub genesis: GenesisParameters,
    pub network: Network,
    /// Seed of the generator behind fresh transaction ids and mock keys
    pub seed: u64,
}

impl LedgerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Reject parameters the slot clock and budget accounting can not work with
    pub fn validate(&self) -> Result<()> {
        if self.genesis.slot_length <= 0 {
            return Err(LedgerError::Config("slot_length must be positive".to_string()));
        }
        if self.genesis.epoch_length == 0 {
            return Err(LedgerError::Config("epoch_length must be positive".to_string()));
        }
        if self.protocol.max_tx_ex_mem <= 0 || self.protocol.max_tx_ex_steps <= 0 {
            return Err(LedgerError::Config(
                "per-transaction execution unit maxima must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
